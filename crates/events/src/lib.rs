//! Change notifications for the chat state.
//!
//! The orchestrator publishes a [`ChatEvent`] after every mutation; views
//! subscribe to the [`EventBus`] and re-read the state they care about.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
