pub mod config;
pub mod error;
pub mod message_store;
pub mod orchestrator;
mod send_guard;
pub mod session_store;
pub mod state;
pub mod state_machine;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use message_store::MessageStore;
pub use orchestrator::{ChatOrchestrator, FetchOutcome, SendOutcome};
pub use session_store::SessionStore;
pub use state::ChatState;
pub use state_machine::{SendState, SendStateMachine};
