mod code_block;
mod message;
mod session;

pub use code_block::CodeBlock;
pub use message::{Message, MessageAction, Role, TEMP_ID_PREFIX};
pub use session::{truncate_title, Session, SessionSummary, DEFAULT_SESSION_TITLE};
