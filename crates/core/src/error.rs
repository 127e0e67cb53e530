use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown message role: {0}")]
    UnknownRole(String),

    #[error("Unknown message action: {0}")]
    UnknownAction(String),
}
