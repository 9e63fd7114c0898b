use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid FAQ data: {0}")]
    InvalidFaq(String),

    #[error("Invalid intent data: {0}")]
    InvalidIntents(String),

    #[error("No candidates to match against")]
    NoCandidates,
}

pub type Result<T> = std::result::Result<T, ChatError>;
