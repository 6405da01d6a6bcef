use thiserror::Error;

use crate::feedback::FeedbackError;
use crate::llm::LlmError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VerdictError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    #[error("Feedback error: {0}")]
    Feedback(#[from] FeedbackError),

    #[error("Other error: {0}")]
    Other(String),
}
