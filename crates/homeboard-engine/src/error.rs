//! Error types for homeboard-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed RRULE: {0}")]
    MalformedRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Unexpected page layout: {0}")]
    PageLayout(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Payload(err.to_string())
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
