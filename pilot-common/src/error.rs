use std::sync::Arc;

use thiserror::Error;

/// Errors raised by the core's own operations (archive creation, subprocess
/// supervision, plugin dispatch, config loading). Distinct from
/// [`crate::job::ErrorCode`], which is the closed set of diagnostic codes
/// attached *to a job record* for downstream reporting.
#[derive(Error, Debug, Clone)]
pub enum PilotError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Communicator plugin error: {0}")]
    PluginError(String),

    #[error("Communication failure: {0}")]
    CommunicationFailure(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for PilotError {
    fn from(err: std::io::Error) -> Self {
        PilotError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for PilotError {
    fn from(err: serde_json::Error) -> Self {
        PilotError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
