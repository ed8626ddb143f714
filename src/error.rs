use std::io;

use thiserror::Error;

/// Errors surfaced by the performance engine. Every error is returned
/// synchronously; nothing is retried.
#[derive(Debug, Error)]
pub enum FfiError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("out of memory")]
    OutOfMemory,

    #[error("{0} is not initialized")]
    NotInitialized(&'static str),

    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("capacity exceeded (limit {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialise export data: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reserved for bridges; the engine itself never times out a call.
    #[error("operation timed out")]
    Timeout,

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("batch aborted at entry {index} (`{function_name}`): {source}")]
    BatchAborted {
        index: usize,
        function_name: String,
        #[source]
        source: Box<FfiError>,
    },
}

impl FfiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FfiError::InvalidParameter(message.into())
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        FfiError::Dispatch(message.into())
    }

    /// Error of the failing call itself, unwrapping a batch abort.
    pub fn root_cause(&self) -> &FfiError {
        match self {
            FfiError::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, FfiError>;
