//! Error types for the remote job gateway.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{operation}: transport error: {detail}")]
    Transport {
        operation: &'static str,
        detail: String,
    },

    #[error("{operation}: HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation}: unexpected response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },
}

impl GatewayError {
    pub fn transport(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation,
            detail: err.to_string(),
        }
    }
}
