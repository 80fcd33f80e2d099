//! Error types shared across the crate.
//!
//! `ApiError` covers everything that can go wrong talking to the user
//! service. The directory controller never shows these to the user directly;
//! it logs them and reduces each to a fixed per-operation message.

use reqwest::{Method, StatusCode};

/// Binary-level result type (terminal, runtime, config files).
pub type Result<T> = anyhow::Result<T>;

/// Failure of a single call against the user service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, timeout, TLS failure or an undecodable body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("{method} {url} returned {status}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
    },

    /// The configured base URL cannot carry path segments (e.g. `mailto:`).
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Body encoding failures and non-HTTP backends.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status when the failure came from a response, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            Self::InvalidBaseUrl(_) | Self::Other(_) => None,
        }
    }
}
