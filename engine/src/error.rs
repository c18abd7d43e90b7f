//! Error types for the tether engine.

use crate::Address;
use thiserror::Error;

/// All possible errors from the tether engine.
///
/// None of these escape [`Binding::write`](crate::Binding::write): they are
/// logged, reported through [`SyncEvent::Failed`](crate::SyncEvent::Failed)
/// and otherwise leave the local collection untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Network errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status} from {address}")]
    Status { status: u16, address: Address },

    // Codec errors
    #[error("failed to encode element: {0}")]
    Encode(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    // Cache errors
    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Whether the failure happened before or while talking to the remote.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Cache(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
