//! Error types for the statistics engine.
//!
//! Storage and decode failures are recovered locally by the engine; only
//! [`StatsError`] is returned to callers of the query and lifecycle APIs.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reading or writing the statistics log.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to {action} statistics log {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("statistics log {} has an unrecognised header: {found:?}", path.display())]
    BadHeader { path: PathBuf, found: String },
}

impl StorageError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A peer message that could not be decoded. The message is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("peer message truncated at {len} bytes")]
    Truncated { len: usize },

    #[error("unsupported peer message version {0}")]
    UnsupportedVersion(u8),

    #[error("peer message checksum mismatch")]
    ChecksumMismatch,

    #[error("malformed peer message: {0}")]
    Malformed(&'static str),

    #[error("invalid day record in peer message: {0}")]
    InvalidRecord(&'static str),
}

/// An input source refused the subscription.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SubscribeError(pub String);

/// Errors surfaced by [`crate::Statistics`].
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("day index {index} out of range (history holds {size} days)")]
    DayOutOfRange { index: usize, size: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("input source unavailable: {0}")]
    InputSource(#[from] SubscribeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
