use domain::{CommentId, ValidationError};
use thiserror::Error;

/// Failure reported by (or on the way to) a comment/reaction store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store rejected the request: {0}")]
    Rejected(String),
    #[error("not found")]
    NotFound,
    #[error("operation not supported by this store")]
    Unsupported,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode store response: {0}")]
    Decode(String),
    #[error("request timed out")]
    Timeout,
}

impl From<storage::StorageError> for StoreError {
    fn from(e: storage::StorageError) -> Self {
        match e {
            storage::StorageError::NotFound => StoreError::NotFound,
            storage::StorageError::InvalidParent => StoreError::Rejected(e.to_string()),
            storage::StorageError::Validation(v) => StoreError::Rejected(v.to_string()),
            storage::StorageError::Database(db) => StoreError::Transport(db.to_string()),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

/// What a controller operation reports back to the view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("comment {0} is not in this thread")]
    UnknownComment(CommentId),
    #[error("comment {0} has not been confirmed by the store yet")]
    PendingComment(CommentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Bad input, as opposed to a bad target or a store failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}
