use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found")]
    NotFound,
    #[error("parent comment does not exist on this report")]
    InvalidParent,
    #[error(transparent)]
    Validation(#[from] domain::ValidationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
