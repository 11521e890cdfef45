use thiserror::Error;

/// Input rejected before any store round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("comment text must not be empty")]
    EmptyText,
    #[error("{kind} {reason}")]
    InvalidId {
        kind: &'static str,
        reason: &'static str,
    },
    #[error("unknown reaction kind: {0}")]
    UnknownReaction(String),
    #[error("rating {0} is out of range (1-5)")]
    RatingOutOfRange(u8),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
