pub mod comments;
pub mod health;
pub mod ratings;
pub mod reactions;
pub mod sse;
