mod comments;
mod ratings;
mod reactions;
