mod error;
mod events;
mod models;
pub mod protocol;
mod session;
pub mod tree;

pub use error::ValidationError;
pub use events::ReportEvent;
pub use models::{
    author_or_anonymous, comment_text, ActorId, Comment, CommentId, NewComment, RatingStats,
    RatingValue, ReactionCounts, ReactionDetail, ReactionKind, ReactionSummary, ReportId, ANONYMOUS,
};
pub use session::{Session, SignedInUser};
pub use tree::{build_tree, CommentNode, CommentTree, Visit};
