use async_trait::async_trait;
use domain::{
    ActorId, Comment, CommentId, NewComment, RatingStats, RatingValue, ReactionDetail, ReactionKind,
    ReactionSummary, ReportId,
};

use crate::StoreError;

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Flat listing in store order; a missing report reads as empty.
    async fn list_comments(&self, report_id: &ReportId) -> Result<Vec<Comment>, StoreError>;

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, StoreError>;

    /// Stores without edit support answer [`StoreError::Unsupported`].
    async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, StoreError>;

    async fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn reaction_summary(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<ReactionSummary, StoreError>;

    /// Toggle, not set: requesting the kind already held clears it.
    async fn toggle_reaction(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        kind: Option<ReactionKind>,
    ) -> Result<ReactionSummary, StoreError>;

    async fn reaction_detail(&self, report_id: &ReportId) -> Result<ReactionDetail, StoreError>;
}

#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn rating_stats(
        &self,
        report_id: &ReportId,
        actor_id: Option<&ActorId>,
    ) -> Result<RatingStats, StoreError>;

    async fn rate(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        value: RatingValue,
    ) -> Result<RatingStats, StoreError>;
}
