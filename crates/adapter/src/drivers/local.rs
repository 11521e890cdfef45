use async_trait::async_trait;
use domain::{
    ActorId, Comment, CommentId, NewComment, RatingStats, RatingValue, ReactionDetail, ReactionKind,
    ReactionSummary, ReportId,
};
use storage::Db;

use crate::traits::{CommentStore, RatingStore, ReactionStore};
use crate::StoreError;

/// In-process store over a [`Db`], for tests, tools and single-binary setups.
#[derive(Clone)]
pub struct LocalStore {
    db: Db,
    allow_edit: bool,
}

impl LocalStore {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            allow_edit: true,
        }
    }

    /// Behave like a store deployment that has no edit endpoint.
    pub fn without_edit(mut self) -> Self {
        self.allow_edit = false;
        self
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[async_trait]
impl CommentStore for LocalStore {
    async fn list_comments(&self, report_id: &ReportId) -> Result<Vec<Comment>, StoreError> {
        Ok(self.db.list_comments(report_id).await?)
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, StoreError> {
        Ok(self.db.create_comment(new).await?)
    }

    async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, StoreError> {
        if !self.allow_edit {
            return Err(StoreError::Unsupported);
        }
        Ok(self.db.edit_comment(id, text).await?)
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError> {
        self.db.delete_comment(id).await?;
        Ok(())
    }
}

#[async_trait]
impl ReactionStore for LocalStore {
    async fn reaction_summary(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<ReactionSummary, StoreError> {
        Ok(self.db.reaction_summary(report_id, actor_id).await?)
    }

    async fn toggle_reaction(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        kind: Option<ReactionKind>,
    ) -> Result<ReactionSummary, StoreError> {
        Ok(self.db.toggle_reaction(report_id, actor_id, kind).await?)
    }

    async fn reaction_detail(&self, report_id: &ReportId) -> Result<ReactionDetail, StoreError> {
        Ok(self.db.reaction_detail(report_id).await?)
    }
}

#[async_trait]
impl RatingStore for LocalStore {
    async fn rating_stats(
        &self,
        report_id: &ReportId,
        actor_id: Option<&ActorId>,
    ) -> Result<RatingStats, StoreError> {
        Ok(self.db.rating_stats(report_id, actor_id).await?)
    }

    async fn rate(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        value: RatingValue,
    ) -> Result<RatingStats, StoreError> {
        Ok(self.db.rate(report_id, actor_id, value).await?)
    }
}
