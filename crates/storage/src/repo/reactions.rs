use chrono::Utc;
use domain::{ActorId, ReactionCounts, ReactionDetail, ReactionKind, ReactionSummary, ReportId};
use tracing::{debug, warn};

use crate::{Db, StorageError};

fn parse_kind(raw: &str) -> Option<ReactionKind> {
    match raw.parse() {
        Ok(k) => Some(k),
        Err(_) => {
            warn!("Ignoring stored reaction with unknown kind '{}'", raw);
            None
        }
    }
}

impl Db {
    pub async fn reaction_summary(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<ReactionSummary, StorageError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT kind, COUNT(*) FROM reactions WHERE report_id = ? GROUP BY kind",
        )
        .bind(report_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let counts: ReactionCounts = rows
            .into_iter()
            .filter_map(|(kind, n)| Some((parse_kind(&kind)?, u64::try_from(n).unwrap_or(0))))
            .collect();

        let mine: Option<String> =
            sqlx::query_scalar("SELECT kind FROM reactions WHERE report_id = ? AND actor_id = ?")
                .bind(report_id.as_str())
                .bind(actor_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(ReactionSummary::from_counts(
            counts,
            mine.as_deref().and_then(parse_kind),
        ))
    }

    /// Applies toggle semantics for one actor and returns the new aggregate.
    pub async fn toggle_reaction(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        requested: Option<ReactionKind>,
    ) -> Result<ReactionSummary, StorageError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT kind FROM reactions WHERE report_id = ? AND actor_id = ?")
                .bind(report_id.as_str())
                .bind(actor_id.as_str())
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.as_deref().and_then(parse_kind);

        match ReactionKind::resolve(current, requested) {
            None => {
                sqlx::query("DELETE FROM reactions WHERE report_id = ? AND actor_id = ?")
                    .bind(report_id.as_str())
                    .bind(actor_id.as_str())
                    .execute(&mut *tx)
                    .await?;
            }
            Some(kind) => {
                sqlx::query(
                    r#"
                    INSERT INTO reactions (report_id, actor_id, kind, created_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(report_id, actor_id) DO UPDATE SET
                        kind = excluded.kind,
                        created_at = excluded.created_at
                    "#,
                )
                .bind(report_id.as_str())
                .bind(actor_id.as_str())
                .bind(kind.as_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        debug!(
            "Reaction on {} by {}: {:?} -> requested {:?}",
            report_id, actor_id, current, requested
        );
        self.reaction_summary(report_id, actor_id).await
    }

    pub async fn reaction_detail(&self, report_id: &ReportId) -> Result<ReactionDetail, StorageError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT kind, actor_id FROM reactions WHERE report_id = ? ORDER BY created_at ASC",
        )
        .bind(report_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut detail = ReactionDetail::new();
        for (kind, actor) in rows {
            if let Some(kind) = parse_kind(&kind) {
                detail
                    .entry(kind)
                    .or_default()
                    .push(ActorId::new_unchecked(actor));
            }
        }
        Ok(detail)
    }
}
