use chrono::Utc;
use domain::{ActorId, RatingStats, RatingValue, ReportId};
use std::collections::BTreeMap;

use crate::{Db, StorageError};

impl Db {
    pub async fn rating_stats(
        &self,
        report_id: &ReportId,
        actor_id: Option<&ActorId>,
    ) -> Result<RatingStats, StorageError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT value, COUNT(*) FROM ratings WHERE report_id = ? GROUP BY value",
        )
        .bind(report_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        let distribution: BTreeMap<u8, u64> = rows
            .into_iter()
            .filter_map(|(v, n)| Some((u8::try_from(v).ok()?, u64::try_from(n).ok()?)))
            .collect();

        let user_rating = match actor_id {
            Some(actor) => {
                let v: Option<i64> = sqlx::query_scalar(
                    "SELECT value FROM ratings WHERE report_id = ? AND actor_id = ?",
                )
                .bind(report_id.as_str())
                .bind(actor.as_str())
                .fetch_optional(&self.pool)
                .await?;
                v.and_then(|v| u8::try_from(v).ok())
                    .and_then(|v| RatingValue::new(v).ok())
            }
            None => None,
        };

        Ok(RatingStats::from_distribution(distribution, user_rating))
    }

    /// Records or replaces the actor's rating.
    pub async fn rate(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        value: RatingValue,
    ) -> Result<RatingStats, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO ratings (report_id, actor_id, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(report_id, actor_id) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(report_id.as_str())
        .bind(actor_id.as_str())
        .bind(i64::from(value.get()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        self.rating_stats(report_id, Some(actor_id)).await
    }
}
