use chrono::Utc;
use domain::{comment_text, Comment, CommentId, NewComment, ReportId};
use tracing::debug;

use crate::{models::SqlComment, new_comment_id, Db, StorageError};

const SELECT_COMMENT: &str = r#"
    SELECT id, report_id, parent_id, author_name, text, created_at, updated_at
    FROM comments
"#;

impl Db {
    pub async fn create_comment(&self, new: &NewComment) -> Result<Comment, StorageError> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent) = &new.parent_id {
            let parent_report: Option<String> =
                sqlx::query_scalar("SELECT report_id FROM comments WHERE id = ?")
                    .bind(parent.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent_report.as_deref() != Some(new.report_id.as_str()) {
                return Err(StorageError::InvalidParent);
            }
        }

        let comment = Comment {
            id: CommentId::new_unchecked(new_comment_id()),
            report_id: new.report_id.clone(),
            parent_id: new.parent_id.clone(),
            author_name: new.author_name.clone(),
            text: comment_text(&new.text)?,
            created_at: Utc::now(),
            updated_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO comments (id, report_id, parent_id, author_name, text, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.as_str())
        .bind(comment.report_id.as_str())
        .bind(comment.parent_id.as_ref().map(CommentId::as_str))
        .bind(&comment.author_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Stored comment {} on report {}", comment.id, comment.report_id);
        Ok(comment)
    }

    pub async fn get_comment(&self, id: &CommentId) -> Result<Option<Comment>, StorageError> {
        let row = sqlx::query_as::<_, SqlComment>(&format!("{SELECT_COMMENT} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// Flat listing for one report, most recent first.
    pub async fn list_comments(&self, report_id: &ReportId) -> Result<Vec<Comment>, StorageError> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "{SELECT_COMMENT} WHERE report_id = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(report_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count_comments(&self, report_id: &ReportId) -> Result<i64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE report_id = ?")
            .bind(report_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, StorageError> {
        let text = comment_text(text)?;
        let affected = sqlx::query("UPDATE comments SET text = ?, updated_at = ? WHERE id = ?")
            .bind(&text)
            .bind(Utc::now())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(StorageError::NotFound);
        }
        self.get_comment(id).await?.ok_or(StorageError::NotFound)
    }

    /// Deletes a comment and every reply beneath it. Returns the report it
    /// belonged to.
    pub async fn delete_comment(&self, id: &CommentId) -> Result<ReportId, StorageError> {
        let mut tx = self.pool.begin().await?;

        let report: Option<String> = sqlx::query_scalar("SELECT report_id FROM comments WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(report) = report else {
            return Err(StorageError::NotFound);
        };

        let removed = sqlx::query(
            r#"
            WITH RECURSIVE doomed(id) AS (
                SELECT id FROM comments WHERE id = ?
                UNION ALL
                SELECT c.id FROM comments c JOIN doomed d ON c.parent_id = d.id
            )
            DELETE FROM comments WHERE id IN (SELECT id FROM doomed)
            "#,
        )
        .bind(id.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        debug!("Deleted comment {} ({} rows)", id, removed);
        Ok(ReportId::new_unchecked(report))
    }
}
