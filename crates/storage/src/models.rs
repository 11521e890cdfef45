use chrono::{DateTime, Utc};
use domain::{Comment, CommentId, ReportId};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: String,
    pub report_id: String,
    pub parent_id: Option<String>,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: CommentId::new_unchecked(sql.id),
            report_id: ReportId::new_unchecked(sql.report_id),
            parent_id: sql.parent_id.map(CommentId::new_unchecked),
            author_name: sql.author_name,
            text: sql.text,
            created_at: sql.created_at,
            updated_at: sql.updated_at,
        }
    }
}
