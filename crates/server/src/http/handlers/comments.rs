use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use domain::{Comment, CommentId, NewComment, ReportEvent, ReportId, ValidationError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    // older frontends post the body as `name`
    #[serde(alias = "name")]
    pub text: Option<String>,
    pub parent_id: Option<String>,
    pub author_name: Option<String>,
}

#[derive(Deserialize)]
pub struct EditCommentRequest {
    pub text: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    Ok(Json(state.db.list_comments(&report_id).await?))
}

pub async fn count_comments(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    let count = state.db.count_comments(&report_id).await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Json(payload) = payload?;
    let report_id = ReportId::new(report_id)?;
    let text = payload.text.ok_or(ValidationError::MissingField("text"))?;
    let parent_id = payload
        .parent_id
        .filter(|p| !p.is_empty())
        .map(CommentId::new)
        .transpose()?;
    let new = NewComment::new(report_id, &text, parent_id, payload.author_name.as_deref())?;

    let comment = state.db.create_comment(&new).await?;
    info!("Comment {} posted on report {}", comment.id, comment.report_id);
    state.publish(ReportEvent::CommentCreated {
        report_id: comment.report_id.clone(),
        comment: comment.clone(),
    });
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EditCommentRequest>, JsonRejection>,
) -> Result<Json<Comment>, ApiError> {
    if !state.allow_edit {
        return Err(ApiError::EditDisabled);
    }
    let Json(payload) = payload?;
    let id = CommentId::new(id)?;
    let comment = state.db.edit_comment(&id, &payload.text).await?;
    state.publish(ReportEvent::CommentUpdated {
        report_id: comment.report_id.clone(),
        comment: comment.clone(),
    });
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = CommentId::new(id)?;
    let report_id = state.db.delete_comment(&id).await?;
    info!("Comment {} deleted from report {}", id, report_id);
    state.publish(ReportEvent::CommentDeleted {
        report_id,
        comment_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}
