use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use domain::{ActorId, ReactionDetail, ReactionKind, ReactionSummary, ReportEvent, ReportId};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Actor used when a client sends no session id at all.
const ANONYMOUS_ACTOR: &str = "anon";

fn actor(session_id: Option<String>) -> Result<ActorId, ApiError> {
    match session_id.filter(|s| !s.is_empty()) {
        Some(s) => Ok(ActorId::new(s)?),
        None => Ok(ActorId::new_unchecked(ANONYMOUS_ACTOR)),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub session_id: Option<String>,
    #[serde(alias = "type")]
    pub reaction_type: Option<ReactionKind>,
}

pub async fn reaction_summary(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ReactionSummary>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    let actor = actor(query.session_id)?;
    Ok(Json(state.db.reaction_summary(&report_id, &actor).await?))
}

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<Json<ReactionSummary>, ApiError> {
    let Json(payload) = payload?;
    let report_id = ReportId::new(report_id)?;
    let actor = actor(payload.session_id)?;
    let summary = state
        .db
        .toggle_reaction(&report_id, &actor, payload.reaction_type)
        .await?;
    state.publish(ReportEvent::ReactionsChanged {
        report_id,
        counts: summary.counts.clone(),
        total: summary.total,
    });
    Ok(Json(summary))
}

pub async fn reaction_detail(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<ReactionDetail>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    Ok(Json(state.db.reaction_detail(&report_id).await?))
}
