use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use domain::{ActorId, RatingStats, RatingValue, ReportEvent, ReportId};
use serde::Deserialize;
use tracing::info;

use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub user_id: String,
    pub value: u8,
}

pub async fn rating_stats(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<RatingStats>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    let user = query
        .user_id
        .filter(|u| !u.is_empty())
        .map(ActorId::new)
        .transpose()?;
    Ok(Json(state.db.rating_stats(&report_id, user.as_ref()).await?))
}

pub async fn rate(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> Result<Json<RatingStats>, ApiError> {
    let Json(payload) = payload?;
    let report_id = ReportId::new(report_id)?;
    let user = ActorId::new(payload.user_id)?;
    let value = RatingValue::new(payload.value)?;
    let stats = state.db.rate(&report_id, &user, value).await?;
    info!("Report {} rated {} by {}", report_id, value.get(), user);
    state.publish(ReportEvent::RatingsChanged {
        report_id,
        stats: stats.clone(),
    });
    Ok(Json(stats))
}
