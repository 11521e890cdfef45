use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use domain::ReportId;
use futures::stream::Stream;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::http::error::ApiError;
use crate::state::AppState;

/// Live feed of one report's events. Events of other reports never reach it.
pub async fn sse_handler(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let report_id = ReportId::new(report_id)?;
    let rx = state.tx_events.subscribe();
    tracing::info!("SSE connected: report={}", report_id);
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.report_id() == &report_id => Some(
            Event::default()
                .event(event.name())
                .json_data(&event)
                .map_err(|e| {
                    tracing::error!("SSE serialization error: {}", e);
                    axum::Error::new(e)
                }),
        ),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("SSE listener for {} fell behind: {}", report_id, e);
            None
        }
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(std::time::Duration::from_secs(15))))
}
