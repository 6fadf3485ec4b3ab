use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pgk_core::automation;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyQueryParams {
    /// overrides the `notify_service` of the entry
    notify_service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResult {
    state: String,
    sent: bool,
}

/// Run the notification action with the current state of the day-before sensor.
pub async fn handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Query(query_params): Query<NotifyQueryParams>,
) -> Result<Json<NotifyResult>, (StatusCode, String)> {
    let coordinator = state.coordinator(&entry_id)?;
    let notify_service = query_params
        .notify_service
        .or_else(|| coordinator.entry().notify_service.clone())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("entry {entry_id} has no notify_service"),
            )
        })?;
    let tomorrow = coordinator.tomorrow_state();
    let sent = automation::send_notification(state.notifier(), &tomorrow, &notify_service)
        .await
        .map_err(|err| (StatusCode::BAD_GATEWAY, err.to_string()))?;
    Ok(Json(NotifyResult {
        state: tomorrow,
        sent,
    }))
}
