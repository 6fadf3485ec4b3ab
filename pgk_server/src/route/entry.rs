use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pgk_core::{entity::DeviceInfo, sensor::SensorState};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EntrySummary {
    entry_id: String,
    title: String,
    ready: bool,
    device: DeviceInfo,
}

pub async fn list_handler(State(state): State<AppState>) -> Json<Vec<EntrySummary>> {
    let mut entries = vec![];
    for coordinator in state.coordinators() {
        let entry = coordinator.entry();
        entries.push(EntrySummary {
            entry_id: entry.entry_id.clone(),
            title: entry.title.clone(),
            ready: coordinator.is_ready().await,
            device: DeviceInfo::new(entry),
        });
    }
    Json(entries)
}

/// The sensor states as of the last recomputation.
pub async fn sensors_handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<Vec<SensorState>>, (StatusCode, String)> {
    let coordinator = state.ready_coordinator(&entry_id).await?;
    Ok(Json(coordinator.sensors().await))
}
