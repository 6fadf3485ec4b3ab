use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pgk_core::button::{self, Button};

use crate::state::AppState;

pub async fn list_handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<Vec<Button>>, (StatusCode, String)> {
    let coordinator = state.coordinator(&entry_id)?;
    Ok(Json(button::buttons(coordinator.entry())))
}

/// Press a button. What it does keeps running after the response is sent.
pub async fn press_handler(
    State(state): State<AppState>,
    Path((entry_id, unique_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Button>), (StatusCode, String)> {
    let coordinator = state.coordinator(&entry_id)?;
    let pressed = button::find(coordinator.entry(), &unique_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no button {unique_id}")))?;
    let action = pressed.action;
    tokio::spawn(async move { button::press(&coordinator, action).await });
    Ok((StatusCode::ACCEPTED, Json(pressed)))
}
