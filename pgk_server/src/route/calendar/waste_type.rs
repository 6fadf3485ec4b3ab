use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use pgk_core::{calendar::CalendarEvent, waste_type::WasteTypeBitmask};

use crate::{route::calendar::handle, state::AppState};

/// Handle calendar requests for a single waste type, known or not.
pub async fn handler(
    State(state): State<AppState>,
    Path((entry_id, waste_type_id)): Path<(String, String)>,
) -> Result<Response, (StatusCode, String)> {
    let coordinator = state.ready_coordinator(&entry_id).await?;
    let events: Vec<CalendarEvent> = coordinator
        .events()
        .await
        .into_iter()
        .filter(|event| event.waste_type_id().eq_ignore_ascii_case(&waste_type_id))
        .collect();
    if events.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            format!("no pickups of {waste_type_id} for entry {entry_id}"),
        ));
    }
    Ok(handle(&coordinator, &events, WasteTypeBitmask::none()))
}
