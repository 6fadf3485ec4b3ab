pub mod waste_type;

use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use pgk_core::{
    calendar::{self, CalendarEvent, CalendarInfo},
    ical::generator::Emitter,
    waste_type::WasteTypeBitmask,
};
use serde::{Deserialize, Serialize};

use crate::state::{AppState, EntryCoordinator};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeQueryParams {
    #[serde(default)]
    exclude_bio: bool,
    #[serde(default)]
    exclude_christmas: bool,
    #[serde(default)]
    exclude_plastic: bool,
    #[serde(default)]
    exclude_paper: bool,
    #[serde(default)]
    exclude_glass: bool,
    #[serde(default)]
    exclude_mixed: bool,
    #[serde(default)]
    exclude_bulky: bool,
    #[serde(default)]
    exclude_textile: bool,
}

impl From<&ExcludeQueryParams> for WasteTypeBitmask {
    fn from(value: &ExcludeQueryParams) -> Self {
        let mut waste_type_bitmask = WasteTypeBitmask::none();
        if value.exclude_bio {
            waste_type_bitmask |= WasteTypeBitmask::Bio;
        }
        if value.exclude_christmas {
            waste_type_bitmask |= WasteTypeBitmask::Christmas;
        }
        if value.exclude_plastic {
            waste_type_bitmask |= WasteTypeBitmask::Plastic;
        }
        if value.exclude_paper {
            waste_type_bitmask |= WasteTypeBitmask::Paper;
        }
        if value.exclude_glass {
            waste_type_bitmask |= WasteTypeBitmask::Glass;
        }
        if value.exclude_mixed {
            waste_type_bitmask |= WasteTypeBitmask::Mixed;
        }
        if value.exclude_bulky {
            waste_type_bitmask |= WasteTypeBitmask::Bulky;
        }
        if value.exclude_textile {
            waste_type_bitmask |= WasteTypeBitmask::Textile;
        }
        waste_type_bitmask
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RangeQueryParams {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct NextEvent {
    calendar: CalendarInfo,
    event: Option<CalendarEvent>,
}

pub fn handle(
    coordinator: &EntryCoordinator,
    events: &[CalendarEvent],
    excluded_waste_types: WasteTypeBitmask,
) -> Response {
    let ical_calendar = calendar::to_ical(coordinator.entry(), events, excluded_waste_types);
    ([(CONTENT_TYPE, "text/calendar")], ical_calendar.generate()).into_response()
}

/// Handle calendar requests.
///
/// Waste types can be left out with `exclude_*` flags in the query string.
pub async fn handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Query(query_params): Query<ExcludeQueryParams>,
) -> Result<Response, (StatusCode, String)> {
    let coordinator = state.ready_coordinator(&entry_id).await?;
    let events = coordinator.events().await;
    Ok(handle(
        &coordinator,
        &events,
        WasteTypeBitmask::from(&query_params),
    ))
}

/// Events overlapping `[start, end)`, both given as local date and time.
pub async fn events_handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
    Query(range): Query<RangeQueryParams>,
) -> Result<Json<Vec<CalendarEvent>>, (StatusCode, String)> {
    if range.end <= range.start {
        return Err((
            StatusCode::BAD_REQUEST,
            "end must be after start".to_string(),
        ));
    }
    let coordinator = state.ready_coordinator(&entry_id).await?;
    let events = coordinator.events().await;
    Ok(Json(calendar::events_in_range(
        &events,
        range.start,
        range.end,
    )))
}

/// The calendar entity with its current or next event.
pub async fn event_handler(
    State(state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<NextEvent>, (StatusCode, String)> {
    let coordinator = state.ready_coordinator(&entry_id).await?;
    let events = coordinator.events().await;
    let now = chrono::Local::now().naive_local();
    Ok(Json(NextEvent {
        calendar: CalendarInfo::new(coordinator.entry()),
        event: calendar::next_event(&events, now).cloned(),
    }))
}
