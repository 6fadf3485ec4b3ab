pub mod button;
pub mod calendar;
pub mod entry;
pub mod notify;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/entries", get(entry::list_handler))
        .route("/entries/:entry_id/sensors", get(entry::sensors_handler))
        .route("/entries/:entry_id/calendar", get(calendar::handler))
        .route(
            "/entries/:entry_id/calendar/:waste_type_id",
            get(calendar::waste_type::handler),
        )
        .route("/entries/:entry_id/events", get(calendar::events_handler))
        .route("/entries/:entry_id/event", get(calendar::event_handler))
        .route("/entries/:entry_id/buttons", get(button::list_handler))
        .route(
            "/entries/:entry_id/buttons/:unique_id",
            post(button::press_handler),
        )
        .route("/entries/:entry_id/notify", post(notify::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
