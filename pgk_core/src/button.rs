//! Diagnostic buttons of an entry.

use serde::Serialize;

use crate::{
    config::EntryConfig,
    coordinator::Coordinator,
    entity::{entity_id, DeviceInfo},
    garbage_client::ScheduleSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    /// Fetch from the API, retrying until it works.
    RefreshData,
    /// Recompute the sensors from the data already loaded.
    RecomputeSensors,
    /// Delete the cache and fetch everything again.
    ClearCache,
}

impl ButtonAction {
    pub const ALL: [ButtonAction; 3] = [
        ButtonAction::RefreshData,
        ButtonAction::RecomputeSensors,
        ButtonAction::ClearCache,
    ];

    fn unique_id_suffix(self) -> &'static str {
        match self {
            ButtonAction::RefreshData => "_refresh_button",
            ButtonAction::RecomputeSensors => "_sensors_refresh_button",
            ButtonAction::ClearCache => "_clear_cache",
        }
    }

    fn entity_suffix(self) -> &'static str {
        match self {
            ButtonAction::RefreshData => "api_refresh",
            ButtonAction::RecomputeSensors => "sensors_refresh",
            ButtonAction::ClearCache => "clear_cache",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ButtonAction::RefreshData => "Odśwież dane z API",
            ButtonAction::RecomputeSensors => "Odśwież sensory",
            ButtonAction::ClearCache => "Wyczyść cache",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            ButtonAction::RefreshData => "mdi:api",
            ButtonAction::RecomputeSensors => "mdi:api-off",
            ButtonAction::ClearCache => "mdi:cached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub icon: String,
    pub entity_category: String,
    pub action: ButtonAction,
    pub device: DeviceInfo,
}

impl Button {
    pub fn new(entry: &EntryConfig, action: ButtonAction) -> Self {
        Self {
            unique_id: format!("{}{}", entry.entry_id, action.unique_id_suffix()),
            entity_id: entity_id("button", entry, action.entity_suffix()),
            name: action.name().to_string(),
            icon: action.icon().to_string(),
            entity_category: "diagnostic".to_string(),
            action,
            device: DeviceInfo::new(entry),
        }
    }
}

pub fn buttons(entry: &EntryConfig) -> Vec<Button> {
    ButtonAction::ALL
        .into_iter()
        .map(|action| Button::new(entry, action))
        .collect()
}

pub fn find(entry: &EntryConfig, unique_id: &str) -> Option<Button> {
    buttons(entry)
        .into_iter()
        .find(|button| button.unique_id == unique_id)
}

/// Run what a button does.
pub async fn press<S: ScheduleSource>(coordinator: &Coordinator<S>, action: ButtonAction) {
    tracing::info!("{}: pressed {action:?}", coordinator.entry().entry_id);
    match action {
        ButtonAction::RefreshData => coordinator.retry_update_data().await,
        ButtonAction::RecomputeSensors => {
            coordinator
                .recompute_states(chrono::Local::now().naive_local())
                .await;
        }
        ButtonAction::ClearCache => coordinator.clear_cache().await,
    }
}
