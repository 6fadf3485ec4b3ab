//! Sensor states derived from the processed schedule.
//!
//! States are snapshots: they are computed for a given moment and only change when they
//! are recomputed. That is why the coordinator recomputes them right after midnight.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{
    config::EntryConfig,
    entity::{entity_id, DeviceInfo},
    schedule::{ScheduleData, WasteTypeData, DATE_FORMAT, TIMESTAMP_FORMAT},
    waste_type::{self, WEEKDAYS},
};

pub static STATE_UNKNOWN: &str = "unknown";
pub static STATE_NO_DATA: &str = "none";
pub static STATE_NOTHING_TOMORROW: &str = "brak";
pub static TOMORROW_UNIQUE_ID_SUFFIX: &str = "_waste_tomorrow";
static TOMORROW_NAME: &str = "Odpady do przygotowania";
static TOMORROW_ICON: &str = "mdi:calendar-check";

/// Everything a host needs to show a sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub icon: String,
    pub state: String,
    pub attributes: SensorAttributes,
    pub device: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorAttributes {
    Waste(WasteAttributes),
    Tomorrow(TomorrowAttributes),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteAttributes {
    #[serde(rename = "Waste type")]
    pub waste_type: String,
    #[serde(rename = "Waste type (id)")]
    pub waste_type_id: String,
    #[serde(rename = "Container color")]
    pub color: Option<String>,
    /// The next pickup, today included.
    #[serde(rename = "Date")]
    pub date: Option<String>,
    /// All pickups from today on.
    #[serde(rename = "Dates")]
    pub dates: Vec<String>,
    #[serde(rename = "Days until pickup")]
    pub days_until_pickup: Option<i64>,
    /// When the data was fetched or loaded from the cache.
    #[serde(rename = "Updated")]
    pub updated: String,
    /// When this state was computed.
    #[serde(rename = "Refreshed")]
    pub refreshed: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TomorrowAttributes {
    #[serde(rename = "Refreshed")]
    pub refreshed: String,
}

/// Describe a pickup `days` days ahead, in Polish.
pub fn pickup_state(next: Option<(NaiveDate, i64)>) -> String {
    let Some((date, days)) = next else {
        return STATE_UNKNOWN.to_string();
    };
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    match days {
        0 => "dziś".to_string(),
        1 => "jutro".to_string(),
        2 => format!("{weekday}, pojutrze"),
        days if days > 2 => format!("{weekday}, za {days} dni"),
        _ => STATE_UNKNOWN.to_string(),
    }
}

/// The first date not before `today` and how many days ahead it is.
pub fn next_pickup(dates: &[NaiveDate], today: NaiveDate) -> Option<(NaiveDate, i64)> {
    dates
        .iter()
        .filter(|date| **date >= today)
        .min()
        .map(|date| (*date, (*date - today).num_days()))
}

/// First letter uppercase, the rest lowercase.
fn normalize_waste_type(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// The state of the sensor of one waste type.
pub fn waste_sensor(
    entry: &EntryConfig,
    waste_type_id: &str,
    data: &WasteTypeData,
    now: NaiveDateTime,
) -> SensorState {
    let today = now.date();
    let name = waste_type::display_name(waste_type_id, data.name.as_deref());
    let upcoming: Vec<NaiveDate> = data
        .dates
        .iter()
        .copied()
        .filter(|date| *date >= today)
        .collect();
    let next = next_pickup(&upcoming, today);
    let state = pickup_state(next);
    tracing::debug!("sensor {name}: {state}");
    let attributes = WasteAttributes {
        waste_type: normalize_waste_type(data.name.as_deref().unwrap_or(&name)),
        waste_type_id: waste_type_id.to_string(),
        color: data.color.clone(),
        date: next.map(|(date, _)| date.format(DATE_FORMAT).to_string()),
        dates: upcoming
            .iter()
            .map(|date| date.format(DATE_FORMAT).to_string())
            .collect(),
        days_until_pickup: next.map(|(_, days)| days),
        updated: data.updated_string(),
        refreshed: now.format(TIMESTAMP_FORMAT).to_string(),
    };
    SensorState {
        unique_id: format!("{}_waste_{waste_type_id}", entry.entry_id),
        entity_id: entity_id("sensor", entry, &name),
        icon: waste_type::icon(waste_type_id).to_string(),
        name,
        state,
        attributes: SensorAttributes::Waste(attributes),
        device: DeviceInfo::new(entry),
    }
}

/// Names of the waste types picked up the day after `today`, in id order.
pub fn waste_tomorrow(data: &ScheduleData, today: NaiveDate) -> Vec<String> {
    let tomorrow = today + Duration::days(1);
    data.iter()
        .filter(|(_, waste_data)| waste_data.dates.contains(&tomorrow))
        .map(|(id, waste_data)| waste_type::display_name(id, waste_data.name.as_deref()))
        .collect()
}

/// The state of the sensor listing what has to be put out for tomorrow.
pub fn tomorrow_sensor(
    entry: &EntryConfig,
    data: Option<&ScheduleData>,
    now: NaiveDateTime,
) -> SensorState {
    let state = match data {
        Some(data) if !data.is_empty() => {
            let names = waste_tomorrow(data, now.date());
            tracing::debug!("waste for tomorrow: {names:?}");
            if names.is_empty() {
                STATE_NOTHING_TOMORROW.to_string()
            } else {
                names.join(", ")
            }
        }
        _ => STATE_NO_DATA.to_string(),
    };
    SensorState {
        unique_id: format!("{}{TOMORROW_UNIQUE_ID_SUFFIX}", entry.entry_id),
        entity_id: entity_id("sensor", entry, "wtp"),
        name: TOMORROW_NAME.to_string(),
        icon: TOMORROW_ICON.to_string(),
        state,
        attributes: SensorAttributes::Tomorrow(TomorrowAttributes {
            refreshed: now.format(TIMESTAMP_FORMAT).to_string(),
        }),
        device: DeviceInfo::new(entry),
    }
}

/// All sensors of an entry: one per waste type, then the one for tomorrow.
///
/// Entity ids are unique: a clash gets `_2`, `_3` and so on appended.
pub fn all_sensors(
    entry: &EntryConfig,
    data: Option<&ScheduleData>,
    now: NaiveDateTime,
) -> Vec<SensorState> {
    let mut sensors: Vec<SensorState> = data
        .into_iter()
        .flatten()
        .map(|(id, waste_data)| waste_sensor(entry, id, waste_data, now))
        .collect();
    sensors.push(tomorrow_sensor(entry, data, now));
    let mut used = HashSet::new();
    for sensor in &mut sensors {
        if !used.insert(sensor.entity_id.clone()) {
            let unique = (2..)
                .map(|n| format!("{}_{n}", sensor.entity_id))
                .find(|candidate| !used.contains(candidate))
                .unwrap_or_default();
            tracing::debug!("{} is taken, using {unique}", sensor.entity_id);
            used.insert(unique.clone());
            sensor.entity_id = unique;
        }
    }
    sensors
}
