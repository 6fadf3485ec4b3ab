//! The normalized schedule format and its per-waste-type view.
//!
//! Both API generations end up as a flat list of [`ScheduleRow`]s, the format of the
//! legacy infocity API. That list is what gets cached on disk. [`process_raw_data`] turns
//! it into one [`WasteTypeData`] per waste type.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub static DATE_FORMAT: &str = "%Y-%m-%d";
pub static TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single pickup of one waste type on one date, in the legacy API format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    #[serde(rename = "HarmonogramId")]
    pub schedule_id: u32,
    #[serde(rename = "AkcjaId")]
    pub action_id: u32,
    #[serde(rename = "Akcja")]
    pub action: String,
    #[serde(rename = "TypOdpaduId")]
    pub waste_type_id: String,
    #[serde(rename = "TypOdpadu")]
    pub waste_type: String,
    #[serde(rename = "Kolor")]
    pub color: String,
    #[serde(rename = "Data")]
    pub date: String,
}

/// Everything known about one waste type after processing.
#[derive(Debug, Clone, PartialEq)]
pub struct WasteTypeData {
    /// The name the API gave the waste type.
    pub name: Option<String>,
    pub color: Option<String>,
    /// Sorted and unique.
    pub dates: Vec<NaiveDate>,
    /// When this data was processed.
    pub updated: NaiveDateTime,
}

impl WasteTypeData {
    pub fn updated_string(&self) -> String {
        self.updated.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Processed schedule keyed by waste type id.
pub type ScheduleData = BTreeMap<String, WasteTypeData>;

/// Group raw rows by waste type.
///
/// The input is untyped because the cache might hold rows written by either API
/// generation, with string or numeric waste type ids.
pub fn process_raw_data(raw: &Value, now: NaiveDateTime) -> ScheduleData {
    let mut processed = ScheduleData::new();
    let Some(rows) = raw.as_array() else {
        tracing::warn!("unexpected schedule data format, expected a list");
        return processed;
    };
    for row in rows {
        let Some(row) = row.as_object() else {
            continue;
        };
        let waste_type_id = match row.get("TypOdpaduId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                tracing::debug!("skipping row without TypOdpaduId: {row:?}");
                continue;
            }
        };
        let data = processed
            .entry(waste_type_id)
            .or_insert_with(|| WasteTypeData {
                name: row
                    .get("TypOdpadu")
                    .and_then(Value::as_str)
                    .map(String::from),
                color: row.get("Kolor").and_then(Value::as_str).map(String::from),
                dates: vec![],
                updated: now,
            });
        let date = row
            .get("Data")
            .and_then(Value::as_str)
            .and_then(|date| NaiveDate::parse_from_str(date, DATE_FORMAT).ok());
        if let Some(date) = date {
            data.dates.push(date);
        }
    }
    for data in processed.values_mut() {
        data.dates.sort();
        data.dates.dedup();
    }
    processed
}

/// Number of rows in raw data, for logging.
pub fn row_count(raw: &Value) -> Option<usize> {
    raw.as_array().map(Vec::len)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;

    use crate::schedule::{process_raw_data, ScheduleRow};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_process_groups_sorts_and_dedups() {
        let raw = json!([
            {"TypOdpaduId": "PAP", "TypOdpadu": "PAPIER", "Kolor": "blue", "Data": "2025-02-03"},
            {"TypOdpaduId": "BIO", "TypOdpadu": "BIO", "Kolor": "brown", "Data": "2025-01-20"},
            {
                "TypOdpaduId": "PAP",
                "TypOdpadu": "ignored",
                "Kolor": "ignored",
                "Data": "2025-01-13"
            },
            {"TypOdpaduId": "PAP", "Data": "2025-02-03"},
        ]);
        let processed = process_raw_data(&raw, now());
        assert_eq!(processed.len(), 2);
        let paper = &processed["PAP"];
        assert_eq!(paper.name.as_deref(), Some("PAPIER"));
        assert_eq!(paper.color.as_deref(), Some("blue"));
        assert_eq!(
            paper.dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            ]
        );
        assert_eq!(paper.updated_string(), "2025-01-10 12:00:00");
    }

    #[test]
    fn test_process_accepts_legacy_numeric_ids() {
        let raw = json!([
            {
                "HarmonogramId": 7,
                "TypOdpaduId": 10,
                "TypOdpadu": "BIO",
                "Kolor": "#8B4513",
                "Data": "2024-05-06"
            },
        ]);
        let processed = process_raw_data(&raw, now());
        assert_eq!(
            processed["10"].dates,
            vec![NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()]
        );
    }

    #[test]
    fn test_process_skips_bad_rows() {
        let raw = json!([
            "not an object",
            {"TypOdpadu": "no id", "Data": "2025-01-01"},
            {"TypOdpaduId": "SZ", "Data": "01.02.2025"},
            {"TypOdpaduId": "SZ", "Data": 20250201},
        ]);
        let processed = process_raw_data(&raw, now());
        assert_eq!(processed.len(), 1);
        assert!(processed["SZ"].dates.is_empty());
        assert_eq!(processed["SZ"].name, None);
    }

    #[test]
    fn test_process_non_list() {
        assert!(process_raw_data(&json!({"TypOdpaduId": "SZ"}), now()).is_empty());
    }

    #[test]
    fn test_row_field_names() {
        let row = ScheduleRow {
            schedule_id: 1,
            action_id: 1,
            action: "HARMONOGRAM".into(),
            waste_type_id: "ZM".into(),
            waste_type: "Zmieszane".into(),
            color: "black".into(),
            date: "2025-03-01".into(),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["TypOdpaduId"], "ZM");
        assert_eq!(value["Data"], "2025-03-01");
        assert_eq!(value["HarmonogramId"], 1);
    }
}
