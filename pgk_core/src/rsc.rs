//! Parsing of the schedule page served by <https://pgkslupsk.pl>.
//!
//! The page is a React Server Components ("Flight") payload when requested with the
//! `RSC: 1` header. Somewhere inside it sits a `"scheduleData": {...}` JSON object with
//! a GraphQL-shaped description of the schedule, which is converted to legacy rows.

use std::{collections::HashMap, sync::OnceLock};

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::{
    error::{Error, Result},
    schedule::ScheduleRow,
};

pub static BASE_SITE: &str = "https://pgkslupsk.pl";
pub static PATH: &str = "/harmonogram-odbioru-odpadow";
static LEGACY_ACTION: &str = "HARMONOGRAM";

fn schedule_data_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#""scheduleData"\s*:\s*\{"#).unwrap())
}

/// Build the URL of the schedule page for a location.
pub fn build_rsc_url(customer_type: &str, region: &str, location: &str) -> Result<Url> {
    Url::parse_with_params(
        &format!("{BASE_SITE}{PATH}"),
        [
            ("type", customer_type),
            ("region", region),
            ("location", location),
        ],
    )
    .map_err(|err| Error::Config(err.to_string()))
}

/// Headers which make the site answer with the RSC payload instead of HTML.
pub fn rsc_headers() -> [(&'static str, String); 4] {
    [
        ("Accept", "text/x-component".to_string()),
        ("RSC", "1".to_string()),
        ("User-Agent", "WebKit=Android".to_string()),
        ("Referer", format!("{BASE_SITE}{PATH}")),
    ]
}

/// Extract the JSON object starting at `start_index` up to its matching closing brace.
///
/// Braces inside string literals are ignored.
pub fn extract_balanced_object(text: &str, start_index: usize) -> Result<&str> {
    let bytes = text.as_bytes();
    if bytes.get(start_index) != Some(&b'{') {
        return Err(Error::InvalidStartIndex(start_index));
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, byte) in bytes.iter().enumerate().skip(start_index) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start_index..=index]);
                }
            }
            _ => {}
        }
    }
    Err(Error::UnbalancedObject)
}

/// Find and parse the `scheduleData` object in an RSC payload.
pub fn extract_schedule_data(rsc_text: &str) -> Result<Value> {
    let found = schedule_data_regex()
        .find(rsc_text)
        .ok_or(Error::ScheduleDataMissing)?;
    let object = extract_balanced_object(rsc_text, found.end() - 1)?;
    Ok(serde_json::from_str(object)?)
}

struct Fraction {
    name: String,
    color: String,
}

fn trimmed_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("").trim()
}

/// Map fraction codes to their names and colors.
///
/// `scheduleFractions` is a GraphQL connection, so the fractions are in `edges[].node`.
fn build_fraction_index(node: &Value) -> HashMap<String, Fraction> {
    let Some(edges) = node.pointer("/scheduleFractions/edges").and_then(Value::as_array) else {
        return HashMap::new();
    };
    edges
        .iter()
        .filter_map(|edge| edge.get("node").filter(|node| node.is_object()))
        .filter_map(|fraction| {
            let code = trimmed_str(fraction, "code");
            if code.is_empty() {
                return None;
            }
            Some((
                code.to_string(),
                Fraction {
                    name: trimmed_str(fraction, "name").to_string(),
                    color: trimmed_str(fraction, "color").to_string(),
                },
            ))
        })
        .collect()
}

fn as_int(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

/// Convert `scheduleData` into legacy rows sorted by date and waste type.
pub fn convert_schedule_to_legacy(schedule_data: &Value) -> Result<Vec<ScheduleRow>> {
    let node = schedule_data
        .get("node")
        .filter(|node| node.is_object())
        .ok_or(Error::Structure("scheduleData.node is not an object"))?;
    let fractions = build_fraction_index(node);
    let schedule = node
        .get("schedule")
        .and_then(Value::as_array)
        .ok_or(Error::Structure("node.schedule is not a list"))?;

    let mut rows: Vec<ScheduleRow> = vec![];
    let mut add_row = |date: &str, code: &str| {
        let (name, color) = fractions
            .get(code)
            .map(|fraction| (fraction.name.clone(), fraction.color.clone()))
            .unwrap_or_default();
        rows.push(ScheduleRow {
            schedule_id: 0,
            action_id: 1,
            action: LEGACY_ACTION.to_string(),
            waste_type_id: code.to_string(),
            waste_type: name,
            color,
            date: date.to_string(),
        });
    };

    for month in schedule {
        let (Some(year), Some(month_number)) = (as_int(month, "year"), as_int(month, "monthNumber"))
        else {
            continue;
        };
        let Some(day_items) = month.get("dayItems").and_then(Value::as_array) else {
            continue;
        };
        for day in day_items {
            let Some(day_number) = as_int(day, "dayNumber") else {
                continue;
            };
            let date = format!("{year}-{month_number:02}-{day_number:02}");
            let Some(fractions_map) = day.get("fractionsMap").and_then(Value::as_array) else {
                continue;
            };
            for fraction in fractions_map {
                let parent_code = trimmed_str(fraction, "code");
                if parent_code.is_empty() {
                    continue;
                }
                add_row(&date, parent_code);
                let children = fraction
                    .get("childFractions")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                for child in children {
                    let child_code = trimmed_str(child, "code");
                    if child_code.is_empty() || child_code == parent_code {
                        continue;
                    }
                    add_row(&date, child_code);
                }
            }
        }
    }

    rows.sort_by(|a, b| (&a.date, &a.waste_type_id).cmp(&(&b.date, &b.waste_type_id)));
    for (index, row) in rows.iter_mut().enumerate() {
        row.schedule_id = index as u32 + 1;
    }
    Ok(rows)
}

/// Parse a whole RSC payload into legacy rows.
pub fn parse(rsc_text: &str) -> Result<Vec<ScheduleRow>> {
    let schedule_data = extract_schedule_data(rsc_text)?;
    convert_schedule_to_legacy(&schedule_data)
}
