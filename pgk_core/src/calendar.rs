//! The calendar of all pickups, and its iCalendar export.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEventBuilder, Property},
    ical_property,
};
use serde::Serialize;

use crate::{
    config::EntryConfig,
    entity::{entity_id, slugify, DeviceInfo},
    rsc::{BASE_SITE, PATH},
    schedule::ScheduleData,
    waste_type::{self, WasteTypeBitmask},
};

static NAME: &str = "Harmonogram odpadów";
static ICON: &str = "mdi:calendar";
static PROD_ID: &str = "-//Harmonogram//pgkslupsk.pl";
static TIMEZONE: &str = "Europe/Warsaw";
static FORMAT: &str = "%Y%m%d";

/// An all-day event covering `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub description: String,
    #[serde(skip)]
    waste_type_id: String,
}

impl CalendarEvent {
    fn start_time(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    fn end_time(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN)
    }

    pub fn waste_type_id(&self) -> &str {
        &self.waste_type_id
    }
}

/// The calendar entity of an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarInfo {
    pub unique_id: String,
    pub entity_id: String,
    pub name: String,
    pub icon: String,
    pub device: DeviceInfo,
}

impl CalendarInfo {
    pub fn new(entry: &EntryConfig) -> Self {
        Self {
            unique_id: format!("{}_waste_calendar", entry.entry_id),
            entity_id: entity_id("calendar", entry, "harmonogram"),
            name: NAME.to_string(),
            icon: ICON.to_string(),
            device: DeviceInfo::new(entry),
        }
    }
}

/// One event per waste type and date, sorted by start.
pub fn generate_all_events(entry: &EntryConfig, data: &ScheduleData) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = data
        .iter()
        .flat_map(|(id, waste_data)| {
            let summary = waste_type::display_name(id, waste_data.name.as_deref());
            waste_data.dates.iter().map(move |date| CalendarEvent {
                summary: summary.clone(),
                start: *date,
                end: *date + Duration::days(1),
                description: entry.title.clone(),
                waste_type_id: id.clone(),
            })
        })
        .collect();
    events.sort_by_key(|event| event.start);
    events
}

/// Events overlapping `[start, end)`, in local wall time.
pub fn events_in_range(
    events: &[CalendarEvent],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<CalendarEvent> {
    let found: Vec<CalendarEvent> = events
        .iter()
        .filter(|event| event.start_time() < end && event.end_time() > start)
        .cloned()
        .collect();
    tracing::debug!("{} events between {start} and {end}", found.len());
    found
}

/// The ongoing event, or else the next upcoming one.
pub fn next_event(events: &[CalendarEvent], now: NaiveDateTime) -> Option<&CalendarEvent> {
    let pending = events.iter().filter(|event| event.end_time() > now);
    let (ongoing, upcoming): (Vec<&CalendarEvent>, Vec<&CalendarEvent>) =
        pending.partition(|event| event.start_time() <= now);
    ongoing
        .into_iter()
        .min_by_key(|event| event.start)
        .or_else(|| upcoming.into_iter().min_by_key(|event| event.start))
}

/// Get a unique id for a specific pickup at a specific entry.
///
/// Changing this function is a breaking change!
fn uid(entry: &EntryConfig, event: &CalendarEvent) -> String {
    format!(
        "{}_{}_{}@pgkslupsk.pl",
        slugify(&entry.entry_id),
        slugify(&event.waste_type_id),
        event.start.format(FORMAT)
    )
}

/// Build the iCalendar of an entry, leaving out excluded waste types.
pub fn to_ical(
    entry: &EntryConfig,
    events: &[CalendarEvent],
    excluded_waste_types: WasteTypeBitmask,
) -> IcalCalendar {
    let changed = chrono::Local::now().format("%Y%m%dT%H%M%S").to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    for event in events {
        if waste_type::is_excluded(&event.waste_type_id, excluded_waste_types) {
            continue;
        }
        calendar.events.push(
            IcalEventBuilder::tzid(TIMEZONE)
                .uid(uid(entry, event))
                .changed(&changed)
                .one_day(event.start.format(FORMAT).to_string())
                .set(ical_property!("SUMMARY", event.summary.as_str()))
                .set(ical_property!("DESCRIPTION", event.description.as_str()))
                .set(ical_property!("URL", format!("{BASE_SITE}{PATH}")))
                .set(ical_property!("TRANSP", "TRANSPARENT"))
                .build(),
        );
    }
    calendar
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{NaiveDate, NaiveDateTime};
    use ical::generator::{Emitter, IcalCalendar};

    use crate::{
        calendar::{events_in_range, generate_all_events, next_event, to_ical, CalendarInfo},
        config::EntryConfig,
        schedule::{ScheduleData, WasteTypeData},
        waste_type::WasteTypeBitmask,
    };

    fn entry() -> EntryConfig {
        EntryConfig {
            entry_id: "e1".to_string(),
            title: "Słupsk - Długa".to_string(),
            ..EntryConfig::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn at(s: &str, hour: u32) -> NaiveDateTime {
        date(s).and_hms_opt(hour, 0, 0).unwrap()
    }

    fn data() -> ScheduleData {
        let updated = at("2025-01-01", 3);
        ScheduleData::from([
            (
                "PAP".to_string(),
                WasteTypeData {
                    name: Some("PAPIER".to_string()),
                    color: None,
                    dates: vec![date("2025-01-08"), date("2025-02-05")],
                    updated,
                },
            ),
            (
                "BIO".to_string(),
                WasteTypeData {
                    name: None,
                    color: None,
                    dates: vec![date("2025-01-06"), date("2025-01-08")],
                    updated,
                },
            ),
        ])
    }

    fn find_property<'a>(calendar: &'a IcalCalendar, index: usize, name: &str) -> &'a str {
        calendar.events[index]
            .properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_deref())
            .unwrap()
    }

    #[test]
    fn test_generate_all_events() {
        let events = generate_all_events(&entry(), &data());
        let summary: Vec<(&str, NaiveDate)> = events
            .iter()
            .map(|event| (event.summary.as_str(), event.start))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Bio", date("2025-01-06")),
                ("Bio", date("2025-01-08")),
                ("Papier", date("2025-01-08")),
                ("Papier", date("2025-02-05")),
            ]
        );
        assert_eq!(events[0].end, date("2025-01-07"));
        assert_eq!(events[0].description, "Słupsk - Długa");
    }

    #[test]
    fn test_events_in_range() {
        let events = generate_all_events(&entry(), &data());
        let found = events_in_range(&events, at("2025-01-07", 0), at("2025-01-08", 0));
        assert!(found.is_empty());
        let found = events_in_range(&events, at("2025-01-06", 23), at("2025-01-08", 1));
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_next_event() {
        let events = generate_all_events(&entry(), &data());
        let ongoing = next_event(&events, at("2025-01-08", 10)).unwrap();
        assert_eq!(ongoing.start, date("2025-01-08"));
        assert_eq!(ongoing.summary, "Bio");
        let upcoming = next_event(&events, at("2025-01-09", 0)).unwrap();
        assert_eq!(upcoming.start, date("2025-02-05"));
        assert!(next_event(&events, at("2025-02-06", 0)).is_none());
    }

    #[test]
    fn test_calendar_info() {
        let info = CalendarInfo::new(&entry());
        assert_eq!(info.unique_id, "e1_waste_calendar");
        assert_eq!(info.entity_id, "calendar.pgk_slupsk_slupsk_dluga_harmonogram");
        assert_eq!(info.name, "Harmonogram odpadów");
    }

    #[test]
    fn test_to_ical() {
        let events = generate_all_events(&entry(), &data());
        let calendar = to_ical(&entry(), &events, WasteTypeBitmask::none());
        assert_eq!(calendar.events.len(), 4);
        assert_eq!(find_property(&calendar, 0, "DTSTART"), "20250106");
        assert_eq!(find_property(&calendar, 0, "UID"), "e1_bio_20250106@pgkslupsk.pl");
        assert_eq!(find_property(&calendar, 2, "SUMMARY"), "Papier");
        assert!(calendar.generate().contains("PRODID:-//Harmonogram//pgkslupsk.pl"));
    }

    #[test]
    fn test_to_ical_exclusion() {
        let events = generate_all_events(&entry(), &data());
        let calendar = to_ical(&entry(), &events, WasteTypeBitmask::Paper);
        assert_eq!(calendar.events.len(), 2);
        assert_eq!(find_property(&calendar, 1, "SUMMARY"), "Bio");
    }
}
