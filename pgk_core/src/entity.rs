//! Identity shared by all entities of an entry: ids, entity ids and the device.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::{
    config::EntryConfig,
    waste_type::{DEVICE_NAME, MANUFACTURER},
};

static ENTITY_PREFIX: &str = "pgk_slupsk";

/// The device all entities of an entry belong to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn new(entry: &EntryConfig) -> Self {
        Self {
            identifier: format!("{}::service", entry.entry_id),
            name: DEVICE_NAME.to_string(),
            manufacturer: MANUFACTURER.to_string(),
            model: entry.title.clone(),
        }
    }
}

fn transliterate(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        other => other,
    }
}

/// Turn a name into an identifier part: lowercase ASCII, runs of anything else become `_`.
pub fn slugify(name: &str) -> String {
    static NON_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();
    let regex = NON_ALPHANUMERIC.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let lowercase: String = name.to_lowercase().chars().map(transliterate).collect();
    regex
        .replace_all(&lowercase, "_")
        .trim_matches('_')
        .to_string()
}

/// Build `<domain>.pgk_slupsk_<title>_<suffix>`.
pub fn entity_id(domain: &str, entry: &EntryConfig, suffix: &str) -> String {
    format!(
        "{domain}.{}",
        slugify(&format!("{ENTITY_PREFIX}_{}_{suffix}", entry.title))
    )
}
