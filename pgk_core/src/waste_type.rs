//! Static knowledge about the waste fractions collected by PGK Słupsk.

use bitmask_enum::bitmask;

pub static DEVICE_NAME: &str = "Odbiór odpadów";
pub static MANUFACTURER: &str = "PGK Słupsk";
pub static DEFAULT_NAME: &str = "Odpady";
pub static DEFAULT_ICON: &str = "mdi:trash-can";

/// Polish weekday names, Monday first.
pub static WEEKDAYS: [&str; 7] = [
    "poniedziałek",
    "wtorek",
    "środa",
    "czwartek",
    "piątek",
    "sobota",
    "niedziela",
];

/// A fraction known by its code in the current API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteType {
    pub code: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub bit: WasteTypeBitmask,
}

#[bitmask]
pub enum WasteTypeBitmask {
    Bio,
    Christmas,
    Plastic,
    Paper,
    Glass,
    Mixed,
    Bulky,
    Textile,
}

pub static WASTE_TYPES: [WasteType; 8] = [
    WasteType {
        code: "BIO",
        name: "Bio",
        icon: "mdi:leaf",
        bit: WasteTypeBitmask::Bio,
    },
    WasteType {
        code: "CHO",
        name: "Choinki",
        icon: "mdi:pine-tree",
        bit: WasteTypeBitmask::Christmas,
    },
    WasteType {
        code: "TW",
        name: "Plastik i metal",
        icon: "mdi:recycle",
        bit: WasteTypeBitmask::Plastic,
    },
    WasteType {
        code: "PAP",
        name: "Papier",
        icon: "mdi:newspaper",
        bit: WasteTypeBitmask::Paper,
    },
    WasteType {
        code: "SZ",
        name: "Szkło",
        icon: "mdi:bottle-wine",
        bit: WasteTypeBitmask::Glass,
    },
    WasteType {
        code: "ZM",
        name: "Zmieszane",
        icon: "mdi:trash-can",
        bit: WasteTypeBitmask::Mixed,
    },
    WasteType {
        code: "GAB",
        name: "Gabaryty",
        icon: "mdi:dump-truck",
        bit: WasteTypeBitmask::Bulky,
    },
    WasteType {
        code: "OIT",
        name: "Tekstylia",
        icon: "mdi:tshirt-crew",
        bit: WasteTypeBitmask::Textile,
    },
];

/// Icons for the numeric ids used by the legacy infocity API.
static LEGACY_ICONS: [(&str, &str); 8] = [
    ("10", "mdi:leaf"),
    ("13", "mdi:pine-tree"),
    ("1", "mdi:recycle"),
    ("3", "mdi:newspaper"),
    ("11", "mdi:bottle-wine"),
    ("2", "mdi:trash-can"),
    ("7", "mdi:dump-truck"),
    ("26", "mdi:tshirt-crew"),
];

pub fn find(code: &str) -> Option<&'static WasteType> {
    WASTE_TYPES.iter().find(|waste_type| waste_type.code == code)
}

/// The name shown for a fraction: the known name, else what the API said, else a generic label.
pub fn display_name(code: &str, api_name: Option<&str>) -> String {
    if let Some(waste_type) = find(code) {
        return waste_type.name.to_string();
    }
    match api_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_NAME.to_string(),
    }
}

pub fn icon(code: &str) -> &'static str {
    find(code)
        .map(|waste_type| waste_type.icon)
        .or_else(|| {
            LEGACY_ICONS
                .iter()
                .find(|(id, _)| *id == code)
                .map(|(_, icon)| *icon)
        })
        .unwrap_or(DEFAULT_ICON)
}

/// Whether a fraction is excluded. Unknown codes are never excluded.
pub fn is_excluded(code: &str, excluded: WasteTypeBitmask) -> bool {
    find(code).is_some_and(|waste_type| excluded.contains(waste_type.bit))
}
