use std::path::PathBuf;

/// Errors produced while fetching, parsing and caching schedule data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {0}")]
    Status(u16),

    #[error("\"scheduleData\" not found in RSC payload")]
    ScheduleDataMissing,

    #[error("start index {0} does not point at '{{'")]
    InvalidStartIndex(usize),

    #[error("unbalanced JSON object (no matching '}}')")]
    UnbalancedObject,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected schedule structure: {0}")]
    Structure(&'static str),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("entry {0} is not ready: region and location are required")]
    EntryNotReady(String),

    #[error("update failed: {0}")]
    UpdateFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
