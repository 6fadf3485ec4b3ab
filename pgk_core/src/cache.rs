//! Local copy of the last fetched schedule and its ETag.
//!
//! Nothing in here is fatal: a cache that cannot be read behaves like an empty cache and
//! a cache that cannot be written is only logged.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;

/// The two cache files of one entry.
#[derive(Debug, Clone)]
pub struct Cache {
    json_path: PathBuf,
    etag_path: PathBuf,
}

impl Cache {
    pub fn new(cache_dir: &Path, entry_id: &str) -> Self {
        Self {
            json_path: cache_dir.join(format!("pgk_slupsk_{entry_id}.json")),
            etag_path: cache_dir.join(format!("pgk_slupsk_{entry_id}.etag")),
        }
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn etag_path(&self) -> &Path {
        &self.etag_path
    }

    /// Read the raw rows exactly as they were saved.
    pub async fn load_raw_json(&self) -> Option<Value> {
        let content = match fs::read_to_string(&self.json_path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(
                    "could not read cache file {}: {err}",
                    self.json_path.display()
                );
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(
                    "could not parse cache file {}: {err}",
                    self.json_path.display()
                );
                None
            }
        }
    }

    pub async fn save_raw_json(&self, data: &Value) {
        let content = match serde_json::to_string_pretty(data) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("could not serialize schedule data: {err}");
                return;
            }
        };
        if let Err(err) = self.write(&self.json_path, content).await {
            tracing::warn!(
                "could not write cache file {}: {err}",
                self.json_path.display()
            );
        }
    }

    pub async fn load_etag(&self) -> Option<String> {
        match fs::read_to_string(&self.etag_path).await {
            Ok(etag) => Some(etag.trim().to_string()).filter(|etag| !etag.is_empty()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(
                    "could not read ETag file {}: {err}",
                    self.etag_path.display()
                );
                None
            }
        }
    }

    /// Save the ETag. Nothing is written when there is none.
    pub async fn save_etag(&self, etag: Option<&str>) {
        let Some(etag) = etag.filter(|etag| !etag.is_empty()) else {
            return;
        };
        if let Err(err) = self.write(&self.etag_path, etag.to_string()).await {
            tracing::warn!(
                "could not write ETag file {}: {err}",
                self.etag_path.display()
            );
        }
    }

    /// Remove both files, returning the ones which existed.
    pub async fn clear(&self) -> Vec<PathBuf> {
        let mut removed = vec![];
        for path in [&self.json_path, &self.etag_path] {
            match fs::remove_file(path).await {
                Ok(()) => removed.push(path.clone()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!("could not remove {}: {err}", path.display()),
            }
        }
        if removed.is_empty() {
            tracing::info!("no cache to remove");
        } else {
            tracing::info!("removed cache: {removed:?}");
        }
        removed
    }

    async fn write(&self, path: &Path, content: String) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content).await
    }
}
