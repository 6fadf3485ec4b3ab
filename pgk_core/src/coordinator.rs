//! Keeps the schedule of one entry up to date and derives the entity states from it.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use chrono::NaiveDateTime;
use serde_json::Value;
use tokio::sync::{watch, Mutex, RwLock};

use crate::{
    cache::Cache,
    calendar::{self, CalendarEvent},
    config::EntryConfig,
    error::{Error, Result},
    garbage_client::{Fetched, ScheduleSource},
    schedule::{self, ScheduleData},
    sensor::{self, SensorState, STATE_NO_DATA},
};

#[derive(Debug, Default)]
struct State {
    data: Option<ScheduleData>,
    sensors: Vec<SensorState>,
}

pub struct Coordinator<S> {
    entry: EntryConfig,
    source: S,
    cache: Cache,
    retry_interval: Duration,
    state: RwLock<State>,
    refresh_lock: Mutex<()>,
    retrying: AtomicBool,
    tomorrow: watch::Sender<String>,
}

/// Clears the retry flag, also when the retry is cancelled.
struct RetryGuard<'a>(&'a AtomicBool);

impl Drop for RetryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl<S: ScheduleSource> Coordinator<S> {
    pub fn new(entry: EntryConfig, source: S, cache: Cache, retry_interval: Duration) -> Self {
        tracing::debug!(
            "coordinator for {}: type={}, region={}, location={}, json={}, etag={}",
            entry.entry_id,
            entry.customer_type,
            entry.region,
            entry.location,
            cache.json_path().display(),
            cache.etag_path().display(),
        );
        let (tomorrow, _) = watch::channel(STATE_NO_DATA.to_string());
        Self {
            entry,
            source,
            cache,
            retry_interval,
            state: RwLock::new(State::default()),
            refresh_lock: Mutex::new(()),
            retrying: AtomicBool::new(false),
            tomorrow,
        }
    }

    pub fn entry(&self) -> &EntryConfig {
        &self.entry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Whether data has been loaded at least once.
    pub async fn is_ready(&self) -> bool {
        self.state.read().await.data.is_some()
    }

    pub async fn data(&self) -> Option<ScheduleData> {
        self.state.read().await.data.clone()
    }

    /// The sensor states as of the last recomputation.
    pub async fn sensors(&self) -> Vec<SensorState> {
        self.state.read().await.sensors.clone()
    }

    pub async fn events(&self) -> Vec<CalendarEvent> {
        match &self.state.read().await.data {
            Some(data) => calendar::generate_all_events(&self.entry, data),
            None => vec![],
        }
    }

    pub fn tomorrow_state(&self) -> String {
        self.tomorrow.borrow().clone()
    }

    /// Watch the state of the sensor listing tomorrow's pickups.
    pub fn subscribe_tomorrow(&self) -> watch::Receiver<String> {
        self.tomorrow.subscribe()
    }

    /// Fetch the schedule, falling back to the local cache.
    ///
    /// A fresh download is saved to the cache together with its ETag. When the server
    /// says nothing has changed, or cannot be reached, the cached copy is used instead.
    pub async fn refresh(&self, now: NaiveDateTime) -> Result<ScheduleData> {
        let _guard = self.refresh_lock.lock().await;
        let local_raw = self.cache.load_raw_json().await;
        let etag = match local_raw {
            Some(_) => self.cache.load_etag().await,
            None => None,
        };
        let raw = match self.fetch(etag.as_deref()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("{}: schedule not modified", self.entry.entry_id);
                local_raw.ok_or_else(|| {
                    Error::UpdateFailed("not modified, but there is no cached copy".to_string())
                })?
            }
            Err(err) => {
                tracing::error!(
                    "{}: could not fetch or parse the schedule: {err}",
                    self.entry.entry_id
                );
                match local_raw {
                    Some(local_raw) => {
                        tracing::warn!(
                            "using local file {} because of the API error",
                            self.cache.json_path().display()
                        );
                        local_raw
                    }
                    None => return Err(Error::UpdateFailed(err.to_string())),
                }
            }
        };
        let processed = schedule::process_raw_data(&raw, now);
        tracing::debug!("{}: processed {processed:?}", self.entry.entry_id);
        self.state.write().await.data = Some(processed.clone());
        self.recompute_states(now).await;
        Ok(processed)
    }

    /// Fetch new rows and save them, `None` meaning the cached copy is still current.
    async fn fetch(&self, etag: Option<&str>) -> Result<Option<Value>> {
        match self.source.fetch(etag).await? {
            Fetched::NotModified => Ok(None),
            Fetched::Modified { rows, etag } => {
                let raw = serde_json::to_value(&rows)?;
                self.cache.save_raw_json(&raw).await;
                self.cache.save_etag(etag.as_deref()).await;
                tracing::info!(
                    "{}: schedule refreshed, region='{}' location='{}' entries={}",
                    self.entry.entry_id,
                    self.entry.region,
                    self.entry.location,
                    schedule::row_count(&raw).unwrap_or_default(),
                );
                Ok(Some(raw))
            }
        }
    }

    /// Whether [`Coordinator::retry_update_data`] is running.
    pub fn is_retrying(&self) -> bool {
        self.retrying.load(Ordering::SeqCst)
    }

    /// Refresh until it succeeds, waiting the retry interval after each failure.
    ///
    /// Returns at once when another retry loop is already running.
    pub async fn retry_update_data(&self) {
        if self.retrying.swap(true, Ordering::SeqCst) {
            tracing::debug!("{}: a retry is already running", self.entry.entry_id);
            return;
        }
        let _guard = RetryGuard(&self.retrying);
        loop {
            match self.refresh(local_now()).await {
                Ok(_) => {
                    tracing::info!("{}: data refreshed", self.entry.entry_id);
                    break;
                }
                Err(err) => {
                    tracing::error!(
                        "{}: refresh failed: {err}, retrying in {:?}",
                        self.entry.entry_id,
                        self.retry_interval
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// Recompute all sensor states from the data already loaded, without any request.
    pub async fn recompute_states(&self, now: NaiveDateTime) -> Vec<SensorState> {
        let mut state = self.state.write().await;
        let sensors = sensor::all_sensors(&self.entry, state.data.as_ref(), now);
        tracing::debug!(
            "{}: recomputed {} sensor states",
            self.entry.entry_id,
            sensors.len()
        );
        if let Some(tomorrow) = sensors.last() {
            let value = tomorrow.state.clone();
            self.tomorrow.send_if_modified(|current| {
                if *current == value {
                    return false;
                }
                *current = value;
                true
            });
        }
        state.sensors = sensors.clone();
        sensors
    }

    /// Delete the cached files and fetch everything again.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        self.retry_update_data().await;
    }

    /// Delete the cached files, e.g. when the entry is removed.
    pub async fn remove_cache(&self) {
        self.cache.clear().await;
    }
}
