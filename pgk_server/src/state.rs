use std::{collections::BTreeMap, sync::Arc};

use axum::http::StatusCode;
use pgk_core::{
    automation::Notifier,
    coordinator::Coordinator,
    garbage_client::{GarbageClient, ScheduleSource},
};

pub type EntryCoordinator<S = GarbageClient> = Coordinator<S>;

/// Everything the handlers share.
pub struct AppState<S = GarbageClient> {
    coordinators: Arc<BTreeMap<String, Arc<EntryCoordinator<S>>>>,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinators: self.coordinators.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S: ScheduleSource> AppState<S> {
    pub fn new(
        coordinators: BTreeMap<String, Arc<EntryCoordinator<S>>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            coordinators: Arc::new(coordinators),
            notifier,
        }
    }

    pub fn coordinators(&self) -> impl Iterator<Item = &Arc<EntryCoordinator<S>>> {
        self.coordinators.values()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn coordinator(
        &self,
        entry_id: &str,
    ) -> Result<Arc<EntryCoordinator<S>>, (StatusCode, String)> {
        self.coordinators
            .get(entry_id)
            .cloned()
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no entry {entry_id}")))
    }

    /// The coordinator of an entry which has loaded data at least once.
    pub async fn ready_coordinator(
        &self,
        entry_id: &str,
    ) -> Result<Arc<EntryCoordinator<S>>, (StatusCode, String)> {
        let coordinator = self.coordinator(entry_id)?;
        if !coordinator.is_ready().await {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                format!("entry {entry_id} is not ready yet"),
            ));
        }
        Ok(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use pgk_core::{
        automation::LogNotifier,
        cache::Cache,
        config::EntryConfig,
        coordinator::Coordinator,
        garbage_client::{Fetched, ScheduleSource},
        schedule::ScheduleRow,
        Error, Result,
    };
    use tempfile::{tempdir, TempDir};

    use crate::state::AppState;

    /// Fails until rows are set.
    #[derive(Default)]
    struct FixedSource(std::sync::Mutex<Option<Vec<ScheduleRow>>>);

    #[async_trait]
    impl ScheduleSource for FixedSource {
        async fn fetch(&self, _etag: Option<&str>) -> Result<Fetched> {
            match self.0.lock().unwrap().clone() {
                Some(rows) => Ok(Fetched::Modified { rows, etag: None }),
                None => Err(Error::Status(503)),
            }
        }
    }

    fn state() -> (TempDir, AppState<FixedSource>) {
        let dir = tempdir().unwrap();
        let entry = EntryConfig {
            entry_id: "home".to_string(),
            region: "Słupsk".to_string(),
            location: "Długa".to_string(),
            ..EntryConfig::default()
        };
        let coordinator = Coordinator::new(
            entry.clone(),
            FixedSource::default(),
            Cache::new(dir.path(), &entry.entry_id),
            Duration::from_millis(1),
        );
        let coordinators = BTreeMap::from([(entry.entry_id, Arc::new(coordinator))]);
        (dir, AppState::new(coordinators, Arc::new(LogNotifier)))
    }

    #[tokio::test]
    async fn test_unknown_entry_is_not_found() {
        let (_dir, state) = state();
        let (status, _) = state.coordinator("nope").err().unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = state.ready_coordinator("nope").await.err().unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_entry_is_unavailable_until_first_refresh() {
        let (_dir, state) = state();
        let coordinator = state.coordinator("home").unwrap();
        let now = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert!(coordinator.refresh(now).await.is_err());
        let (status, message) = state.ready_coordinator("home").await.err().unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(message, "entry home is not ready yet");

        *coordinator.source().0.lock().unwrap() = Some(vec![ScheduleRow {
            schedule_id: 1,
            action_id: 1,
            action: "HARMONOGRAM".to_string(),
            waste_type_id: "SZ".to_string(),
            waste_type: "SZKŁO".to_string(),
            color: String::new(),
            date: "2025-01-16".to_string(),
        }]);
        coordinator.retry_update_data().await;
        let ready = state.ready_coordinator("home").await.unwrap();
        assert_eq!(ready.entry().entry_id, "home");
        assert_eq!(state.coordinators().count(), 1);
    }
}
