//! The "waste pickup tomorrow" trigger and the notification action.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    config::HomeAssistantConfig,
    error::{Error, Result},
    sensor::{STATE_NOTHING_TOMORROW, STATE_NO_DATA, STATE_UNKNOWN},
};

pub static TRIGGER_TYPE: &str = "waste_pickup_tomorrow";
pub static ACTION_TYPE: &str = "send_waste_pickup_notification";
static DEFAULT_DOMAIN: &str = "notify";
static MESSAGE_PREFIX: &str = "Wystaw odpady. Jutro odbiór: ";

/// Whether a state of the day-before sensor lists waste to put out.
pub fn is_pickup_state(state: &str) -> bool {
    let state = state.trim();
    !state.is_empty()
        && ![STATE_NOTHING_TOMORROW, STATE_NO_DATA, STATE_UNKNOWN]
            .iter()
            .any(|other| state.eq_ignore_ascii_case(other))
}

/// Whether the trigger fires when the day-before sensor goes from `previous` to `current`.
pub fn trigger_fires(previous: &str, current: &str) -> bool {
    previous != current && is_pickup_state(current)
}

/// A service call sending a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(skip)]
    pub domain: String,
    #[serde(skip)]
    pub service: String,
    pub message: String,
}

/// Build the notification for a state, or nothing when no pickup is due.
///
/// `notify_service` is either `domain.service` or just a service of the `notify` domain.
pub fn notification(state: &str, notify_service: &str) -> Option<Notification> {
    let value = state.trim().to_lowercase();
    if value == STATE_NOTHING_TOMORROW {
        return None;
    }
    let (domain, service) = notify_service
        .split_once('.')
        .unwrap_or((DEFAULT_DOMAIN, notify_service));
    Some(Notification {
        domain: domain.to_string(),
        service: service.to_string(),
        message: format!("{MESSAGE_PREFIX}{value}"),
    })
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Calls services through the Home Assistant REST API.
#[derive(Debug, Clone)]
pub struct HomeAssistantNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HomeAssistantNotifier {
    pub fn new(config: &HomeAssistantConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    pub fn service_url(&self, notification: &Notification) -> String {
        format!(
            "{}/services/{}/{}",
            self.base_url, notification.domain, notification.service
        )
    }
}

#[async_trait]
impl Notifier for HomeAssistantNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(self.service_url(notification))
            .bearer_auth(&self.token)
            .json(notification)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Status(response.status().as_u16()));
        }
        tracing::info!(
            "sent notification via {}.{}",
            notification.domain,
            notification.service
        );
        Ok(())
    }
}

/// Only logs, used when no Home Assistant is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            "{}.{}: {}",
            notification.domain,
            notification.service,
            notification.message
        );
        Ok(())
    }
}

/// Run the notification action for the current state.
///
/// Returns whether a notification was sent.
pub async fn send_notification(
    notifier: &dyn Notifier,
    state: &str,
    notify_service: &str,
) -> Result<bool> {
    match notification(state, notify_service) {
        Some(notification) => {
            notifier.notify(&notification).await?;
            Ok(true)
        }
        None => {
            tracing::debug!("nothing to put out tomorrow, no notification");
            Ok(false)
        }
    }
}

/// Send a notification every time the trigger fires, until the sender is dropped.
pub fn spawn_trigger(
    entry_id: String,
    notify_service: String,
    mut tomorrow: watch::Receiver<String>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut previous = tomorrow.borrow_and_update().clone();
        while tomorrow.changed().await.is_ok() {
            let current = tomorrow.borrow_and_update().clone();
            if trigger_fires(&previous, &current) {
                tracing::info!("{entry_id}: {TRIGGER_TYPE} fired with '{current}'");
                if let Err(err) =
                    send_notification(notifier.as_ref(), &current, &notify_service).await
                {
                    tracing::error!("{entry_id}: {ACTION_TYPE} failed: {err}");
                }
            }
            previous = current;
        }
    })
}
