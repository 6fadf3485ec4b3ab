use std::{collections::BTreeMap, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use pgk_core::{
    automation::{self, HomeAssistantNotifier, LogNotifier, Notifier},
    cache::Cache,
    config::{Config, EntryConfig},
    coordinator::Coordinator,
    garbage_client::GarbageClient,
    scheduler,
};
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, EntryCoordinator};

mod route;
mod state;

#[derive(Debug, Parser)]
#[command(about = "Serves the waste collection schedule of PGK Słupsk")]
struct Arguments {
    /// the config file, `~/.config/pgk_slupsk/config.toml` by default
    #[arg(long)]
    config: Option<PathBuf>,
    /// the address to listen on, overrides the config
    #[arg(long)]
    listen: Option<SocketAddr>,
}

/// Start everything an entry needs: the first refresh, the daily jobs and the trigger.
///
/// When the first refresh fails the entry is not ready and keeps retrying in the
/// background.
async fn setup_entry(
    config: &Config,
    entry: &EntryConfig,
    notifier: &Arc<dyn Notifier>,
) -> Arc<EntryCoordinator> {
    let coordinator = Arc::new(Coordinator::new(
        entry.clone(),
        GarbageClient::new(entry, config.request_timeout()),
        Cache::new(&config.cache_dir, &entry.entry_id),
        config.retry_interval(),
    ));
    if let Some(notify_service) = &entry.notify_service {
        automation::spawn_trigger(
            entry.entry_id.clone(),
            notify_service.clone(),
            coordinator.subscribe_tomorrow(),
            notifier.clone(),
        );
    }
    if let Err(err) = coordinator
        .refresh(chrono::Local::now().naive_local())
        .await
    {
        tracing::warn!("{} is not ready: {err}", entry.entry_id);
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.retry_update_data().await });
    }
    scheduler::spawn(coordinator.clone());
    coordinator
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();
    let config = Config::load(args.config.as_deref())?;
    let notifier: Arc<dyn Notifier> = match &config.home_assistant {
        Some(home_assistant) => Arc::new(HomeAssistantNotifier::new(home_assistant)),
        None => Arc::new(LogNotifier),
    };

    let mut coordinators = BTreeMap::new();
    for entry in &config.entries {
        if let Err(err) = entry.validate() {
            tracing::warn!("skipping entry: {err}");
            continue;
        }
        let coordinator = setup_entry(&config, entry, &notifier).await;
        coordinators.insert(entry.entry_id.clone(), coordinator);
    }

    let app = route::router(AppState::new(coordinators, notifier));
    let addr = args.listen.unwrap_or(config.listen);
    tracing::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
