use std::{env::current_dir, fs::write, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use pgk_core::{
    automation::{self, HomeAssistantNotifier, LogNotifier, Notifier},
    cache::Cache,
    calendar,
    config::{Config, EntryConfig},
    coordinator::Coordinator,
    garbage_client::{self, GarbageClient},
    ical::generator::Emitter,
    sensor::STATE_NO_DATA,
    waste_type::{self, WasteTypeBitmask},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Waste collection schedule of PGK Słupsk")]
pub struct Arguments {
    /// the config file, `~/.config/pgk_slupsk/config.toml` by default
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// the entry to use, the first configured one by default
    #[arg(long, global = true)]
    pub entry: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the schedule and update the cache
    Fetch,
    /// Print the sensor states as JSON
    Sensors,
    /// Write calendar.ics to the current directory
    Calendar {
        #[command(flatten)]
        exclude: ExcludeArgs,
    },
    /// List the cities of the street directory
    Cities,
    /// List the streets of a city
    Streets {
        /// the city id, as listed by `cities`
        city_id: String,
    },
    /// Remove the cached files
    ClearCache {
        /// only remove, do not fetch again
        #[arg(long)]
        no_refresh: bool,
    },
    /// Send the notification about tomorrow's pickup
    Notify,
}

#[derive(Debug, Args)]
pub struct ExcludeArgs {
    /// exclude bio waste collection dates
    #[arg(long)]
    pub exclude_bio: bool,
    /// exclude christmas tree collection dates
    #[arg(long)]
    pub exclude_christmas: bool,
    /// exclude plastic and metal collection dates
    #[arg(long)]
    pub exclude_plastic: bool,
    /// exclude paper collection dates
    #[arg(long)]
    pub exclude_paper: bool,
    /// exclude glass collection dates
    #[arg(long)]
    pub exclude_glass: bool,
    /// exclude mixed waste collection dates
    #[arg(long)]
    pub exclude_mixed: bool,
    /// exclude bulky waste collection dates
    #[arg(long)]
    pub exclude_bulky: bool,
    /// exclude textile collection dates
    #[arg(long)]
    pub exclude_textile: bool,
}

impl From<&ExcludeArgs> for WasteTypeBitmask {
    fn from(value: &ExcludeArgs) -> Self {
        let mut waste_type_bitmask = WasteTypeBitmask::none();
        if value.exclude_bio {
            waste_type_bitmask |= WasteTypeBitmask::Bio;
        }
        if value.exclude_christmas {
            waste_type_bitmask |= WasteTypeBitmask::Christmas;
        }
        if value.exclude_plastic {
            waste_type_bitmask |= WasteTypeBitmask::Plastic;
        }
        if value.exclude_paper {
            waste_type_bitmask |= WasteTypeBitmask::Paper;
        }
        if value.exclude_glass {
            waste_type_bitmask |= WasteTypeBitmask::Glass;
        }
        if value.exclude_mixed {
            waste_type_bitmask |= WasteTypeBitmask::Mixed;
        }
        if value.exclude_bulky {
            waste_type_bitmask |= WasteTypeBitmask::Bulky;
        }
        if value.exclude_textile {
            waste_type_bitmask |= WasteTypeBitmask::Textile;
        }
        waste_type_bitmask
    }
}

fn select_entry<'a>(config: &'a Config, entry_id: Option<&str>) -> Result<&'a EntryConfig> {
    let entry = match entry_id {
        Some(entry_id) => config.entry(entry_id)?,
        None => config
            .entries
            .first()
            .ok_or_else(|| anyhow!("no entries configured"))?,
    };
    entry.validate()?;
    Ok(entry)
}

fn coordinator(config: &Config, entry: &EntryConfig) -> Coordinator<GarbageClient> {
    Coordinator::new(
        entry.clone(),
        GarbageClient::new(entry, config.request_timeout()),
        Cache::new(&config.cache_dir, &entry.entry_id),
        config.retry_interval(),
    )
}

fn local_now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();
    match &args.command {
        Command::Cities => {
            for city in garbage_client::get_cities().await? {
                println!("{}\t{}", city.id_string(), city.name);
            }
            return Ok(());
        }
        Command::Streets { city_id } => {
            for street in garbage_client::get_streets(city_id).await? {
                println!("{}\t{}", street.id_string(), street.name);
            }
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(args.config.as_deref())?;
    let entry = select_entry(&config, args.entry.as_deref())?;
    let coordinator = coordinator(&config, entry);
    match &args.command {
        Command::Fetch => {
            let data = coordinator.refresh(local_now()).await?;
            for (id, waste_data) in &data {
                println!(
                    "{id}\t{}\t{} dates",
                    waste_type::display_name(id, waste_data.name.as_deref()),
                    waste_data.dates.len()
                );
            }
        }
        Command::Sensors => {
            coordinator.refresh(local_now()).await?;
            let sensors = coordinator.sensors().await;
            println!("{}", serde_json::to_string_pretty(&sensors)?);
        }
        Command::Calendar { exclude } => {
            coordinator.refresh(local_now()).await?;
            let events = coordinator.events().await;
            let calendar = calendar::to_ical(entry, &events, WasteTypeBitmask::from(exclude));
            let mut path = current_dir()?;
            path.push("calendar.ics");
            write(path, calendar.generate())?;
        }
        Command::ClearCache { no_refresh } => {
            coordinator.remove_cache().await;
            if !no_refresh {
                coordinator.refresh(local_now()).await?;
            }
        }
        Command::Notify => {
            let notify_service = entry
                .notify_service
                .as_deref()
                .ok_or_else(|| anyhow!("entry {} has no notify_service", entry.entry_id))?;
            coordinator.refresh(local_now()).await?;
            let state = coordinator.tomorrow_state();
            let notifier: Box<dyn Notifier> = match &config.home_assistant {
                Some(home_assistant) => Box::new(HomeAssistantNotifier::new(home_assistant)),
                None => Box::new(LogNotifier),
            };
            if state == STATE_NO_DATA {
                tracing::warn!("no schedule data for tomorrow");
            }
            automation::send_notification(notifier.as_ref(), &state, notify_service).await?;
        }
        Command::Cities | Command::Streets { .. } => {}
    }
    Ok(())
}
