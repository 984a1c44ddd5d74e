pub mod cli;
pub mod core;
pub mod providers;

use crate::core::{AppConfig, RateCache, TracingErrorLog};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    Rates { json: bool },
    Watch { every: Duration, json: bool },
}

/// Loads the config at `config_path`, or the default location. A missing
/// default config file means the built-in sources are used.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => {
            let default_path = AppConfig::default_config_path()?;
            if default_path.exists() {
                AppConfig::load()
            } else {
                debug!(
                    "No config at {}, using built-in sources",
                    default_path.display()
                );
                Ok(AppConfig::default())
            }
        }
    }
}

pub fn build_cache(config: &AppConfig) -> Result<RateCache> {
    let fetcher = providers::HttpFetcher::new(config.request_timeout())?;
    Ok(RateCache::new(
        config.sources.clone(),
        Arc::new(fetcher),
        Arc::new(TracingErrorLog),
        Some(config.refresh_minutes()),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Rate cache starting...");

    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");
    let cache = build_cache(&config)?;

    match command {
        AppCommand::Rates { json } => cli::rates::run(&cache, json).await,
        AppCommand::Watch { every, json } => cli::rates::watch(&cache, every, json).await,
    }
}
