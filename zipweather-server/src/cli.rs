use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use std::{path::PathBuf, sync::Arc};
use zipweather_core::{
    Config, StoreBackend, WatchlistService, WeatherProvider, ZipCode, provider_from_config,
    store_from_config,
};

use crate::server::run_http_server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "zipweather",
    version,
    about = "Weather by ZIP code, with per-user watchlists"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server.
    Serve {
        /// Port to listen on; overrides config and PORT.
        #[arg(long)]
        port: Option<u16>,

        /// Keep watchlists in memory instead of MongoDB.
        #[arg(long)]
        memory_store: bool,
    },

    /// Interactively configure the weather API key and watchlist store.
    Configure,

    /// Print current weather for a ZIP code.
    Lookup {
        /// Five-character ZIP code.
        zip: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { port, memory_store } => {
                let mut config = Config::resolve(self.config.as_deref())?;
                if let Some(port) = port {
                    config.server.port = port;
                }
                if memory_store {
                    config.store.backend = StoreBackend::Memory;
                }
                serve(config).await
            }
            Command::Configure => configure(self.config),
            Command::Lookup { zip } => {
                let config = Config::resolve(self.config.as_deref())?;
                lookup(&config, &zip).await
            }
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let provider = provider_from_config(&config)?;
    let store = store_from_config(&config.store).await?;
    tracing::info!(store = ?store, units = %config.provider.units, "starting zipweather");

    let service = WatchlistService::new(Arc::new(provider), store);
    run_http_server(service, &config.listen_addr()).await
}

async fn lookup(config: &Config, zip: &str) -> anyhow::Result<()> {
    let zip = ZipCode::parse(zip)?;
    let provider = provider_from_config(config)?;
    let record = provider
        .fetch_weather(&zip)
        .await
        .with_context(|| format!("Weather lookup for {zip} failed"))?;

    let temp = record.units.temperature_symbol();
    println!("Weather in {}: {}{temp}", record.zip, record.temperature);
    println!("City: {}", record.city);
    println!("State: {}", record.state);
    println!("Wind speed: {} {}", record.wind_speed, record.units.speed_symbol());
    println!("Description: {}", record.description);
    println!("Feels like: {}{temp}", record.feels_like);
    if let Some(local) = record.local_time {
        println!("Local time: {local}");
    }
    Ok(())
}

fn configure(path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = match &path {
        Some(path) if path.exists() => Config::load_from(path)?,
        Some(_) => Config::default(),
        None => Config::load()?,
    };

    let api_key = Password::new("Weatherstack API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.provider.api_key = Some(api_key.trim().to_string());

    let backend = Select::new("Watchlist store:", vec!["mongo", "memory"])
        .prompt()
        .context("Failed to read store backend")?;

    if backend == "mongo" {
        config.store.backend = StoreBackend::Mongo;
        let uri = Text::new("MongoDB connection string (without credentials):")
            .with_default(&config.store.uri)
            .prompt()
            .context("Failed to read connection string")?;
        config.store.uri = uri;

        let username = Text::new("MongoDB username (leave empty for none):")
            .with_default(config.store.username.as_deref().unwrap_or_default())
            .prompt()
            .context("Failed to read username")?;
        let username = username.trim();

        if username.is_empty() {
            config.store.username = None;
            config.store.password = None;
        } else {
            config.store.username = Some(username.to_string());
            let password = Password::new("MongoDB password:")
                .without_confirmation()
                .prompt()
                .context("Failed to read password")?;
            config.store.password = Some(password);
        }

        let database = Text::new("Database name:")
            .with_default(&config.store.database)
            .prompt()
            .context("Failed to read database name")?;
        let collection = Text::new("Collection name:")
            .with_default(&config.store.collection)
            .prompt()
            .context("Failed to read collection name")?;
        config.store.database = database;
        config.store.collection = collection;
    } else {
        config.store.backend = StoreBackend::Memory;
    }

    let saved_to = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };
    println!("Configuration saved to {}", saved_to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_parse() {
        let cli = Cli::try_parse_from([
            "zipweather",
            "--config",
            "/tmp/z.toml",
            "serve",
            "--port",
            "8080",
            "--memory-store",
        ])
        .expect("parses");
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/z.toml")));
        match cli.command {
            Command::Serve { port, memory_store } => {
                assert_eq!(port, Some(8080));
                assert!(memory_store);
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn lookup_takes_a_zip() {
        let cli = Cli::try_parse_from(["zipweather", "lookup", "20742"]).expect("parses");
        assert!(matches!(cli.command, Command::Lookup { ref zip } if zip == "20742"));
    }
}
