//! Route-level orchestration: validate input, call the weather provider and
//! the watchlist store, and hand back the data a view needs.
//!
//! Input is always validated before any provider or store call.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    WatchlistRow, WeatherRecord, ZipCode, ZipError,
    provider::{WeatherError, WeatherProvider},
    store::{StoreError, WatchlistStore},
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidZip(#[from] ZipError),

    #[error("a username is required")]
    MissingUsername,

    #[error("{zip} is an invalid zip code")]
    WeatherUnavailable {
        zip: ZipCode,
        #[source]
        source: WeatherError,
    },

    #[error("{username} does not have a watchlist")]
    UserNotFound { username: String },

    #[error("{username}'s watchlist is empty")]
    EmptyWatchlist { username: String },

    #[error("{zip} is not in {username}'s watchlist")]
    ZipNotInWatchlist { username: String, zip: ZipCode },

    #[error("the watchlist service is unavailable, please try again later")]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// True when the request was rejected before any outbound call.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ServiceError::InvalidZip(_) | ServiceError::MissingUsername)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddConfirmation {
    pub username: String,
    pub zip: ZipCode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteConfirmation {
    pub username: String,
    pub zip: ZipCode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistTable {
    pub username: String,
    pub rows: Vec<WatchlistRow>,
}

#[derive(Debug, Clone)]
pub struct WatchlistService {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<dyn WatchlistStore>,
}

fn parse_username(input: &str) -> Result<String, ServiceError> {
    let username = input.trim();
    if username.is_empty() {
        return Err(ServiceError::MissingUsername);
    }
    Ok(username.to_owned())
}

impl WatchlistService {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: Arc<dyn WatchlistStore>) -> Self {
        Self { provider, store }
    }

    async fn fetch(&self, zip: &ZipCode) -> Result<WeatherRecord, ServiceError> {
        self.provider
            .fetch_weather(zip)
            .await
            .map_err(|source| ServiceError::WeatherUnavailable {
                zip: zip.clone(),
                source,
            })
    }

    pub async fn search(&self, zip: &str) -> Result<WeatherRecord, ServiceError> {
        let zip = ZipCode::parse(zip)?;
        let record = self.fetch(&zip).await?;
        tracing::info!(
            %zip,
            city = %record.city,
            temperature = record.temperature,
            "weather search"
        );
        Ok(record)
    }

    /// Adds only ZIP codes the provider recognises.
    pub async fn add(&self, username: &str, zip: &str) -> Result<AddConfirmation, ServiceError> {
        let zip = ZipCode::parse(zip)?;
        let username = parse_username(username)?;

        self.fetch(&zip).await?;
        self.store.add_zip(&username, &zip).await?;

        Ok(AddConfirmation { username, zip })
    }

    /// One row per tracked ZIP, in stored order. A failed lookup marks its
    /// row unavailable rather than failing the table.
    pub async fn watchlist(&self, username: &str) -> Result<WatchlistTable, ServiceError> {
        let username = parse_username(username)?;

        let zips = self
            .store
            .get_zips(&username)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                username: username.clone(),
            })?;

        let results = join_all(zips.iter().map(|zip| self.provider.fetch_weather(zip))).await;
        let rows = results
            .into_iter()
            .zip(zips)
            .map(|(result, zip)| match result {
                Ok(record) => WatchlistRow::from_record(&record),
                Err(err) => {
                    tracing::warn!(%username, %zip, error = %err, "watchlist lookup failed");
                    WatchlistRow::unavailable(zip, "weather currently unavailable")
                }
            })
            .collect();

        Ok(WatchlistTable { username, rows })
    }

    pub async fn delete(
        &self,
        username: &str,
        zip: &str,
    ) -> Result<DeleteConfirmation, ServiceError> {
        let zip = ZipCode::parse(zip)?;
        let username = parse_username(username)?;

        if !self.store.exists(&username).await? {
            return Err(ServiceError::UserNotFound { username });
        }

        let zips = self
            .store
            .get_zips(&username)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound {
                username: username.clone(),
            })?;
        if zips.is_empty() {
            return Err(ServiceError::EmptyWatchlist { username });
        }

        if !self.store.delete_zip(&username, &zip).await? {
            return Err(ServiceError::ZipNotInWatchlist { username, zip });
        }

        tracing::info!(%username, %zip, "removed zip from watchlist");
        Ok(DeleteConfirmation { username, zip })
    }
}
