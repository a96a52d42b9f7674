use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::{Config, WeatherRecord, ZipCode, provider::weatherstack::WeatherstackProvider};

pub mod weatherstack;

/// Why a weather lookup failed.
///
/// Variants are listed in classification priority: a transport failure wins
/// over a bad status, which wins over an error reported inside the payload.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather provider is unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("weather provider rejected the request with status {status}")]
    InvalidZip { status: reqwest::StatusCode },

    #[error("weather provider quota exhausted: {info}")]
    RateLimited { info: String },

    #[error("weather provider reported {kind}: {info}")]
    Provider {
        code: Option<u16>,
        kind: String,
        info: String,
    },

    #[error("weather provider returned an unusable payload: {0}")]
    MalformedPayload(String),
}

impl WeatherError {
    /// True for errors the provider reported inside a 200 payload.
    pub fn is_provider_reported(&self) -> bool {
        matches!(self, WeatherError::RateLimited { .. } | WeatherError::Provider { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, WeatherError::RateLimited { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Single attempt, no retries.
    async fn fetch_weather(&self, zip: &ZipCode) -> Result<WeatherRecord, WeatherError>;
}

/// Construct the weather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<WeatherstackProvider> {
    let api_key = config.provider_api_key()?;
    WeatherstackProvider::from_config(api_key.to_owned(), &config.provider)
}
