//! Core library for `zipweather`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weatherstack client behind the [`WeatherProvider`] trait
//! - Per-username ZIP watchlists behind the [`WatchlistStore`] trait
//! - Route-level orchestration in [`WatchlistService`]
//!
//! It is used by `zipweather-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod model;
pub mod provider;
pub mod service;
pub mod store;
pub mod zip;

pub use config::{Config, ProviderConfig, ServerConfig, StoreBackend, StoreConfig};
pub use model::{RowConditions, Units, WatchlistEntry, WatchlistRow, WeatherRecord};
pub use provider::{WeatherError, WeatherProvider, provider_from_config};
pub use service::{
    AddConfirmation, DeleteConfirmation, ServiceError, WatchlistService, WatchlistTable,
};
pub use store::{StoreError, WatchlistStore, store_from_config};
pub use zip::{ZipCode, ZipError};
