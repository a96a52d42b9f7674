//! Per-username ZIP watchlists.
//!
//! [`WatchlistStore`] is the persistence seam. [`mongo::MongoWatchlistStore`]
//! is the production backend; [`memory::InMemoryWatchlistStore`] backs
//! development runs and tests.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

use crate::{
    ZipCode,
    config::{StoreBackend, StoreConfig},
};

pub mod memory;
pub mod mongo;

pub use memory::InMemoryWatchlistStore;
pub use mongo::MongoWatchlistStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("watchlist store connection failed: {0}")]
    Connection(#[source] mongodb::error::Error),

    #[error("watchlist store query failed: {0}")]
    Query(#[source] mongodb::error::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchlistStore: Send + Sync + Debug {
    /// ZIP codes tracked by `username`, in stored order. `None` when the
    /// username has no entry.
    async fn get_zips(&self, username: &str) -> Result<Option<Vec<ZipCode>>, StoreError>;

    /// Add `zip` to the username's set, creating the entry if needed. Adding a
    /// ZIP that is already tracked is a no-op.
    async fn add_zip(&self, username: &str, zip: &ZipCode) -> Result<(), StoreError>;

    /// Remove `zip`; returns whether anything was removed.
    async fn delete_zip(&self, username: &str, zip: &ZipCode) -> Result<bool, StoreError>;

    async fn exists(&self, username: &str) -> Result<bool, StoreError>;
}

/// Construct the store selected by `config.backend`.
pub async fn store_from_config(config: &StoreConfig) -> anyhow::Result<Arc<dyn WatchlistStore>> {
    let store: Arc<dyn WatchlistStore> = match config.backend {
        StoreBackend::Mongo => Arc::new(MongoWatchlistStore::from_config(config).await?),
        StoreBackend::Memory => {
            tracing::warn!("using in-memory watchlist store; watchlists are lost on exit");
            Arc::new(InMemoryWatchlistStore::new())
        }
    };
    Ok(store)
}
