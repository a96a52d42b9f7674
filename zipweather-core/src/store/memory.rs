use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{StoreError, WatchlistStore};
use crate::{WatchlistEntry, ZipCode};

/// Process-local store. Each operation holds the lock for its whole
/// read-modify-write, matching the per-document atomicity of the Mongo backend.
#[derive(Debug, Default)]
pub struct InMemoryWatchlistStore {
    entries: RwLock<HashMap<String, Vec<ZipCode>>>,
}

impl InMemoryWatchlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = WatchlistEntry>) -> Self {
        let entries = entries.into_iter().map(|e| (e.username, e.zips)).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl WatchlistStore for InMemoryWatchlistStore {
    async fn get_zips(&self, username: &str) -> Result<Option<Vec<ZipCode>>, StoreError> {
        Ok(self.entries.read().await.get(username).cloned())
    }

    async fn add_zip(&self, username: &str, zip: &ZipCode) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let zips = entries.entry(username.to_owned()).or_default();
        if !zips.contains(zip) {
            zips.push(zip.clone());
        }
        Ok(())
    }

    async fn delete_zip(&self, username: &str, zip: &ZipCode) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let Some(zips) = entries.get_mut(username) else {
            return Ok(false);
        };
        let before = zips.len();
        zips.retain(|z| z != zip);
        Ok(zips.len() != before)
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().await.contains_key(username))
    }
}
