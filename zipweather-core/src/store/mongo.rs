use anyhow::Context;
use async_trait::async_trait;
use mongodb::{
    Client, Collection,
    bson::{Document, doc},
    error::ErrorKind,
    options::{ClientOptions, Credential, ServerApi, ServerApiVersion},
};
use std::{fmt, future::Future};

use super::{StoreError, WatchlistStore};
use crate::{WatchlistEntry, ZipCode, config::StoreConfig};

/// MongoDB backend. Every operation opens its own client and shuts it down
/// before returning, whether the operation succeeded or not.
#[derive(Clone)]
pub struct MongoWatchlistStore {
    options: ClientOptions,
    database: String,
    collection: String,
}

impl fmt::Debug for MongoWatchlistStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoWatchlistStore")
            .field("hosts", &self.options.hosts)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl MongoWatchlistStore {
    /// Parse the connection string and attach credentials. No connection is
    /// opened until the first operation.
    pub async fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(&config.uri).await.with_context(|| {
            format!("Failed to parse MongoDB connection string '{}'", config.uri)
        })?;

        if let Some(username) = &config.username {
            let mut credential = Credential::default();
            credential.username = Some(username.clone());
            credential.password = config.password.clone();
            options.credential = Some(credential);
        }
        options.server_api = Some(ServerApi::builder().version(ServerApiVersion::V1).build());
        options.app_name = Some("zipweather".to_string());

        Ok(Self::with_options(options, &config.database, &config.collection))
    }

    pub fn with_options(options: ClientOptions, database: &str, collection: &str) -> Self {
        Self {
            options,
            database: database.to_owned(),
            collection: collection.to_owned(),
        }
    }

    /// Run `op` against the watchlist collection on a fresh client.
    async fn scoped<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Collection<WatchlistEntry>) -> Fut,
        Fut: Future<Output = mongodb::error::Result<T>>,
    {
        let client = Client::with_options(self.options.clone()).map_err(StoreError::Connection)?;
        let collection = client.database(&self.database).collection(&self.collection);

        let result = op(collection).await;
        client.shutdown().await;

        result.map_err(|err| {
            let err = classify(err);
            tracing::error!(error = %err, "watchlist store operation failed");
            err
        })
    }
}

fn classify(err: mongodb::error::Error) -> StoreError {
    let connection = matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Authentication { .. }
            | ErrorKind::Io(_)
    );
    if connection {
        StoreError::Connection(err)
    } else {
        StoreError::Query(err)
    }
}

fn by_username(username: &str) -> Document {
    doc! { "username": username }
}

fn add_zip_update(zip: &ZipCode) -> Document {
    doc! { "$addToSet": { "zips": zip.as_str() } }
}

/// Only matches entries that currently hold `zip`, so `modified_count`
/// tells whether a removal happened.
fn delete_zip_filter(username: &str, zip: &ZipCode) -> Document {
    doc! { "username": username, "zips": zip.as_str() }
}

fn delete_zip_update(zip: &ZipCode) -> Document {
    doc! { "$pull": { "zips": zip.as_str() } }
}

#[async_trait]
impl WatchlistStore for MongoWatchlistStore {
    async fn get_zips(&self, username: &str) -> Result<Option<Vec<ZipCode>>, StoreError> {
        let entry = self
            .scoped(|coll| async move { coll.find_one(by_username(username)).await })
            .await?;
        Ok(entry.map(|e| e.zips))
    }

    async fn add_zip(&self, username: &str, zip: &ZipCode) -> Result<(), StoreError> {
        let result = self
            .scoped(|coll| async move {
                coll.update_one(by_username(username), add_zip_update(zip))
                    .upsert(true)
                    .await
            })
            .await?;

        if result.upserted_id.is_some() {
            tracing::info!(%username, %zip, "created watchlist for new user");
        } else if result.modified_count == 0 {
            tracing::info!(%username, %zip, "zip already in watchlist");
        } else {
            tracing::info!(%username, %zip, "added zip to watchlist");
        }
        Ok(())
    }

    async fn delete_zip(&self, username: &str, zip: &ZipCode) -> Result<bool, StoreError> {
        let result = self
            .scoped(|coll| async move {
                coll.update_one(delete_zip_filter(username, zip), delete_zip_update(zip))
                    .await
            })
            .await?;

        let removed = result.modified_count > 0;
        tracing::info!(%username, %zip, removed, "delete zip from watchlist");
        Ok(removed)
    }

    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let count = self
            .scoped(|coll| async move {
                coll.count_documents(by_username(username)).limit(1).await
            })
            .await?;
        Ok(count > 0)
    }
}
