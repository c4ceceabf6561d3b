use mongodb::Client;
use mongodb::bson::doc;
use tracing::debug;

use super::collection::MongoCollection;
use super::config::{SchemeDetection, build_connection_uri, redact_uri};
use crate::config::MongoConfig;
use crate::error::MongoMiddlewareDbError;
use crate::executor::{self, DeleteSummary, InsertSummary, UpdateSummary};
use crate::query::{FetchOptions, UpdateSpec};
use crate::types::DocMap;

/// A live handle to a MongoDB deployment.
///
/// Created once, cloned freely and shared by every façade call. The driver owns
/// pooling and concurrent access; this wrapper adds no state of its own.
#[derive(Clone, Debug)]
pub struct MongoConnection {
    client: Client,
}

impl MongoConnection {
    /// Connect using a config built at startup.
    ///
    /// # Errors
    /// Returns the driver error if the URI cannot be resolved or the server does
    /// not answer a `ping`. Nothing is retried.
    pub async fn connect(config: &MongoConfig) -> Result<Self, MongoMiddlewareDbError> {
        Self::connect_with(
            &config.host,
            &config.username,
            &config.password,
            config.scheme_detection,
        )
        .await
    }

    /// Connect from raw parts.
    ///
    /// `raw_host` may be a bare host or a full URI; it is normalized to the bare
    /// host and the credentials are embedded into a fresh URI.
    ///
    /// # Errors
    /// Returns the driver error if the URI cannot be resolved or the server does
    /// not answer a `ping`. Nothing is retried.
    pub async fn connect_with(
        raw_host: &str,
        username: &str,
        password: &str,
        detection: SchemeDetection,
    ) -> Result<Self, MongoMiddlewareDbError> {
        let uri = build_connection_uri(raw_host, username, password, detection);
        debug!(uri = %redact_uri(&uri), "connecting to mongo");

        let client = Client::with_uri_str(&uri).await?;
        client.database("admin").run_command(doc! { "ping": 1 }).await?;
        debug!("mongo ping ok");

        Ok(Self { client })
    }

    /// Wrap a client built elsewhere.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn collection(&self, database: &str, collection: &str) -> MongoCollection {
        MongoCollection::new(&self.client, database, collection)
    }

    /// The collection named by `config`.
    #[must_use]
    pub fn configured_collection(&self, config: &MongoConfig) -> MongoCollection {
        self.collection(&config.database, &config.collection)
    }

    /// See [`executor::fetch_documents`].
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub async fn fetch_documents(
        &self,
        database: &str,
        collection: &str,
        options: FetchOptions,
    ) -> Result<Vec<DocMap>, MongoMiddlewareDbError> {
        executor::fetch_documents(&self.collection(database, collection), options).await
    }

    /// See [`executor::insert_documents`].
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub async fn insert_documents(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<DocMap>,
    ) -> Result<InsertSummary, MongoMiddlewareDbError> {
        executor::insert_documents(&self.collection(database, collection), documents).await
    }

    /// See [`executor::update_documents`].
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub async fn update_documents(
        &self,
        database: &str,
        collection: &str,
        updates: Vec<UpdateSpec>,
        upsert: bool,
    ) -> Result<UpdateSummary, MongoMiddlewareDbError> {
        executor::update_documents(&self.collection(database, collection), updates, upsert).await
    }

    /// See [`executor::delete_documents`].
    ///
    /// # Errors
    /// Driver errors propagate unchanged.
    pub async fn delete_documents(
        &self,
        database: &str,
        collection: &str,
        filter: DocMap,
    ) -> Result<DeleteSummary, MongoMiddlewareDbError> {
        executor::delete_documents(&self.collection(database, collection), filter).await
    }

    /// Close the driver's connections and wait for background tasks to stop.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
    }
}
