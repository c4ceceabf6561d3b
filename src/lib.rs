//! Lightweight async convenience wrappers around the `MongoDB` driver.
//!
//! Four pass-through operations (fetch, insert, bulk update, delete) plus a
//! connection builder that turns a loose host string and credentials into a
//! live client. There is no retry logic, caching or query planning here;
//! everything beyond argument shaping is the driver's job.
//!
//! ```rust,no_run
//! use mongo_middleware::prelude::*;
//!
//! # async fn run() -> Result<(), MongoMiddlewareDbError> {
//! let cfg = MongoConfig::from_env()?;
//! let conn = MongoConnection::connect(&cfg).await?;
//! let store = conn.configured_collection(&cfg);
//!
//! insert_documents(&store, vec![DocMap::new().with("name", "Test User")]).await?;
//! let docs = fetch_documents(
//!     &store,
//!     FetchOptions::new().filter(DocMap::new().with("name", "Test User")),
//! )
//! .await?;
//! # let _ = docs;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod mongo;
pub mod prelude;
pub mod query;
pub mod store;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::MongoConfig;
pub use error::{FailureKind, MongoMiddlewareDbError};
pub use executor::{
    DeleteSummary, InsertSummary, UpdateSummary, delete_documents, fetch_documents,
    insert_documents, update_documents,
};
pub use mongo::{MongoCollection, MongoConnection, SchemeDetection};
pub use query::{FetchOptions, UpdateSpec};
pub use store::DocumentStore;
pub use types::{DocMap, DocValues, SortDirection};
