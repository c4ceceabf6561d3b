//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::MongoConfig;
pub use crate::error::{FailureKind, MongoMiddlewareDbError};
pub use crate::executor::{
    DeleteSummary, InsertSummary, UpdateSummary, delete_documents, fetch_documents,
    insert_documents, update_documents,
};
pub use crate::mongo::{MongoCollection, MongoConnection, SchemeDetection, normalize_host};
pub use crate::query::{FetchOptions, UpdateSpec, update_specs_from_maps};
pub use crate::store::{BulkUpdateCounts, DocumentStore, FindRequest, UpdateOne};
pub use crate::types::{DocMap, DocValues, SortDirection};
