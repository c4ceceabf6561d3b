use async_trait::async_trait;

use crate::error::MongoMiddlewareDbError;
use crate::types::{DocMap, SortDirection};

/// A normalized find request as handed to a [`DocumentStore`].
///
/// The façade has already resolved defaults: the filter is always present,
/// `sort` is `None` rather than empty and `limit` is `None` rather than zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRequest {
    pub filter: DocMap,
    pub projection: Option<DocMap>,
    pub sort: Option<Vec<(String, SortDirection)>>,
    pub limit: Option<i64>,
}

impl FindRequest {
    /// The sort spec as a single ordered mapping, `{field: 1 | -1, ...}`.
    #[must_use]
    pub fn sort_map(&self) -> Option<DocMap> {
        self.sort.as_ref().map(|pairs| {
            pairs
                .iter()
                .map(|(field, direction)| (field.clone(), i64::from(direction.as_i32())))
                .collect()
        })
    }
}

/// One update-one model inside a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOne {
    pub filter: DocMap,
    pub update: DocMap,
    pub upsert: bool,
}

/// Aggregate counts a bulk update reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpdateCounts {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
}

/// The store primitives the façades forward to.
///
/// A MongoDB collection implements this in [`crate::mongo::MongoCollection`]; anything
/// else implementing it (an in-memory double, a recording proxy) gets the same
/// façade behavior for free.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Collection name, used in informational messages.
    fn collection_name(&self) -> &str;

    /// Run a find and drain every result into memory.
    async fn find(&self, request: FindRequest) -> Result<Vec<DocMap>, MongoMiddlewareDbError>;

    /// Insert exactly one document.
    async fn insert_one(&self, document: DocMap) -> Result<(), MongoMiddlewareDbError>;

    /// Insert a batch using the store's default ordering. Returns the number inserted.
    async fn insert_many(&self, documents: Vec<DocMap>) -> Result<u64, MongoMiddlewareDbError>;

    /// Submit every operation as one bulk-write request.
    async fn bulk_update(
        &self,
        operations: Vec<UpdateOne>,
    ) -> Result<BulkUpdateCounts, MongoMiddlewareDbError>;

    /// Delete every document matching `filter`. Returns the number deleted.
    async fn delete_many(&self, filter: DocMap) -> Result<u64, MongoMiddlewareDbError>;
}
