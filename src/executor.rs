//! The four façade operations.
//!
//! Each function takes any [`DocumentStore`], resolves the few defaults the
//! layer owns (match-all filter, zero limit, empty batches) and forwards the
//! rest unchanged. Errors from the store propagate as-is.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::MongoMiddlewareDbError;
use crate::query::{FetchOptions, UpdateSpec};
use crate::store::{DocumentStore, FindRequest, UpdateOne};
use crate::types::DocMap;

/// What an insert call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertSummary {
    pub inserted: u64,
}

/// Aggregate counts from a bulk update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
}

/// What a delete call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub deleted: u64,
}

/// Resolve caller options into the request the store sees.
///
/// A limit of `0` is treated as "no limit", the same as leaving it unset. An
/// empty sort list is treated as "no sort".
#[must_use]
pub fn resolve_fetch_options(options: FetchOptions) -> FindRequest {
    FindRequest {
        filter: options.filter.unwrap_or_default(),
        projection: options.projection,
        sort: options.sort.filter(|pairs| !pairs.is_empty()),
        limit: options.limit.filter(|limit| *limit != 0),
    }
}

/// Fetch every matching document into memory.
///
/// # Errors
/// Returns whatever the store returns; nothing is caught or translated.
pub async fn fetch_documents<S>(
    store: &S,
    options: FetchOptions,
) -> Result<Vec<DocMap>, MongoMiddlewareDbError>
where
    S: DocumentStore + ?Sized,
{
    let request = resolve_fetch_options(options);
    debug!(
        collection = store.collection_name(),
        sorted = request.sort.is_some(),
        limit = ?request.limit,
        "fetching documents"
    );
    store.find(request).await
}

/// Insert zero, one or many documents.
///
/// An empty batch is a no-op. A single document goes through the single-insert
/// path; anything larger goes through the batch path with the store's default
/// ordering.
///
/// # Errors
/// Returns whatever the store returns; a failing batch may leave earlier
/// documents inserted.
pub async fn insert_documents<S>(
    store: &S,
    documents: Vec<DocMap>,
) -> Result<InsertSummary, MongoMiddlewareDbError>
where
    S: DocumentStore + ?Sized,
{
    let collection = store.collection_name();
    match documents.len() {
        0 => {
            info!("No documents to insert.");
            Ok(InsertSummary::default())
        }
        1 => {
            if let Some(document) = documents.into_iter().next() {
                store.insert_one(document).await?;
            }
            info!("Inserted 1 document into {collection}");
            Ok(InsertSummary { inserted: 1 })
        }
        _ => {
            let inserted = store.insert_many(documents).await?;
            info!("Inserted {inserted} documents into {collection}");
            Ok(InsertSummary { inserted })
        }
    }
}

/// Apply a batch of conditional updates as one bulk write.
///
/// `upsert` applies to every entry. An empty batch is a no-op.
///
/// # Errors
/// Returns whatever the store returns; the batch fails as a unit.
pub async fn update_documents<S>(
    store: &S,
    updates: Vec<UpdateSpec>,
    upsert: bool,
) -> Result<UpdateSummary, MongoMiddlewareDbError>
where
    S: DocumentStore + ?Sized,
{
    if updates.is_empty() {
        info!("No updates to perform.");
        return Ok(UpdateSummary::default());
    }

    let operations = updates
        .into_iter()
        .map(|spec| UpdateOne {
            filter: spec.filter,
            update: spec.update,
            upsert,
        })
        .collect::<Vec<_>>();
    debug!(
        collection = store.collection_name(),
        operations = operations.len(),
        upsert,
        "submitting bulk update"
    );

    let counts = store.bulk_update(operations).await?;
    info!(
        "Matched {}, Modified {}, Upserted {}",
        counts.matched, counts.modified, counts.upserted
    );
    Ok(UpdateSummary {
        matched: counts.matched,
        modified: counts.modified,
        upserted: counts.upserted,
    })
}

/// Delete every document matching `filter`.
///
/// # Errors
/// Returns whatever the store returns.
pub async fn delete_documents<S>(
    store: &S,
    filter: DocMap,
) -> Result<DeleteSummary, MongoMiddlewareDbError>
where
    S: DocumentStore + ?Sized,
{
    let deleted = store.delete_many(filter).await?;
    info!(
        "Deleted {deleted} documents from {}",
        store.collection_name()
    );
    Ok(DeleteSummary { deleted })
}
