use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::Document;
use mongodb::error::ErrorKind;
use mongodb::options::{UpdateModifications, UpdateOneModel, WriteModel};
use mongodb::{Client, Collection};

use super::params::{from_document, into_document};
use crate::error::MongoMiddlewareDbError;
use crate::store::{BulkUpdateCounts, DocumentStore, FindRequest, UpdateOne};
use crate::types::DocMap;

/// One MongoDB collection, plus the client needed for client-level bulk writes.
///
/// Cloning is cheap; both halves are reference-counted driver handles.
#[derive(Clone, Debug)]
pub struct MongoCollection {
    client: Client,
    collection: Collection<Document>,
}

impl MongoCollection {
    #[must_use]
    pub fn new(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            client: client.clone(),
            collection: client.database(database).collection::<Document>(collection),
        }
    }

    /// The raw driver collection, for anything the façades do not cover.
    #[must_use]
    pub fn inner(&self) -> &Collection<Document> {
        &self.collection
    }
}

fn count_from_driver(value: i64, what: &str) -> Result<u64, MongoMiddlewareDbError> {
    u64::try_from(value).map_err(|e| {
        MongoMiddlewareDbError::ExecutionError(format!("mongo {what} count conversion error: {e}"))
    })
}

/// Client-level bulk writes need MongoDB 8.0+; say so instead of surfacing the
/// driver's generic incompatible-server error.
fn bulk_write_failure(err: mongodb::error::Error) -> MongoMiddlewareDbError {
    if matches!(*err.kind, ErrorKind::IncompatibleServer { .. }) {
        MongoMiddlewareDbError::Unimplemented(format!(
            "bulk update requires MongoDB 8.0 or newer: {err}"
        ))
    } else {
        MongoMiddlewareDbError::MongoError(err)
    }
}

#[async_trait]
impl DocumentStore for MongoCollection {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    async fn find(&self, request: FindRequest) -> Result<Vec<DocMap>, MongoMiddlewareDbError> {
        let sort = request.sort_map().map(into_document).transpose()?;
        let projection = request.projection.map(into_document).transpose()?;
        let filter = into_document(request.filter)?;

        let mut find = self.collection.find(filter);
        if let Some(projection) = projection {
            find = find.projection(projection);
        }
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(limit) = request.limit {
            find = find.limit(limit);
        }

        let cursor = find.await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(from_document).collect())
    }

    async fn insert_one(&self, document: DocMap) -> Result<(), MongoMiddlewareDbError> {
        self.collection.insert_one(into_document(document)?).await?;
        Ok(())
    }

    async fn insert_many(&self, documents: Vec<DocMap>) -> Result<u64, MongoMiddlewareDbError> {
        let documents = documents
            .into_iter()
            .map(into_document)
            .collect::<Result<Vec<_>, _>>()?;
        let result = self.collection.insert_many(documents).await?;
        u64::try_from(result.inserted_ids.len()).map_err(|e| {
            MongoMiddlewareDbError::ExecutionError(format!(
                "mongo inserted count conversion error: {e}"
            ))
        })
    }

    async fn bulk_update(
        &self,
        operations: Vec<UpdateOne>,
    ) -> Result<BulkUpdateCounts, MongoMiddlewareDbError> {
        let namespace = self.collection.namespace();
        let models = operations
            .into_iter()
            .map(|op| {
                let model = UpdateOneModel::builder()
                    .namespace(namespace.clone())
                    .filter(into_document(op.filter)?)
                    .update(UpdateModifications::Document(into_document(op.update)?))
                    .upsert(op.upsert)
                    .build();
                Ok(WriteModel::UpdateOne(model))
            })
            .collect::<Result<Vec<_>, MongoMiddlewareDbError>>()?;

        let result = self
            .client
            .bulk_write(models)
            .await
            .map_err(bulk_write_failure)?;
        Ok(BulkUpdateCounts {
            matched: count_from_driver(result.matched_count, "matched")?,
            modified: count_from_driver(result.modified_count, "modified")?,
            upserted: count_from_driver(result.upserted_count, "upserted")?,
        })
    }

    async fn delete_many(&self, filter: DocMap) -> Result<u64, MongoMiddlewareDbError> {
        let result = self.collection.delete_many(into_document(filter)?).await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_bulk_write_failures_pass_through() {
        let err = bulk_write_failure(mongodb::error::Error::custom("boom"));
        assert!(matches!(err, MongoMiddlewareDbError::MongoError(_)));
    }
}
