//! An in-memory [`DocumentStore`] for offline tests.
//!
//! Records every primitive call so tests can assert which path a façade took,
//! and evaluates enough of the query language to exercise real scenarios:
//! equality and `$eq $ne $lt $lte $gt $gte $in $nin $exists`, `$and`/`$or`,
//! dotted paths, include/exclude projection, multi-key sort, limit and the
//! `$set`/`$unset`/`$inc` update operators with upsert.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::{self, doc};
use mongodb::error::{ErrorKind, InsertManyError, WriteError, WriteFailure};

use crate::error::MongoMiddlewareDbError;
use crate::store::{BulkUpdateCounts, DocumentStore, FindRequest, UpdateOne};
use crate::types::{DocMap, DocValues, SortDirection};

const ID_FIELD: &str = "_id";
const DUPLICATE_KEY: i32 = 11000;
const SUPPORTED_UPDATE_OPERATORS: &[&str] = &["$set", "$unset", "$inc"];

/// One primitive call observed by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Find(FindRequest),
    InsertOne,
    InsertMany(usize),
    BulkUpdate(usize),
    DeleteMany,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    documents: Mutex<Vec<DocMap>>,
    calls: Mutex<Vec<StoreCall>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        // a panicking test thread must not hide the data from the next assertion
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load documents directly, bypassing call recording. Missing `_id`s are assigned.
    pub fn seed(&self, documents: impl IntoIterator<Item = DocMap>) {
        let mut stored = lock(&self.documents);
        for document in documents {
            stored.push(self.with_id(document));
        }
    }

    /// Snapshot of every stored document, in insertion order.
    #[must_use]
    pub fn documents(&self) -> Vec<DocMap> {
        lock(&self.documents).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every primitive call so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }

    fn with_id(&self, mut document: DocMap) -> DocMap {
        if !document.contains_key(ID_FIELD) {
            let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1;
            document.insert(ID_FIELD, DocValues::ObjectId(format!("{id:024x}")));
        }
        document
    }

    /// Insert one document, failing on a duplicate `_id` the way the server does.
    /// `batch_index` is the position inside an `insert_many` call, if any.
    fn insert_checked(
        &self,
        stored: &mut Vec<DocMap>,
        document: DocMap,
        batch_index: Option<usize>,
    ) -> Result<(), MongoMiddlewareDbError> {
        let document = self.with_id(document);
        let id = document.get(ID_FIELD);
        if stored.iter().any(|existing| existing.get(ID_FIELD) == id) {
            return Err(self.duplicate_key_error(id, batch_index));
        }
        stored.push(document);
        Ok(())
    }

    // Same driver error shapes as a real collection: a single write error for
    // insert_one, an indexed write error inside InsertMany for insert_many.
    fn duplicate_key_error(
        &self,
        id: Option<&DocValues>,
        batch_index: Option<usize>,
    ) -> MongoMiddlewareDbError {
        let message = format!(
            "E11000 duplicate key error collection: {} index: _id_ dup key: {{ _id: {id:?} }}",
            self.name
        );
        let kind = match batch_index {
            None => bson::from_document::<WriteError>(doc! {
                "code": DUPLICATE_KEY,
                "codeName": "DuplicateKey",
                "errmsg": message.as_str(),
            })
            .map(|write_error| ErrorKind::Write(WriteFailure::WriteError(write_error))),
            Some(index) => bson::from_document::<InsertManyError>(doc! {
                "writeErrors": [{
                    "index": i64::try_from(index).unwrap_or(i64::MAX),
                    "code": DUPLICATE_KEY,
                    "codeName": "DuplicateKey",
                    "errmsg": message.as_str(),
                }],
            })
            .map(ErrorKind::InsertMany),
        };
        match kind {
            Ok(kind) => mongodb::error::Error::from(kind).into(),
            Err(e) => MongoMiddlewareDbError::ExecutionError(format!("{message} ({e})")),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn find(&self, request: FindRequest) -> Result<Vec<DocMap>, MongoMiddlewareDbError> {
        self.record(StoreCall::Find(request.clone()));
        let stored = lock(&self.documents);

        let mut matched: Vec<DocMap> = stored
            .iter()
            .filter(|doc| matches_filter(doc, &request.filter))
            .cloned()
            .collect();
        drop(stored);

        if let Some(sort) = &request.sort {
            matched.sort_by(|a, b| compare_by_sort(a, b, sort));
        }
        if let Some(limit) = request.limit {
            let take = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
            matched.truncate(take);
        }
        if let Some(projection) = &request.projection {
            matched = matched
                .into_iter()
                .map(|doc| apply_projection(doc, projection))
                .collect();
        }
        Ok(matched)
    }

    async fn insert_one(&self, document: DocMap) -> Result<(), MongoMiddlewareDbError> {
        self.record(StoreCall::InsertOne);
        let mut stored = lock(&self.documents);
        self.insert_checked(&mut stored, document, None)
    }

    async fn insert_many(&self, documents: Vec<DocMap>) -> Result<u64, MongoMiddlewareDbError> {
        self.record(StoreCall::InsertMany(documents.len()));
        let mut stored = lock(&self.documents);
        let mut inserted = 0;
        // ordered: stop at the first failure, keep what went in before it
        for (index, document) in documents.into_iter().enumerate() {
            self.insert_checked(&mut stored, document, Some(index))?;
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn bulk_update(
        &self,
        operations: Vec<UpdateOne>,
    ) -> Result<BulkUpdateCounts, MongoMiddlewareDbError> {
        self.record(StoreCall::BulkUpdate(operations.len()));
        // every model is checked before anything is sent, matched or not
        for op in &operations {
            check_update(&op.update)?;
        }
        let mut stored = lock(&self.documents);
        let mut counts = BulkUpdateCounts::default();

        for op in operations {
            if let Some(idx) = stored.iter().position(|doc| matches_filter(doc, &op.filter)) {
                counts.matched += 1;
                let updated = apply_update(stored[idx].clone(), &op.update)?;
                if updated != stored[idx] {
                    counts.modified += 1;
                    stored[idx] = updated;
                }
            } else if op.upsert {
                let seeded = apply_update(equality_fields(&op.filter), &op.update)?;
                stored.push(self.with_id(seeded));
                counts.upserted += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_many(&self, filter: DocMap) -> Result<u64, MongoMiddlewareDbError> {
        self.record(StoreCall::DeleteMany);
        let mut stored = lock(&self.documents);
        let before = stored.len();
        stored.retain(|doc| !matches_filter(doc, &filter));
        Ok((before - stored.len()) as u64)
    }
}

fn lookup<'a>(doc: &'a DocMap, path: &str) -> Option<&'a DocValues> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_map()?.get(part)?;
    }
    Some(current)
}

fn compare_values(left: &DocValues, right: &DocValues) -> Option<Ordering> {
    match (left, right) {
        (DocValues::Text(a), DocValues::Text(b)) | (DocValues::ObjectId(a), DocValues::ObjectId(b)) => {
            Some(a.cmp(b))
        }
        (DocValues::Timestamp(a), DocValues::Timestamp(b)) => Some(a.cmp(b)),
        (DocValues::Bool(a), DocValues::Bool(b)) => Some(a.cmp(b)),
        (DocValues::Null, DocValues::Null) => Some(Ordering::Equal),
        _ => left.as_float()?.partial_cmp(&right.as_float()?),
    }
}

fn values_equal(left: &DocValues, right: &DocValues) -> bool {
    compare_values(left, right).map_or(left == right, Ordering::is_eq)
}

fn is_operator_map(value: &DocValues) -> Option<&DocMap> {
    value
        .as_map()
        .filter(|map| !map.is_empty() && map.keys().all(|k| k.starts_with('$')))
}

fn matches_filter(doc: &DocMap, filter: &DocMap) -> bool {
    filter.iter().all(|(key, condition)| match key {
        "$and" => condition
            .as_list()
            .is_some_and(|subs| subs.iter().all(|s| s.as_map().is_some_and(|f| matches_filter(doc, f)))),
        "$or" => condition
            .as_list()
            .is_some_and(|subs| subs.iter().any(|s| s.as_map().is_some_and(|f| matches_filter(doc, f)))),
        _ => matches_field(lookup(doc, key), condition),
    })
}

fn matches_field(value: Option<&DocValues>, condition: &DocValues) -> bool {
    let Some(operators) = is_operator_map(condition) else {
        return value.is_some_and(|v| equals_or_contains(v, condition))
            || (value.is_none() && condition.is_null());
    };
    operators.iter().all(|(op, operand)| match op {
        "$eq" => value.is_some_and(|v| equals_or_contains(v, operand)),
        "$ne" => !value.is_some_and(|v| equals_or_contains(v, operand)),
        "$lt" => value.is_some_and(|v| compare_values(v, operand) == Some(Ordering::Less)),
        "$lte" => value.is_some_and(|v| {
            matches!(compare_values(v, operand), Some(Ordering::Less | Ordering::Equal))
        }),
        "$gt" => value.is_some_and(|v| compare_values(v, operand) == Some(Ordering::Greater)),
        "$gte" => value.is_some_and(|v| {
            matches!(compare_values(v, operand), Some(Ordering::Greater | Ordering::Equal))
        }),
        "$in" => operand.as_list().is_some_and(|candidates| {
            value.is_some_and(|v| candidates.iter().any(|c| equals_or_contains(v, c)))
        }),
        "$nin" => operand.as_list().is_some_and(|candidates| {
            !value.is_some_and(|v| candidates.iter().any(|c| equals_or_contains(v, c)))
        }),
        "$exists" => operand.as_bool().unwrap_or(true) == value.is_some(),
        _ => false,
    })
}

fn equals_or_contains(value: &DocValues, expected: &DocValues) -> bool {
    if values_equal(value, expected) {
        return true;
    }
    match value {
        DocValues::List(items) if expected.as_list().is_none() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        _ => false,
    }
}

fn compare_by_sort(a: &DocMap, b: &DocMap, sort: &[(String, SortDirection)]) -> Ordering {
    for (field, direction) in sort {
        // missing sorts lowest
        let ordering = match (lookup(a, field), lookup(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn is_truthy(value: &DocValues) -> bool {
    match value {
        DocValues::Bool(b) => *b,
        DocValues::Null => false,
        other => other.as_float().is_none_or(|n| n != 0.0),
    }
}

fn apply_projection(doc: DocMap, projection: &DocMap) -> DocMap {
    let inclusive = projection
        .iter()
        .any(|(key, flag)| key != ID_FIELD && is_truthy(flag));
    let keep_id = projection.get(ID_FIELD).is_none_or(is_truthy);

    doc.into_iter()
        .filter(|(key, _)| {
            if key == ID_FIELD {
                keep_id
            } else if inclusive {
                projection.get(key).is_some_and(is_truthy)
            } else {
                projection.get(key).is_none_or(is_truthy)
            }
        })
        .collect()
}

fn check_update(update: &DocMap) -> Result<(), MongoMiddlewareDbError> {
    if update.is_empty() || update.keys().any(|k| !k.starts_with('$')) {
        return Err(MongoMiddlewareDbError::ParameterError(
            "update document requires atomic operators".to_string(),
        ));
    }
    for (op, fields) in update.iter() {
        if fields.as_map().is_none() {
            return Err(MongoMiddlewareDbError::ParameterError(format!(
                "{op} expects a mapping"
            )));
        }
        if !SUPPORTED_UPDATE_OPERATORS.contains(&op) {
            return Err(MongoMiddlewareDbError::Unimplemented(format!(
                "memory store does not support update operator {op}"
            )));
        }
    }
    Ok(())
}

fn apply_update(mut doc: DocMap, update: &DocMap) -> Result<DocMap, MongoMiddlewareDbError> {
    check_update(update)?;
    for (op, fields) in update.iter() {
        let Some(fields) = fields.as_map() else {
            continue;
        };
        match op {
            "$set" => {
                for (field, value) in fields.iter() {
                    doc.insert(field, value.clone());
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    doc.remove(field);
                }
            }
            "$inc" => {
                for (field, delta) in fields.iter() {
                    let next = match (doc.get(field), delta) {
                        (None, d) => d.clone(),
                        (Some(DocValues::Int(cur)), DocValues::Int(d)) => {
                            DocValues::Int(cur.checked_add(*d).ok_or_else(|| {
                                MongoMiddlewareDbError::ParameterError(format!(
                                    "$inc on '{field}' overflows a 64-bit integer"
                                ))
                            })?)
                        }
                        (Some(cur), d) => match (cur.as_float(), d.as_float()) {
                            (Some(c), Some(d)) => DocValues::Float(c + d),
                            _ => {
                                return Err(MongoMiddlewareDbError::ParameterError(format!(
                                    "cannot $inc non-numeric field '{field}'"
                                )));
                            }
                        },
                    };
                    doc.insert(field, next);
                }
            }
            _ => {}
        }
    }
    Ok(doc)
}

/// The plain `field: value` pairs of a filter, which an upsert copies into the new document.
fn equality_fields(filter: &DocMap) -> DocMap {
    filter
        .iter()
        .filter(|(key, value)| !key.starts_with('$') && is_operator_map(value).is_none())
        .map(|(key, value)| (key, value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_operators_on_numbers_and_text() {
        let doc = DocMap::new().with("age", 30_i64).with("name", "bob");
        let over_18 = DocMap::new().with("age", DocMap::new().with("$gte", 18_i64));
        let under_18 = DocMap::new().with("age", DocMap::new().with("$lt", 18.0));
        assert!(matches_filter(&doc, &over_18));
        assert!(!matches_filter(&doc, &under_18));
        assert!(matches_filter(&doc, &DocMap::new().with("name", "bob")));
        assert!(!matches_filter(&doc, &DocMap::new().with("missing", 1_i64)));
    }

    #[test]
    fn exclusion_projection_drops_only_named_fields() {
        let doc = DocMap::new().with("_id", 1_i64).with("a", 1_i64).with("b", 2_i64);
        let projected = apply_projection(doc, &DocMap::new().with("b", 0_i64));
        assert_eq!(projected, DocMap::new().with("_id", 1_i64).with("a", 1_i64));
    }

    #[test]
    fn replacement_documents_are_rejected() {
        let err = apply_update(DocMap::new(), &DocMap::new().with("name", "x")).unwrap_err();
        assert!(err.to_string().contains("atomic operators"));
    }

    #[test]
    fn int_increment_overflow_is_an_error() {
        let doc = DocMap::new().with("hits", i64::MAX);
        let err = apply_update(doc, &DocMap::new().with("$inc", DocMap::new().with("hits", 1_i64)))
            .unwrap_err();
        assert!(matches!(err, MongoMiddlewareDbError::ParameterError(_)));

        let doc = DocMap::new().with("hits", 41_i64);
        let bumped =
            apply_update(doc, &DocMap::new().with("$inc", DocMap::new().with("hits", 1_i64)))
                .unwrap();
        assert_eq!(bumped.get("hits"), Some(&DocValues::Int(42)));
    }

    #[test]
    fn bad_update_fails_the_whole_batch_before_any_write() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = MemoryStore::new("users");
        store.seed([DocMap::new().with("name", "ada").with("n", 1_i64)]);
        let good = UpdateOne {
            filter: DocMap::new().with("name", "ada"),
            update: DocMap::new().with("$set", DocMap::new().with("n", 2_i64)),
            upsert: false,
        };
        let bad = UpdateOne {
            filter: DocMap::new().with("name", "nobody"),
            update: DocMap::new().with("name", "eve"),
            upsert: false,
        };
        let err = rt.block_on(store.bulk_update(vec![good, bad])).unwrap_err();
        assert!(matches!(err, MongoMiddlewareDbError::ParameterError(_)));
        assert_eq!(store.documents()[0].get("n"), Some(&DocValues::Int(1)));
    }

    #[test]
    fn duplicate_id_on_single_insert_is_a_conflict() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = MemoryStore::new("users");
        let doc = DocMap::new().with("_id", 7_i64);
        rt.block_on(store.insert_one(doc.clone())).unwrap();
        let err = rt.block_on(store.insert_one(doc)).unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::DataConflict);
        assert!(err.to_string().contains("E11000"));
    }
}
