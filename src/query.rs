use crate::error::MongoMiddlewareDbError;
use crate::types::{DocMap, DocValues, SortDirection};

/// Read parameters for [`fetch_documents`](crate::executor::fetch_documents).
///
/// Every field is optional; the default fetches the whole collection:
/// ```rust
/// use mongo_middleware::prelude::*;
///
/// let opts = FetchOptions::new()
///     .filter(DocMap::new().with("status", "active"))
///     .projection(DocMap::new().with("_id", 0_i64).with("userId", 1_i64))
///     .sort_by("updatedAt", SortDirection::Descending)
///     .limit(100);
/// # let _ = opts;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Query filter; `None` matches every document
    pub filter: Option<DocMap>,
    /// Fields to include or exclude
    pub projection: Option<DocMap>,
    /// Ordered (field, direction) pairs; an empty list means unsorted
    pub sort: Option<Vec<(String, SortDirection)>>,
    /// Maximum documents to return; `0` means no limit
    pub limit: Option<i64>,
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: DocMap) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn projection(mut self, projection: DocMap) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Append one sort key after any already present.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort
            .get_or_insert_with(Vec::new)
            .push((field.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One conditional update: a filter and the update-operator mapping applied to
/// the first document it matches.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    pub filter: DocMap,
    pub update: DocMap,
}

impl UpdateSpec {
    #[must_use]
    pub fn new(filter: DocMap, update: DocMap) -> Self {
        Self { filter, update }
    }
}

impl TryFrom<DocMap> for UpdateSpec {
    type Error = MongoMiddlewareDbError;

    /// Accepts the loose `{"filter": {...}, "update": {...}}` form.
    ///
    /// # Errors
    /// Returns `MongoMiddlewareDbError::ParameterError` if either key is missing or
    /// is not a nested mapping.
    fn try_from(mut entry: DocMap) -> Result<Self, Self::Error> {
        let filter = take_map(&mut entry, "filter")?;
        let update = take_map(&mut entry, "update")?;
        Ok(UpdateSpec { filter, update })
    }
}

fn take_map(entry: &mut DocMap, key: &str) -> Result<DocMap, MongoMiddlewareDbError> {
    match entry.remove(key) {
        Some(DocValues::Map(map)) => Ok(map),
        Some(other) => Err(MongoMiddlewareDbError::ParameterError(format!(
            "update entry key '{key}' must be a mapping, got {other:?}"
        ))),
        None => Err(MongoMiddlewareDbError::ParameterError(format!(
            "update entry is missing '{key}'"
        ))),
    }
}

/// Validate a batch of loose update entries in one pass.
///
/// # Errors
/// Returns the first `ParameterError` encountered, tagged with the entry index.
pub fn update_specs_from_maps(
    entries: Vec<DocMap>,
) -> Result<Vec<UpdateSpec>, MongoMiddlewareDbError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            UpdateSpec::try_from(entry).map_err(|err| match err {
                MongoMiddlewareDbError::ParameterError(msg) => {
                    MongoMiddlewareDbError::ParameterError(format!("entry {idx}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_accumulate_in_order() {
        let opts = FetchOptions::new()
            .sort_by("a", SortDirection::Ascending)
            .sort_by("b", SortDirection::Descending);
        assert_eq!(
            opts.sort,
            Some(vec![
                ("a".to_string(), SortDirection::Ascending),
                ("b".to_string(), SortDirection::Descending),
            ])
        );
    }

    #[test]
    fn loose_update_entry_needs_both_keys() {
        let ok = DocMap::new()
            .with("filter", DocMap::new().with("name", "Test User"))
            .with(
                "update",
                DocMap::new().with("$set", DocMap::new().with("status", "active")),
            );
        let spec = UpdateSpec::try_from(ok).unwrap();
        assert_eq!(spec.filter, DocMap::new().with("name", "Test User"));

        let missing = DocMap::new().with("filter", DocMap::new());
        let err = UpdateSpec::try_from(missing).unwrap_err();
        assert!(err.to_string().contains("missing 'update'"));

        let wrong_type = DocMap::new()
            .with("filter", "name = 'x'")
            .with("update", DocMap::new());
        assert!(UpdateSpec::try_from(wrong_type).is_err());
    }

    #[test]
    fn batch_validation_reports_index() {
        let entries = vec![
            DocMap::new()
                .with("filter", DocMap::new())
                .with("update", DocMap::new()),
            DocMap::new().with("update", DocMap::new()),
        ];
        let err = update_specs_from_maps(entries).unwrap_err();
        assert!(err.to_string().contains("entry 1"));
    }
}
