use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a document or used inside a filter, projection or update.
///
/// One enum covers every shape the layer hands to the driver, so callers build
/// documents without touching BSON directly:
/// ```rust
/// use mongo_middleware::prelude::*;
///
/// let doc = DocMap::new()
///     .with("name", "alice")
///     .with("visits", 3_i64)
///     .with("active", true);
/// assert_eq!(doc.get("name").and_then(DocValues::as_text), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DocValues {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// UTC timestamp, millisecond precision once stored
    Timestamp(DateTime<Utc>),
    /// Store-assigned object identifier, as lowercase hex
    ObjectId(String),
    /// Binary data
    Blob(Vec<u8>),
    /// Nested sequence
    List(Vec<DocValues>),
    /// Nested mapping
    Map(DocMap),
}

impl DocValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if let DocValues::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        if let DocValues::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Numeric view of the value; integers widen to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DocValues::Float(value) => Some(*value),
            DocValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DocValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        if let DocValues::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&DocMap> {
        if let DocValues::Map(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[DocValues]> {
        if let DocValues::List(values) = self {
            Some(values)
        } else {
            None
        }
    }

    /// Render as JSON. Timestamps become RFC 3339 strings, blobs become byte arrays
    /// and object ids become `{"$oid": "<hex>"}`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            DocValues::Null => JsonValue::Null,
            DocValues::Bool(value) => JsonValue::Bool(*value),
            DocValues::Int(value) => JsonValue::from(*value),
            DocValues::Float(value) => JsonValue::from(*value),
            DocValues::Text(value) => JsonValue::String(value.clone()),
            DocValues::Timestamp(value) => JsonValue::String(value.to_rfc3339()),
            DocValues::ObjectId(hex) => serde_json::json!({ "$oid": hex }),
            DocValues::Blob(bytes) => JsonValue::from(bytes.clone()),
            DocValues::List(values) => {
                JsonValue::Array(values.iter().map(DocValues::to_json).collect())
            }
            DocValues::Map(map) => map.to_json(),
        }
    }
}

impl From<bool> for DocValues {
    fn from(value: bool) -> Self {
        DocValues::Bool(value)
    }
}

impl From<i32> for DocValues {
    fn from(value: i32) -> Self {
        DocValues::Int(i64::from(value))
    }
}

impl From<i64> for DocValues {
    fn from(value: i64) -> Self {
        DocValues::Int(value)
    }
}

impl From<f64> for DocValues {
    fn from(value: f64) -> Self {
        DocValues::Float(value)
    }
}

impl From<&str> for DocValues {
    fn from(value: &str) -> Self {
        DocValues::Text(value.to_string())
    }
}

impl From<String> for DocValues {
    fn from(value: String) -> Self {
        DocValues::Text(value)
    }
}

impl From<DateTime<Utc>> for DocValues {
    fn from(value: DateTime<Utc>) -> Self {
        DocValues::Timestamp(value)
    }
}

impl From<DocMap> for DocValues {
    fn from(value: DocMap) -> Self {
        DocValues::Map(value)
    }
}

impl From<Vec<DocValues>> for DocValues {
    fn from(values: Vec<DocValues>) -> Self {
        DocValues::List(values)
    }
}

impl<T: Into<DocValues>> From<Option<T>> for DocValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(DocValues::Null, Into::into)
    }
}

/// A schema-free document: string keys mapped to [`DocValues`], kept in insertion order.
///
/// Key order matters to the store for sort specs and update operators, so it is
/// preserved. Equality ignores order, the way two stored documents compare
/// field-for-field.
#[derive(Debug, Clone, Default)]
pub struct DocMap {
    entries: Vec<(String, DocValues)>,
}

impl DocMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DocValues>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing an existing entry in place. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DocValues>) -> Option<DocValues> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DocValues> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut DocValues> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<DocValues> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocValues)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let object = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<String, JsonValue>>();
        JsonValue::Object(object)
    }
}

impl PartialEq for DocMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|theirs| theirs == value))
    }
}

impl<K: Into<String>, V: Into<DocValues>> FromIterator<(K, V)> for DocMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DocMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for DocMap {
    type Item = (String, DocValues);
    type IntoIter = std::vec::IntoIter<(String, DocValues)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Sort direction for one field of a sort spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// The numeric form the store expects (`1` / `-1`).
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut doc = DocMap::new().with("a", 1_i64).with("b", 2_i64);
        let previous = doc.insert("a", "one");
        assert_eq!(previous, Some(DocValues::Int(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a").and_then(DocValues::as_text), Some("one"));
    }

    #[test]
    fn equality_ignores_key_order() {
        let left = DocMap::new().with("x", 1_i64).with("y", "two");
        let right = DocMap::new().with("y", "two").with("x", 1_i64);
        assert_eq!(left, right);
        assert_ne!(left, right.with("z", DocValues::Null));
    }

    #[test]
    fn json_rendering_keeps_nesting() {
        let doc = DocMap::new()
            .with("name", "Test User")
            .with("tags", vec![DocValues::from("a"), DocValues::from(2_i64)])
            .with("meta", DocMap::new().with("ok", true));
        assert_eq!(
            doc.to_json(),
            serde_json::json!({"name": "Test User", "tags": ["a", 2], "meta": {"ok": true}})
        );
    }
}
