use chrono::{TimeZone, Utc};
use mongodb::bson::{self, Binary, Bson, Document, oid::ObjectId, spec::BinarySubtype};

use crate::error::MongoMiddlewareDbError;
use crate::types::{DocMap, DocValues};

/// Convert one value into BSON.
///
/// # Errors
/// Returns `MongoMiddlewareDbError::ParameterError` if an object id is not valid hex.
pub fn into_bson(value: DocValues) -> Result<Bson, MongoMiddlewareDbError> {
    let converted = match value {
        DocValues::Null => Bson::Null,
        DocValues::Bool(b) => Bson::Boolean(b),
        DocValues::Int(i) => Bson::Int64(i),
        DocValues::Float(f) => Bson::Double(f),
        DocValues::Text(s) => Bson::String(s),
        DocValues::Timestamp(ts) => Bson::DateTime(bson::DateTime::from_millis(ts.timestamp_millis())),
        DocValues::ObjectId(hex) => Bson::ObjectId(ObjectId::parse_str(&hex).map_err(|e| {
            MongoMiddlewareDbError::ParameterError(format!("invalid object id '{hex}': {e}"))
        })?),
        DocValues::Blob(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }),
        DocValues::List(values) => Bson::Array(
            values
                .into_iter()
                .map(into_bson)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        DocValues::Map(map) => Bson::Document(into_document(map)?),
    };
    Ok(converted)
}

/// Convert a whole document, preserving key order.
///
/// # Errors
/// Returns `MongoMiddlewareDbError::ParameterError` if any nested value fails to convert.
pub fn into_document(map: DocMap) -> Result<Document, MongoMiddlewareDbError> {
    let mut document = Document::new();
    for (key, value) in map {
        document.insert(key, into_bson(value)?);
    }
    Ok(document)
}

/// Convert a BSON value coming back from the store.
///
/// Types without a [`DocValues`] counterpart (decimal128, regex, code, min/max
/// keys, internal timestamps) come back as their text rendering.
#[must_use]
pub fn from_bson(value: Bson) -> DocValues {
    match value {
        Bson::Null | Bson::Undefined => DocValues::Null,
        Bson::Boolean(b) => DocValues::Bool(b),
        Bson::Int32(i) => DocValues::Int(i64::from(i)),
        Bson::Int64(i) => DocValues::Int(i),
        Bson::Double(f) => DocValues::Float(f),
        Bson::String(s) => DocValues::Text(s),
        Bson::DateTime(dt) => {
            let millis = dt.timestamp_millis();
            Utc.timestamp_millis_opt(millis)
                .single()
                .map_or(DocValues::Int(millis), DocValues::Timestamp)
        }
        Bson::ObjectId(oid) => DocValues::ObjectId(oid.to_hex()),
        Bson::Binary(binary) => DocValues::Blob(binary.bytes),
        Bson::Array(values) => DocValues::List(values.into_iter().map(from_bson).collect()),
        Bson::Document(document) => DocValues::Map(from_document(document)),
        other => DocValues::Text(other.to_string()),
    }
}

/// Convert a document coming back from the store, preserving key order.
#[must_use]
pub fn from_document(document: Document) -> DocMap {
    let mut map = DocMap::with_capacity(document.len());
    for (key, value) in document {
        map.insert(key, from_bson(value));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SubsecRound};
    use mongodb::bson::doc;

    #[test]
    fn nested_document_converts_in_order() {
        let now = Utc::now().trunc_subsecs(3);
        let map = DocMap::new()
            .with("name", "Test User")
            .with("createdAt", now)
            .with("scores", vec![DocValues::from(1_i64), DocValues::from(2.5)])
            .with("profile", DocMap::new().with("active", true).with("nick", DocValues::Null));

        let document = into_document(map.clone()).unwrap();
        assert_eq!(
            document.keys().collect::<Vec<_>>(),
            vec!["name", "createdAt", "scores", "profile"]
        );
        assert_eq!(document.get_str("name").unwrap(), "Test User");

        assert_eq!(from_document(document), map);
    }

    #[test]
    fn operator_filters_pass_through_untouched() {
        let cutoff = Utc::now() - Duration::days(30);
        let filter = DocMap::new().with("updatedAt", DocMap::new().with("$lt", cutoff));
        let document = into_document(filter).unwrap();
        let inner = document.get_document("updatedAt").unwrap();
        assert!(matches!(inner.get("$lt"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn driver_only_types_fall_back_to_text() {
        let document = doc! { "_id": ObjectId::new(), "n": Bson::Int32(7), "ts": Bson::Timestamp(bson::Timestamp { time: 1, increment: 2 }) };
        let map = from_document(document);
        assert!(matches!(map.get("_id"), Some(DocValues::ObjectId(hex)) if hex.len() == 24));
        assert_eq!(map.get("n"), Some(&DocValues::Int(7)));
        assert!(matches!(map.get("ts"), Some(DocValues::Text(_))));
    }

    #[test]
    fn bad_object_id_is_a_parameter_error() {
        let err = into_bson(DocValues::ObjectId("nope".into())).unwrap_err();
        assert!(matches!(err, MongoMiddlewareDbError::ParameterError(_)));
    }
}
