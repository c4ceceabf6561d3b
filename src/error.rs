use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Server error codes that indicate a conflict with data already in the store.
const DATA_CONFLICT_CODES: &[i32] = &[
    11000, // DuplicateKey
    11001, // legacy DuplicateKey
    112,   // WriteConflict
];

/// Server error codes that indicate the request itself was malformed.
const MALFORMED_REQUEST_CODES: &[i32] = &[
    2,  // BadValue
    9,  // FailedToParse
    14, // TypeMismatch
    40, // ConflictingUpdateOperators
    52, // DollarPrefixedFieldName
    66, // ImmutableField
];

#[derive(Debug, Error)]
pub enum MongoMiddlewareDbError {
    #[error(transparent)]
    MongoError(#[from] mongodb::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

/// Coarse classification of a failure.
///
/// The error itself is never rewritten; this only tells the caller which bucket
/// a failure falls into so it can decide what to do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad host or credentials, unreachable network, server selection timeouts.
    Connectivity,
    /// Invalid filter or update syntax, bad arguments.
    MalformedRequest,
    /// Duplicate keys and write conflicts.
    DataConflict,
    Other,
}

impl MongoMiddlewareDbError {
    /// Classify this error without altering it.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MongoError(err) => classify_driver_error(err.kind.as_ref()),
            Self::ConnectionError(_) => FailureKind::Connectivity,
            Self::ParameterError(_) | Self::ConfigError(_) => FailureKind::MalformedRequest,
            Self::ExecutionError(_) | Self::Unimplemented(_) | Self::Other(_) => {
                FailureKind::Other
            }
        }
    }
}

fn classify_code(code: i32) -> FailureKind {
    if DATA_CONFLICT_CODES.contains(&code) {
        FailureKind::DataConflict
    } else if MALFORMED_REQUEST_CODES.contains(&code) {
        FailureKind::MalformedRequest
    } else {
        FailureKind::Other
    }
}

/// The most specific bucket among a batch's per-document write errors.
fn classify_codes(codes: impl IntoIterator<Item = i32>) -> FailureKind {
    codes
        .into_iter()
        .map(classify_code)
        .find(|kind| *kind != FailureKind::Other)
        .unwrap_or(FailureKind::Other)
}

fn classify_driver_error(kind: &ErrorKind) -> FailureKind {
    match kind {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::Authentication { .. }
        | ErrorKind::ConnectionPoolCleared { .. } => FailureKind::Connectivity,
        ErrorKind::InvalidArgument { .. } | ErrorKind::BsonSerialization(_) => {
            FailureKind::MalformedRequest
        }
        ErrorKind::Command(cmd) => classify_code(cmd.code),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => classify_code(write_error.code),
        ErrorKind::InsertMany(batch) => classify_codes(
            batch
                .write_errors
                .iter()
                .flatten()
                .map(|write_error| write_error.code),
        ),
        ErrorKind::BulkWrite(batch) => {
            classify_codes(batch.write_errors.values().map(|write_error| write_error.code))
        }
        _ => FailureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{self, doc};
    use mongodb::error::{BulkWriteError, InsertManyError, WriteError};

    #[test]
    fn local_variants_map_to_taxonomy() {
        assert_eq!(
            MongoMiddlewareDbError::ConnectionError("refused".into()).kind(),
            FailureKind::Connectivity
        );
        assert_eq!(
            MongoMiddlewareDbError::ParameterError("missing filter".into()).kind(),
            FailureKind::MalformedRequest
        );
        assert_eq!(
            MongoMiddlewareDbError::Other("?".into()).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn server_codes_split_conflicts_from_bad_requests() {
        assert_eq!(classify_code(11000), FailureKind::DataConflict);
        assert_eq!(classify_code(112), FailureKind::DataConflict);
        assert_eq!(classify_code(9), FailureKind::MalformedRequest);
        assert_eq!(classify_code(13), FailureKind::Other);
    }

    #[test]
    fn duplicate_key_inside_insert_many_is_a_conflict() {
        let batch: InsertManyError = bson::from_document(doc! {
            "writeErrors": [
                { "index": 1, "code": 11000, "errmsg": "E11000 duplicate key error" }
            ]
        })
        .unwrap();
        let err = MongoMiddlewareDbError::from(mongodb::error::Error::from(
            ErrorKind::InsertMany(batch),
        ));
        assert_eq!(err.kind(), FailureKind::DataConflict);
    }

    #[test]
    fn write_error_inside_bulk_write_is_classified() {
        let write_error: WriteError = bson::from_document(doc! {
            "code": 112, "errmsg": "WriteConflict"
        })
        .unwrap();
        let mut batch = BulkWriteError::default();
        batch.write_errors.insert(0, write_error);
        let err = MongoMiddlewareDbError::from(mongodb::error::Error::from(
            ErrorKind::BulkWrite(batch),
        ));
        assert_eq!(err.kind(), FailureKind::DataConflict);

        let empty = MongoMiddlewareDbError::from(mongodb::error::Error::from(
            ErrorKind::BulkWrite(BulkWriteError::default()),
        ));
        assert_eq!(empty.kind(), FailureKind::Other);
    }
}
