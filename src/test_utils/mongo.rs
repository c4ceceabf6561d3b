use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::MongoConfig;

pub const TEST_HOST_VAR: &str = "TESTING_MONGO_HOST";
pub const TEST_USERNAME_VAR: &str = "TESTING_MONGO_USERNAME";
pub const TEST_PASSWORD_VAR: &str = "TESTING_MONGO_PASSWORD";
pub const TEST_DATABASE: &str = "mongo_middleware_test";

static COLLECTION_SEQ: AtomicU32 = AtomicU32::new(0);

/// A collection name no other test in this run (or a recent run) will use.
#[must_use]
pub fn unique_collection_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = COLLECTION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{nanos}_{seq}")
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Config for a live server, or `None` when any of the `TESTING_MONGO_*`
/// variables is unset so the caller can skip.
///
/// The database is always [`TEST_DATABASE`] and the collection is unique per call.
#[must_use]
pub fn live_config(collection_prefix: &str) -> Option<MongoConfig> {
    let host = non_empty_var(TEST_HOST_VAR)?;
    let username = non_empty_var(TEST_USERNAME_VAR)?;
    let password = non_empty_var(TEST_PASSWORD_VAR)?;
    Some(MongoConfig::new(
        host,
        username,
        password,
        TEST_DATABASE,
        unique_collection_name(collection_prefix),
    ))
}
