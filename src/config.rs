use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MongoMiddlewareDbError;
use crate::mongo::SchemeDetection;

pub const ENV_USERNAME: &str = "MONGO_USERNAME";
pub const ENV_PASSWORD: &str = "MONGO_PASSWORD";
pub const ENV_HOST: &str = "MONGO_HOST";
pub const ENV_DATABASE: &str = "MONGO_DATABASE";
pub const ENV_COLLECTION: &str = "MONGO_COLLECTION";
pub const ENV_STRICT_SRV: &str = "MONGO_STRICT_SRV";

/// Everything needed to reach one collection.
///
/// Built once at startup and passed by reference; library functions never read
/// the process environment on their own.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    pub username: String,
    pub password: String,
    /// Bare hostname, `host:port`, or a full `mongodb[+srv]://` URI
    pub host: String,
    pub database: String,
    pub collection: String,
    #[serde(default)]
    pub scheme_detection: SchemeDetection,
}

// Keep the password out of logs and panic messages.
impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("scheme_detection", &self.scheme_detection)
            .finish()
    }
}

impl MongoConfig {
    /// Build a config directly.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            database: database.into(),
            collection: collection.into(),
            scheme_detection: SchemeDetection::default(),
        }
    }

    #[must_use]
    pub fn with_scheme_detection(mut self, detection: SchemeDetection) -> Self {
        self.scheme_detection = detection;
        self
    }

    /// Read the `MONGO_*` variables from the process environment.
    ///
    /// # Errors
    /// Returns `MongoMiddlewareDbError::ConfigError` naming the first missing or
    /// empty variable.
    pub fn from_env() -> Result<Self, MongoMiddlewareDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a `.env` file into the process environment, then read the `MONGO_*`
    /// variables. Variables already set in the environment win over the file.
    ///
    /// # Errors
    /// Returns `MongoMiddlewareDbError::ConfigError` if the file cannot be read or
    /// parsed, or if a required variable is missing.
    pub fn from_env_file(path: &Path) -> Result<Self, MongoMiddlewareDbError> {
        dotenvy::from_path(path).map_err(|e| {
            MongoMiddlewareDbError::ConfigError(format!(
                "failed to load env file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_env()
    }

    /// Build from any key lookup, e.g. a parsed `.env` file or a test map.
    ///
    /// # Errors
    /// Returns `MongoMiddlewareDbError::ConfigError` naming the first missing or
    /// empty variable, or an unrecognised `MONGO_STRICT_SRV` value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MongoMiddlewareDbError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| MongoMiddlewareDbError::ConfigError(format!("{key} is required")))
        };

        let scheme_detection = match lookup(ENV_STRICT_SRV).as_deref() {
            None | Some("" | "0" | "false" | "no") => SchemeDetection::Substring,
            Some("1" | "true" | "yes") => SchemeDetection::Prefix,
            Some(other) => {
                return Err(MongoMiddlewareDbError::ConfigError(format!(
                    "{ENV_STRICT_SRV} must be true or false, got '{other}'"
                )));
            }
        };

        Ok(Self {
            username: required(ENV_USERNAME)?,
            password: required(ENV_PASSWORD)?,
            host: required(ENV_HOST)?,
            database: required(ENV_DATABASE)?,
            collection: required(ENV_COLLECTION)?,
            scheme_detection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const FULL: &[(&str, &str)] = &[
        (ENV_USERNAME, "app"),
        (ENV_PASSWORD, "s3cret"),
        (ENV_HOST, "mongodb+srv://cluster0.example.net/?retryWrites=true"),
        (ENV_DATABASE, "analytics"),
        (ENV_COLLECTION, "events"),
    ];

    #[test]
    fn reads_all_five_values() {
        let cfg = MongoConfig::from_lookup(lookup_from(FULL)).unwrap();
        assert_eq!(cfg.username, "app");
        assert_eq!(cfg.database, "analytics");
        assert_eq!(cfg.collection, "events");
        assert_eq!(cfg.scheme_detection, SchemeDetection::Substring);
    }

    #[test]
    fn missing_value_is_named() {
        let partial = &FULL[..4];
        let err = MongoConfig::from_lookup(lookup_from(partial)).unwrap_err();
        assert!(err.to_string().contains(ENV_COLLECTION));
    }

    #[test]
    fn strict_srv_flag() {
        let mut pairs = FULL.to_vec();
        pairs.push((ENV_STRICT_SRV, "true"));
        let cfg = MongoConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(cfg.scheme_detection, SchemeDetection::Prefix);

        pairs.pop();
        pairs.push((ENV_STRICT_SRV, "maybe"));
        assert!(MongoConfig::from_lookup(lookup_from(&pairs)).is_err());
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = MongoConfig::new("localhost", "app", "hunter2", "db", "coll");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
