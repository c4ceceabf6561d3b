//! Walks a collection through the four façade operations once: fetch recent
//! documents, insert a test document, upsert its status, purge stale records.
//!
//! Reads `MONGO_USERNAME`, `MONGO_PASSWORD`, `MONGO_HOST`, `MONGO_DATABASE` and
//! `MONGO_COLLECTION` from the environment or a `.env` file.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use clap::Parser;
use mongo_middleware::prelude::*;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Exercise fetch/insert/update/delete against one MongoDB collection")]
struct Args {
    /// `.env` file to load before reading `MONGO_*` variables
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
    /// Fetch documents updated within this many days
    #[arg(long, default_value_t = 7)]
    recent_days: i64,
    /// Maximum documents to fetch (0 = no limit)
    #[arg(long, default_value_t = 100)]
    limit: i64,
    /// Delete documents last updated more than this many days ago
    #[arg(long, default_value_t = 30)]
    purge_days: i64,
    /// Sort direction for the fetch
    #[arg(long, value_enum, default_value = "descending")]
    sort: SortDirection,
    /// Print a JSON report on stdout when done
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    fetched: usize,
    documents: Vec<serde_json::Value>,
    inserted: InsertSummary,
    updated: UpdateSummary,
    deleted: DeleteSummary,
}

impl Report {
    fn new(
        docs: &[DocMap],
        inserted: InsertSummary,
        updated: UpdateSummary,
        deleted: DeleteSummary,
    ) -> Self {
        Self {
            fetched: docs.len(),
            documents: docs.iter().map(DocMap::to_json).collect(),
            inserted,
            updated,
            deleted,
        }
    }
}

fn load_config(args: &Args) -> Result<MongoConfig, MongoMiddlewareDbError> {
    if args.env_file.exists() {
        MongoConfig::from_env_file(&args.env_file)
    } else {
        MongoConfig::from_env()
    }
}

async fn run(args: Args) -> Result<(), MongoMiddlewareDbError> {
    let cfg = load_config(&args)?;
    let conn = MongoConnection::connect(&cfg).await?;
    info!("Connected to MongoDB");
    let store = conn.configured_collection(&cfg);

    let since = Utc::now() - Duration::days(args.recent_days);
    let docs = fetch_documents(
        &store,
        FetchOptions::new()
            .filter(DocMap::new().with("updatedAt", DocMap::new().with("$gte", since)))
            .projection(
                DocMap::new()
                    .with("_id", 0_i64)
                    .with("userId", 1_i64)
                    .with("updatedAt", 1_i64),
            )
            .sort_by("updatedAt", args.sort)
            .limit(args.limit),
    )
    .await?;
    info!("Fetched {} documents", docs.len());

    let inserted = insert_documents(
        &store,
        vec![
            DocMap::new()
                .with("name", "Test User")
                .with("createdAt", Utc::now()),
        ],
    )
    .await?;

    let updated = update_documents(
        &store,
        vec![UpdateSpec::new(
            DocMap::new().with("name", "Test User"),
            DocMap::new().with("$set", DocMap::new().with("status", "active")),
        )],
        true,
    )
    .await?;

    let cutoff = Utc::now() - Duration::days(args.purge_days);
    let deleted = delete_documents(
        &store,
        DocMap::new().with("updatedAt", DocMap::new().with("$lt", cutoff)),
    )
    .await?;

    if args.json {
        let report = Report::new(&docs, inserted, updated, deleted);
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| MongoMiddlewareDbError::Other(format!("report serialization: {e}")))?;
        println!("{rendered}");
    }

    conn.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        tracing::error!(kind = ?err.kind(), "{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_fetched_documents() {
        let docs = vec![DocMap::new().with("userId", "u1").with("visits", 2_i64)];
        let report = Report::new(
            &docs,
            InsertSummary { inserted: 1 },
            UpdateSummary::default(),
            DeleteSummary { deleted: 3 },
        );
        let rendered = serde_json::to_value(&report).unwrap();
        assert_eq!(rendered["fetched"], 1);
        assert_eq!(
            rendered["documents"],
            serde_json::json!([{"userId": "u1", "visits": 2}])
        );
        assert_eq!(rendered["deleted"]["deleted"], 3);
    }
}
