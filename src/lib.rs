//! Tag Manager User Audit Library
//!
//! Connects to the Google Tag Manager API with a service account, walks
//! accounts, containers and user permissions, and writes one CSV row per
//! container grant.
//!
//! ## Pipeline
//!
//! 1. [`TagManagerClient::connect`] mints a token and binds to the API
//! 2. [`aggregate::collect_records`] flattens the permission hierarchy
//! 3. [`report::write_report`] writes the CSV

pub mod aggregate;
pub mod auth;
pub mod config;
pub mod error;
pub mod report;
pub mod tagmanager;

pub use aggregate::{AccountOnlyPolicy, AggregateOptions, AggregateStats, OutputRecord};
pub use error::{AuditError, Result};
pub use report::WriteMode;
pub use tagmanager::{ConnectorConfig, Credentials, TagManagerClient, TagManagerSource};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of a completed export
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output: PathBuf,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

/// Aggregate everything reachable through `source` and write it to `output`
///
/// Nothing is written unless the aggregation completes.
pub async fn export<S>(
    source: &S,
    options: &AggregateOptions,
    output: &Path,
    mode: WriteMode,
) -> Result<RunSummary>
where
    S: TagManagerSource + ?Sized,
{
    let aggregation = aggregate::collect_records(source, options).await?;
    report::write_report(output, &aggregation.records, mode)?;

    Ok(RunSummary {
        output: output.to_path_buf(),
        stats: aggregation.stats,
    })
}
