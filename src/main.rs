//! Tag Manager User Audit
//!
//! Exports every account, container and user grant visible to a service
//! account as a CSV file.
//!
//! # Usage
//! ```bash
//! # Service account key, default output file
//! gtm-user-audit --key-file /secrets/gtm-audit.json
//!
//! # Custom destination, one row for account-only users, JSON summary
//! GTM_KEY_FILE=/secrets/gtm-audit.json \
//! gtm-user-audit -o users.csv --account-only-rows --format json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gtm_user_audit::config::{Cli, OutputFormat};
use gtm_user_audit::TagManagerClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging: --verbose wins, then RUST_LOG, then INFO
    let filter = if cli.verbose {
        EnvFilter::new("info,gtm_user_audit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("🚀 Tag Manager user audit starting...");

    let connector = cli.connector_config();
    info!("🔐 Authenticating ({} scopes)", connector.scopes.len());
    let client = TagManagerClient::connect(&connector)
        .await
        .context("Failed to connect to the Tag Manager API")?;

    info!("📋 Collecting permissions");
    let summary = gtm_user_audit::export(
        &client,
        &cli.aggregate_options(),
        &cli.output,
        cli.write_mode(),
    )
    .await
    .with_context(|| format!("Failed to export permissions to {}", cli.output.display()))?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Text => {
            info!(
                "✅ Wrote {} rows from {} accounts ({} users, {} containers) to {}",
                summary.stats.records,
                summary.stats.accounts,
                summary.stats.users,
                summary.stats.containers,
                summary.output.display()
            );
        }
    }

    Ok(())
}
