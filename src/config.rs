//! Command-line and environment configuration

use crate::aggregate::{AccountOnlyPolicy, AggregateOptions};
use crate::auth::DEFAULT_SCOPES;
use crate::report::WriteMode;
use crate::tagmanager::{
    ConnectorConfig, Credentials, DEFAULT_API_NAME, DEFAULT_API_ROOT, DEFAULT_API_VERSION,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT: &str = "GoogleTagManagerUserDataList.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Export Google Tag Manager user permissions to CSV
#[derive(Parser, Debug)]
#[command(name = "gtm-user-audit")]
#[command(about = "List every Tag Manager account, container and user grant as CSV", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the service account JSON key
    #[arg(long, env = "GTM_KEY_FILE", required_unless_present = "access_token")]
    pub key_file: Option<PathBuf>,

    /// Pre-minted OAuth access token; takes precedence over a key file
    #[arg(long, env = "GTM_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Destination CSV file
    #[arg(short, long, env = "GTM_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// API root URL
    #[arg(long, env = "GTM_API_ROOT", default_value = DEFAULT_API_ROOT)]
    pub api_root: String,

    /// API name
    #[arg(long, default_value = DEFAULT_API_NAME)]
    pub api_name: String,

    /// API version
    #[arg(long, default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// OAuth scopes to request (comma-separated)
    #[arg(long, env = "GTM_SCOPES", value_delimiter = ',', default_values_t = DEFAULT_SCOPES.map(String::from).to_vec())]
    pub scopes: Vec<String>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "GTM_TIMEOUT", default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Emit a row with empty container columns for users without container access
    #[arg(long)]
    pub account_only_rows: bool,

    /// Write to a temporary file and rename it into place
    #[arg(long)]
    pub atomic: bool,

    /// Run summary format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn connector_config(&self) -> ConnectorConfig {
        let credentials = match (&self.access_token, &self.key_file) {
            (Some(token), _) => Credentials::AccessToken(token.clone()),
            (None, Some(path)) => Credentials::KeyFile(path.clone()),
            // clap enforces one of the two
            (None, None) => Credentials::KeyFile(PathBuf::new()),
        };

        ConnectorConfig {
            api_root: self.api_root.clone(),
            api_name: self.api_name.clone(),
            api_version: self.api_version.clone(),
            scopes: self
                .scopes
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            credentials,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            account_only: if self.account_only_rows {
                AccountOnlyPolicy::EmitRow
            } else {
                AccountOnlyPolicy::Skip
            },
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.atomic {
            WriteMode::Atomic
        } else {
            WriteMode::InPlace
        }
    }
}
