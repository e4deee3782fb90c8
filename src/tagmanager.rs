//! Google Tag Manager API Client
//!
//! Typed wrapper over the three read-only list calls the audit needs:
//! accounts, containers per account, and user permissions per account.
//! Collections the API omits decode as empty lists.

use crate::auth::{self, AccessToken};
use crate::error::{AuditError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_ROOT: &str = "https://www.googleapis.com";
pub const DEFAULT_API_NAME: &str = "tagmanager";
pub const DEFAULT_API_VERSION: &str = "v1";

const USER_AGENT: &str = concat!("gtm-user-audit/", env!("CARGO_PKG_VERSION"));

// ============================================================
// API Response Types
// ============================================================

/// Treat an explicit JSON `null` the same as an absent key
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, deserialize_with = "nullable")]
    pub container_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

/// An access level, either a single role or a set of rights
///
/// Newer responses carry `"admin"`/`"user"`/`"edit"`, older ones a list
/// such as `["read", "edit"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Permission {
    Level(String),
    Set(Vec<String>),
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Level(level) => write!(f, "{}", level),
            Permission::Set(rights) => write!(f, "{}", rights.join("|")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountAccess {
    #[serde(default)]
    pub permission: Option<Permission>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerAccess {
    #[serde(default, deserialize_with = "nullable")]
    pub container_id: String,
    #[serde(default)]
    pub permission: Option<Permission>,
}

/// One user's grants on an account
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccess {
    #[serde(default, deserialize_with = "nullable")]
    pub email_address: String,
    #[serde(default)]
    pub account_access: Option<AccountAccess>,
    #[serde(default, deserialize_with = "nullable")]
    pub container_access: Vec<ContainerAccess>,
}

#[derive(Debug, Deserialize)]
struct ListAccountsResponse {
    #[serde(default, deserialize_with = "nullable")]
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct ListContainersResponse {
    #[serde(default, deserialize_with = "nullable")]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPermissionsResponse {
    #[serde(default, deserialize_with = "nullable")]
    user_access: Vec<UserAccess>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================
// Source Trait
// ============================================================

/// The three hierarchical list operations the aggregation consumes
#[async_trait]
pub trait TagManagerSource: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn list_containers(&self, account_id: &str) -> Result<Vec<Container>>;

    async fn list_permissions(&self, account_id: &str) -> Result<Vec<UserAccess>>;
}

// ============================================================
// Connector Configuration
// ============================================================

/// How the connector proves its identity
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Service-account JSON key, exchanged for a token at connect time
    KeyFile(PathBuf),
    /// Pre-minted bearer token, used as is
    AccessToken(String),
}

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub api_root: String,
    pub api_name: String,
    pub api_version: String,
    pub scopes: Vec<String>,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl ConnectorConfig {
    /// Config for the Tag Manager v1 API with the default scopes
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_root: DEFAULT_API_ROOT.to_string(),
            api_name: DEFAULT_API_NAME.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            scopes: auth::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            credentials,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// `{api_root}/{api_name}/{api_version}`
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_root.trim_end_matches('/'),
            self.api_name.trim_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}

// ============================================================
// Client Implementation
// ============================================================

/// Authenticated handle bound to one API name and version
pub struct TagManagerClient {
    client: Client,
    base_url: String,
    token: AccessToken,
}

impl TagManagerClient {
    /// Build the HTTP client, obtain a token and bind to the configured API
    pub async fn connect(config: &ConnectorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|source| AuditError::Request {
                endpoint: "client builder".to_string(),
                source,
            })?;

        let token = match &config.credentials {
            Credentials::KeyFile(path) => {
                auth::fetch_token(&client, path, &config.scopes).await?
            }
            Credentials::AccessToken(token) => {
                if token.trim().is_empty() {
                    return Err(AuditError::Authentication(
                        "access token is empty".to_string(),
                    ));
                }
                debug!("Using pre-minted access token");
                AccessToken::new(token.trim())
            }
        };

        let base_url = config.base_url();
        info!(base_url = %base_url, "Connected to Tag Manager API");

        Ok(Self::with_token(client, base_url, token))
    }

    pub fn with_token(client: Client, base_url: impl Into<String>, token: AccessToken) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(|source| AuditError::Request {
                endpoint: path.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| AuditError::Request {
            endpoint: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{} ({})", envelope.error.message, code),
                    None => envelope.error.message,
                },
                Err(_) => body,
            };

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(AuditError::Authentication(format!(
                    "{} returned {}: {}",
                    path, status, message
                )));
            }

            return Err(AuditError::RemoteApi {
                endpoint: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| AuditError::RemoteApi {
            endpoint: path.to_string(),
            status: status.as_u16(),
            message: format!("unexpected response body: {}", e),
        })
    }
}

#[async_trait]
impl TagManagerSource for TagManagerClient {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let response: ListAccountsResponse = self.get_json("accounts").await?;
        debug!(count = response.accounts.len(), "Listed accounts");
        Ok(response.accounts)
    }

    async fn list_containers(&self, account_id: &str) -> Result<Vec<Container>> {
        let path = format!("accounts/{}/containers", account_id);
        let response: ListContainersResponse = self.get_json(&path).await?;
        debug!(account_id = %account_id, count = response.containers.len(), "Listed containers");
        Ok(response.containers)
    }

    async fn list_permissions(&self, account_id: &str) -> Result<Vec<UserAccess>> {
        let path = format!("accounts/{}/permissions", account_id);
        let response: ListPermissionsResponse = self.get_json(&path).await?;
        debug!(account_id = %account_id, count = response.user_access.len(), "Listed permissions");
        Ok(response.user_access)
    }
}
