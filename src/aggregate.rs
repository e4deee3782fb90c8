//! Permission Aggregation
//!
//! Walks accounts → containers and accounts → users → container access and
//! flattens the hierarchy into one [`OutputRecord`] per container grant.
//! The per-account steps are pure functions; [`collect_records`] drives them
//! against a [`TagManagerSource`].

use crate::error::{AuditError, Result};
use crate::tagmanager::{Account, Container, TagManagerSource, UserAccess};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// One CSV row: a user's grant on a container, with its account context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputRecord {
    pub account_id: String,
    pub account_name: String,
    pub email_address: String,
    pub account_user_access: String,
    pub container_id: String,
    pub container_name: String,
    pub container_user_access: String,
}

/// What to emit for a user holding account access but no container access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountOnlyPolicy {
    /// Emit nothing for the user
    #[default]
    Skip,
    /// Emit one record with empty container columns
    EmitRow,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub account_only: AccountOnlyPolicy,
}

/// Container id → container name for a single account
#[derive(Debug, Default)]
pub struct ContainerLookup {
    names: HashMap<String, String>,
}

impl ContainerLookup {
    pub fn from_containers(containers: &[Container]) -> Self {
        let names = containers
            .iter()
            .map(|c| (c.container_id.clone(), c.name.clone()))
            .collect();
        Self { names }
    }

    /// Name of `container_id`, or "" when the account has no such container
    pub fn name_of(&self, container_id: &str) -> &str {
        self.names.get(container_id).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Flatten one user's grants into records
pub fn flatten_user(
    account: &Account,
    lookup: &ContainerLookup,
    user: &UserAccess,
    options: &AggregateOptions,
) -> Result<Vec<OutputRecord>> {
    let context = || format!("account {} user {}", account.account_id, user.email_address);

    let account_access = user
        .account_access
        .as_ref()
        .ok_or_else(|| AuditError::MissingField {
            field: "accountAccess",
            context: context(),
        })?;
    let account_permission = account_access
        .permission
        .as_ref()
        .ok_or_else(|| AuditError::MissingField {
            field: "accountAccess.permission",
            context: context(),
        })?
        .to_string();

    let record = |container_id: &str, container_name: &str, container_permission: String| {
        OutputRecord {
            account_id: account.account_id.clone(),
            account_name: account.name.clone(),
            email_address: user.email_address.clone(),
            account_user_access: account_permission.clone(),
            container_id: container_id.to_string(),
            container_name: container_name.to_string(),
            container_user_access: container_permission,
        }
    };

    if user.container_access.is_empty() {
        return Ok(match options.account_only {
            AccountOnlyPolicy::Skip => Vec::new(),
            AccountOnlyPolicy::EmitRow => vec![record("", "", String::new())],
        });
    }

    Ok(user
        .container_access
        .iter()
        .map(|access| {
            record(
                &access.container_id,
                lookup.name_of(&access.container_id),
                access
                    .permission
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            )
        })
        .collect())
}

/// Flatten every user of one account, preserving API order
pub fn flatten_account(
    account: &Account,
    containers: &[Container],
    users: &[UserAccess],
    options: &AggregateOptions,
) -> Result<Vec<OutputRecord>> {
    let lookup = ContainerLookup::from_containers(containers);

    let mut records = Vec::new();
    for user in users {
        records.extend(flatten_user(account, &lookup, user, options)?);
    }
    Ok(records)
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub accounts: usize,
    pub containers: usize,
    pub users: usize,
    pub records: usize,
}

/// Records plus the counters gathered while producing them
#[derive(Debug, Default)]
pub struct Aggregation {
    pub records: Vec<OutputRecord>,
    pub stats: AggregateStats,
}

/// Fetch the whole hierarchy from `source` and flatten it
///
/// Accounts are processed one at a time in API order. Any error aborts the
/// walk; no partial result is returned.
pub async fn collect_records<S>(source: &S, options: &AggregateOptions) -> Result<Aggregation>
where
    S: TagManagerSource + ?Sized,
{
    let accounts = source.list_accounts().await?;
    info!(count = accounts.len(), "Fetched accounts");

    let mut aggregation = Aggregation::default();
    aggregation.stats.accounts = accounts.len();

    for account in &accounts {
        let containers = source.list_containers(&account.account_id).await?;
        let users = source.list_permissions(&account.account_id).await?;

        aggregation.stats.containers += containers.len();
        aggregation.stats.users += users.len();

        if users.is_empty() {
            debug!(account_id = %account.account_id, "No users on account");
            continue;
        }

        let records = flatten_account(account, &containers, &users, options)?;
        debug!(
            account_id = %account.account_id,
            account_name = %account.name,
            users = users.len(),
            records = records.len(),
            "Flattened account"
        );
        aggregation.records.extend(records);
    }

    aggregation.stats.records = aggregation.records.len();
    Ok(aggregation)
}
