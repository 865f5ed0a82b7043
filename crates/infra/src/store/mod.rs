//! Store traits for the boundary's persistent state.
//!
//! All operations are point lookups or single-row writes; nothing here
//! needs multi-statement transactions except reset-token consumption,
//! which is modeled as one atomic conditional delete.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use harborcrm_auth::{Account, AccountStatus, Branch};
use harborcrm_core::{AccountId, AuditEntryId, BranchId};

pub mod memory;
pub mod postgres;

pub use memory::{
    InMemoryAccountStore, InMemoryAuditStore, InMemoryBranchStore, InMemoryResetTokenStore,
    InMemorySectionOverrideStore,
};
pub use postgres::{
    PgAccountStore, PgAuditStore, PgBranchStore, PgResetTokenStore, PgSectionOverrideStore,
};

/// Default page size for audit queries.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-column collision or referential guard.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,

    /// A stored value could not be decoded into its domain type.
    #[error("encoding: {0}")]
    Encoding(String),

    /// The datastore is unreachable or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. Fails with `Conflict` on duplicate id or email.
    async fn insert(&self, account: Account) -> Result<(), StoreError>;

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Login lookup: exact email match or case-insensitive exact display
    /// name match.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError>;

    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    async fn set_status(&self, id: AccountId, status: AccountStatus) -> Result<(), StoreError>;

    async fn set_branch(&self, id: AccountId, branch: Option<BranchId>) -> Result<(), StoreError>;

    async fn set_password_hash(&self, id: AccountId, hash: String) -> Result<(), StoreError>;

    /// Best-effort last-login stamp; losing a race under concurrent logins
    /// is acceptable.
    async fn touch_last_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Referential guard input for branch deletion.
    async fn count_in_branch(&self, branch: BranchId) -> Result<u64, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Branches
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Insert a new branch. Fails with `Conflict` on duplicate name.
    async fn insert(&self, branch: Branch) -> Result<(), StoreError>;

    async fn get(&self, id: BranchId) -> Result<Option<Branch>, StoreError>;

    async fn list(&self) -> Result<Vec<Branch>, StoreError>;

    /// Remove a branch row. Callers enforce the member guard first; the
    /// schema's `ON DELETE RESTRICT` backs it up.
    async fn delete(&self, id: BranchId) -> Result<(), StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Section overrides
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait SectionOverrideStore: Send + Sync {
    /// Explicit override rows for an account. Absent keys mean "allowed".
    async fn records_for(&self, account: AccountId) -> Result<HashMap<String, bool>, StoreError>;

    /// Replace the account's full override set.
    async fn replace(
        &self,
        account: AccountId,
        overrides: HashMap<String, bool>,
    ) -> Result<(), StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Password-reset tokens
// ─────────────────────────────────────────────────────────────────────────────

/// One-time password-reset token row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToken {
    pub token: String,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn put(&self, token: ResetToken) -> Result<(), StoreError>;

    /// Atomically consume a token: if a row matches and is unexpired,
    /// delete it and return its account — in one step, so two concurrent
    /// redemptions can never both succeed. The delete *is* the consumption
    /// signal.
    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccountId>, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit trail
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable audit record. Append-only: nothing ever updates or deletes one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor_id: AccountId,
    /// Action verb (`create`, `update`, `delete`, …).
    pub action: String,
    /// Entity type the route declared (`user`, `branch`, `section`, …).
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Serialized request payload.
    pub changes: serde_json::Value,
    /// Caller's network origin.
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for audit retrieval. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub actor_id: Option<AccountId>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT)
    }

    pub(crate) fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(actor) = self.actor_id {
            if entry.actor_id != actor {
                return false;
            }
        }
        if let Some(entity_type) = &self.entity_type {
            if &entry.entity_type != entity_type {
                return false;
            }
        }
        if let Some(entity_id) = &self.entity_id {
            if entry.entity_id.as_deref() != Some(entity_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.created_at > to {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Matching entries, newest first, capped at the query limit.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;
}
