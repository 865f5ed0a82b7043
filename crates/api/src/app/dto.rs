//! Request/response DTOs and JSON mapping helpers.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use harborcrm_auth::{Account, Branch, Role};
use harborcrm_infra::AuditEntry;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email, or case-insensitive exact display name.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// `active` or `inactive`.
    pub status: harborcrm_auth::AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetBranchRequest {
    /// `null` clears the assignment.
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SetSectionsRequest {
    /// Full replacement set of explicit overrides for the account.
    pub overrides: HashMap<String, bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub actor: Option<Uuid>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public account profile; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub branch_id: Option<Uuid>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: *account.id.as_uuid(),
            email: account.email,
            display_name: account.display_name,
            role: account.role,
            department: account.department,
            phone: account.phone,
            status: account.status.to_string(),
            branch_id: account.branch_id.map(|b| *b.as_uuid()),
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: AccountDto,
    /// Resolved section visibility; unset sections default to `true`.
    pub permissions: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct BranchDto {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Branch> for BranchDto {
    fn from(branch: Branch) -> Self {
        Self {
            id: *branch.id.as_uuid(),
            name: branch.name,
            created_at: branch.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditEntryDto {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub changes: serde_json::Value,
    pub origin: String,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEntry> for AuditEntryDto {
    fn from(entry: AuditEntry) -> Self {
        Self {
            id: *entry.id.as_uuid(),
            actor_id: *entry.actor_id.as_uuid(),
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            changes: entry.changes,
            origin: entry.origin,
            created_at: entry.created_at,
        }
    }
}
