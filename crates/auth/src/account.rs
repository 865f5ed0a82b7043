//! Account identity model.
//!
//! Accounts are created by an admin action or system bootstrap and are never
//! hard-deleted — deactivation is a status flip, so historical audit entries
//! always resolve to a real actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use harborcrm_core::{AccountId, BranchId, DomainError, DomainResult};

use crate::{BranchScoped, Role};

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account can authenticate and transact.
    #[default]
    Active,
    /// Account cannot authenticate; data and audit references remain.
    Inactive,
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("active"),
            AccountStatus::Inactive => f.write_str("inactive"),
        }
    }
}

/// A user identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Unique, stored lowercase.
    pub email: String,
    pub display_name: String,
    /// bcrypt hash; never serialized out through the API layer.
    pub password_hash: String,
    pub role: Role,
    /// Free-text label, used only by manager-scoped reads.
    pub department: Option<String>,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub branch_id: Option<BranchId>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for account creation; validation happens in [`Account::create`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: AccountId,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<BranchId>,
    pub created_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Validate and construct a new active account.
    ///
    /// Email is normalized to trimmed lowercase; display name is trimmed.
    pub fn create(input: NewAccount) -> DomainResult<Self> {
        let email = input.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }

        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(Self {
            id: input.id,
            email,
            display_name,
            password_hash: input.password_hash,
            role: input.role,
            department: input.department.filter(|d| !d.trim().is_empty()),
            phone: input.phone.filter(|p| !p.trim().is_empty()),
            status: AccountStatus::Active,
            branch_id: input.branch_id,
            last_login_at: None,
            created_by: input.created_by,
            created_at: input.created_at,
            updated_at: input.created_at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Login identifier match: exact email (case-insensitive, since emails
    /// are stored lowercase) or case-insensitive exact display name.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        let ident = identifier.trim();
        self.email == ident.to_lowercase() || self.display_name.eq_ignore_ascii_case(ident)
    }
}

impl BranchScoped for Account {
    fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str, name: &str) -> NewAccount {
        NewAccount {
            id: AccountId::new(),
            email: email.to_string(),
            display_name: name.to_string(),
            password_hash: "$2b$12$hash".to_string(),
            role: Role::Staff,
            department: None,
            phone: None,
            branch_id: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_normalizes_email_and_name() {
        let acc = Account::create(new_account("  Alice@Co.COM ", "  Alice  ")).unwrap();
        assert_eq!(acc.email, "alice@co.com");
        assert_eq!(acc.display_name, "Alice");
        assert_eq!(acc.status, AccountStatus::Active);
        assert!(acc.last_login_at.is_none());
    }

    #[test]
    fn create_rejects_bad_email() {
        assert!(Account::create(new_account("not-an-email", "Alice")).is_err());
        assert!(Account::create(new_account("   ", "Alice")).is_err());
    }

    #[test]
    fn create_rejects_empty_display_name() {
        assert!(Account::create(new_account("a@co.com", "   ")).is_err());
    }

    #[test]
    fn identifier_matches_email_or_display_name() {
        let acc = Account::create(new_account("alice@co.com", "Alice Smith")).unwrap();
        assert!(acc.matches_identifier("ALICE@co.com"));
        assert!(acc.matches_identifier("alice smith"));
        assert!(!acc.matches_identifier("alice"));
    }

    #[test]
    fn blank_department_becomes_none() {
        let mut input = new_account("a@co.com", "A");
        input.department = Some("   ".to_string());
        let acc = Account::create(input).unwrap();
        assert!(acc.department.is_none());
    }
}
