//! Postgres-backed stores.
//!
//! Schema lives in `migrations/0001_schema.sql`. Every query is a point
//! lookup or single-row write; reset-token consumption is one conditional
//! `DELETE … RETURNING`, which is the atomicity the boundary needs.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use harborcrm_auth::{Account, AccountStatus, Branch, Role};
use harborcrm_core::{AccountId, AuditEntryId, BranchId};

use super::{
    AccountStore, AuditEntry, AuditQuery, AuditStore, BranchStore, ResetToken, ResetTokenStore,
    SectionOverrideStore, StoreError,
};

fn encoding(err: impl core::fmt::Display) -> StoreError {
    StoreError::Encoding(err.to_string())
}

fn account_from_row(row: &sqlx::postgres::PgRow) -> Result<Account, StoreError> {
    let role: String = row.try_get("role").map_err(encoding)?;
    let status: String = row.try_get("status").map_err(encoding)?;

    let status = match status.as_str() {
        "active" => AccountStatus::Active,
        "inactive" => AccountStatus::Inactive,
        other => return Err(StoreError::Encoding(format!("unknown status: {other}"))),
    };

    Ok(Account {
        id: AccountId::from_uuid(row.try_get("id").map_err(encoding)?),
        email: row.try_get("email").map_err(encoding)?,
        display_name: row.try_get("display_name").map_err(encoding)?,
        password_hash: row.try_get("password_hash").map_err(encoding)?,
        role: Role::from_str(&role).map_err(encoding)?,
        department: row.try_get("department").map_err(encoding)?,
        phone: row.try_get("phone").map_err(encoding)?,
        status,
        branch_id: row
            .try_get::<Option<Uuid>, _>("branch_id")
            .map_err(encoding)?
            .map(BranchId::from_uuid),
        last_login_at: row.try_get("last_login_at").map_err(encoding)?,
        created_by: row
            .try_get::<Option<Uuid>, _>("created_by")
            .map_err(encoding)?
            .map(AccountId::from_uuid),
        created_at: row.try_get("created_at").map_err(encoding)?,
        updated_at: row.try_get("updated_at").map_err(encoding)?,
    })
}

const SELECT_ACCOUNT: &str = r#"
SELECT id, email, display_name, password_hash, role, department, phone,
       status, branch_id, last_login_at, created_by, created_at, updated_at
FROM accounts
"#;

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts
                (id, email, display_name, password_hash, role, department, phone,
                 status, branch_id, last_login_at, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(&account.department)
        .bind(&account.phone)
        .bind(account.status.to_string())
        .bind(account.branch_id.map(|b| *b.as_uuid()))
        .bind(account.last_login_at)
        .bind(account.created_by.map(|c| *c.as_uuid()))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE email = $1"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let ident = identifier.trim();
        let row = sqlx::query(&format!(
            "{SELECT_ACCOUNT} WHERE email = $1 OR lower(display_name) = lower($2) LIMIT 1"
        ))
        .bind(ident.to_lowercase())
        .bind(ident)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(&format!("{SELECT_ACCOUNT} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(account_from_row).collect()
    }

    async fn set_status(&self, id: AccountId, status: AccountStatus) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_branch(&self, id: AccountId, branch: Option<BranchId>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET branch_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(branch.map(|b| *b.as_uuid()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: AccountId, hash: String) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn touch_last_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE accounts SET last_login_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count_in_branch(&self, branch: BranchId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT count(*) AS n FROM accounts WHERE branch_id = $1")
            .bind(branch.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let n: i64 = row.try_get("n").map_err(encoding)?;
        Ok(n as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Branches
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgBranchStore {
    pool: PgPool,
}

impl PgBranchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn branch_from_row(row: &sqlx::postgres::PgRow) -> Result<Branch, StoreError> {
    Ok(Branch {
        id: BranchId::from_uuid(row.try_get("id").map_err(encoding)?),
        name: row.try_get("name").map_err(encoding)?,
        created_at: row.try_get("created_at").map_err(encoding)?,
    })
}

#[async_trait]
impl BranchStore for PgBranchStore {
    async fn insert(&self, branch: Branch) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO branches (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(branch.id.as_uuid())
            .bind(&branch.name)
            .bind(branch.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at FROM branches WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(branch_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Branch>, StoreError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM branches ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(branch_from_row).collect()
    }

    async fn delete(&self, id: BranchId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                // FK restriction (accounts still reference the branch).
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                    StoreError::Conflict("branch still has member accounts".to_string())
                }
                other => other.into(),
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Section overrides
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgSectionOverrideStore {
    pool: PgPool,
}

impl PgSectionOverrideStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SectionOverrideStore for PgSectionOverrideStore {
    async fn records_for(&self, account: AccountId) -> Result<HashMap<String, bool>, StoreError> {
        let rows = sqlx::query(
            "SELECT section_key, enabled FROM section_overrides WHERE account_id = $1",
        )
        .bind(account.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut records = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("section_key").map_err(encoding)?;
            let enabled: bool = row.try_get("enabled").map_err(encoding)?;
            records.insert(key, enabled);
        }
        Ok(records)
    }

    async fn replace(
        &self,
        account: AccountId,
        overrides: HashMap<String, bool>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM section_overrides WHERE account_id = $1")
            .bind(account.as_uuid())
            .execute(&mut *tx)
            .await?;

        for (key, enabled) in overrides {
            sqlx::query(
                "INSERT INTO section_overrides (account_id, section_key, enabled) VALUES ($1, $2, $3)",
            )
            .bind(account.as_uuid())
            .bind(key)
            .bind(enabled)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password-reset tokens
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgResetTokenStore {
    pool: PgPool,
}

impl PgResetTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for PgResetTokenStore {
    async fn put(&self, token: ResetToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token, account_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.account_id.as_uuid())
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccountId>, StoreError> {
        // Single statement: the delete is the consumption signal, so two
        // concurrent redemptions cannot both get a row back.
        let row = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE token = $1 AND expires_at > $2
            RETURNING account_id
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            r.try_get::<Uuid, _>("account_id")
                .map(AccountId::from_uuid)
                .map_err(encoding)
        })
        .transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit trail
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO audit_entries
                (id, actor_id, action, entity_type, entity_id, changes, origin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.actor_id.as_uuid())
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.changes)
        .bind(&entry.origin)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, changes, origin, created_at
            FROM audit_entries
            WHERE ($1::uuid IS NULL OR actor_id = $1)
              AND ($2::text IS NULL OR entity_type = $2)
              AND ($3::text IS NULL OR entity_id = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC
            LIMIT $6
            "#,
        )
        .bind(query.actor_id.map(|a| *a.as_uuid()))
        .bind(&query.entity_type)
        .bind(&query.entity_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.effective_limit() as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AuditEntry {
                    id: AuditEntryId::from_uuid(row.try_get("id").map_err(encoding)?),
                    actor_id: AccountId::from_uuid(row.try_get("actor_id").map_err(encoding)?),
                    action: row.try_get("action").map_err(encoding)?,
                    entity_type: row.try_get("entity_type").map_err(encoding)?,
                    entity_id: row.try_get("entity_id").map_err(encoding)?,
                    changes: row.try_get("changes").map_err(encoding)?,
                    origin: row.try_get("origin").map_err(encoding)?,
                    created_at: row.try_get("created_at").map_err(encoding)?,
                })
            })
            .collect()
    }
}
