//! Service wiring and boundary orchestration.
//!
//! `AppServices` owns the store handles, the token codec, and the mail
//! collaborator, and exposes the operations the routes call. Policy itself
//! (capability table, section resolution, branch filter) stays in
//! `harborcrm-auth`; this layer composes it with storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;

use harborcrm_auth::{
    filter_by_branch, generate_reset_token, hash_password, resolve_sections, session_claims_for,
    validate_new_password, verify_password, Account, AccountStatus, AuthError, Branch,
    Hs256TokenCodec, NewAccount, Role, DEFAULT_SECTIONS, RESET_TOKEN_TTL_MINUTES,
};
use harborcrm_core::{AccountId, BranchId, DomainError};
use harborcrm_infra::{
    store::{
        InMemoryAccountStore, InMemoryAuditStore, InMemoryBranchStore, InMemoryResetTokenStore,
        InMemorySectionOverrideStore, PgAccountStore, PgAuditStore, PgBranchStore,
        PgResetTokenStore, PgSectionOverrideStore,
    },
    AccountStore, AuditEntry, AuditQuery, AuditStore, BranchStore, MailDispatcher, ResetToken,
    ResetTokenStore, SectionOverrideStore, StoreError, UnconfiguredMailer,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Successful login result: the signed token plus everything the client
/// renders immediately (profile and resolved section visibility).
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub account: Account,
    pub permissions: BTreeMap<String, bool>,
}

#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub branch_id: Option<BranchId>,
}

pub struct AppServices {
    accounts: Arc<dyn AccountStore>,
    branches: Arc<dyn BranchStore>,
    sections: Arc<dyn SectionOverrideStore>,
    reset_tokens: Arc<dyn ResetTokenStore>,
    audit: Arc<dyn AuditStore>,
    mailer: Arc<dyn MailDispatcher>,
    codec: Arc<Hs256TokenCodec>,
}

impl AppServices {
    /// In-memory wiring (dev/test). Mail stays unconfigured — a legitimate
    /// operating mode until a reset is actually requested.
    pub fn in_memory(token_secret: &str) -> Self {
        Self::in_memory_with_mailer(token_secret, Arc::new(UnconfiguredMailer))
    }

    pub fn in_memory_with_mailer(token_secret: &str, mailer: Arc<dyn MailDispatcher>) -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountStore::new()),
            branches: Arc::new(InMemoryBranchStore::new()),
            sections: Arc::new(InMemorySectionOverrideStore::new()),
            reset_tokens: Arc::new(InMemoryResetTokenStore::new()),
            audit: Arc::new(InMemoryAuditStore::new()),
            mailer,
            codec: Arc::new(Hs256TokenCodec::new(token_secret.as_bytes())),
        }
    }

    /// Postgres wiring (see `crates/infra/migrations/0001_schema.sql`).
    pub fn postgres(pool: sqlx::PgPool, token_secret: &str, mailer: Arc<dyn MailDispatcher>) -> Self {
        Self {
            accounts: Arc::new(PgAccountStore::new(pool.clone())),
            branches: Arc::new(PgBranchStore::new(pool.clone())),
            sections: Arc::new(PgSectionOverrideStore::new(pool.clone())),
            reset_tokens: Arc::new(PgResetTokenStore::new(pool.clone())),
            audit: Arc::new(PgAuditStore::new(pool)),
            mailer,
            codec: Arc::new(Hs256TokenCodec::new(token_secret.as_bytes())),
        }
    }

    pub fn codec(&self) -> Arc<Hs256TokenCodec> {
        self.codec.clone()
    }

    pub fn audit_sink(&self) -> Arc<dyn AuditStore> {
        self.audit.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session issuance
    // ─────────────────────────────────────────────────────────────────────

    /// Verify credentials and issue a session token.
    ///
    /// Identifier lookup runs first, then the status check, then the hash
    /// verification — so an inactive account answers `AccountInactive`
    /// rather than the generic failure. That ordering reproduces the
    /// product's observed behavior (tracked as a hardening gap).
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, ServiceError> {
        let account = self
            .accounts
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !account.is_active() {
            return Err(AuthError::AccountInactive.into());
        }

        if !verify_password(password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials.into());
        }

        let now = Utc::now();

        // Best-effort: a lost race between concurrent logins only costs a
        // slightly stale timestamp.
        if let Err(e) = self.accounts.touch_last_login(account.id, now).await {
            tracing::debug!(error = %e, account = %account.id, "last-login stamp skipped");
        }

        let claims = session_claims_for(&account, now);
        let token = self.codec.issue(&claims).map_err(ServiceError::Auth)?;
        let permissions = self.resolve_sections_for(&account).await?;

        Ok(LoginOutcome { token, account, permissions })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Password reset
    // ─────────────────────────────────────────────────────────────────────

    /// Mint and persist a single-use reset token for an account.
    pub async fn issue_reset_token(&self, account_id: AccountId) -> Result<String, ServiceError> {
        let now = Utc::now();
        let token = generate_reset_token();

        self.reset_tokens
            .put(ResetToken {
                token: token.clone(),
                account_id,
                expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
                created_at: now,
            })
            .await?;

        Ok(token)
    }

    /// Start a password reset.
    ///
    /// Succeeds silently for unknown emails (no account enumeration). For a
    /// known account the token is persisted and dispatched via the mail
    /// collaborator; an unavailable dispatcher surfaces `MailUnavailable`
    /// — only after the account lookup, which narrows the enumeration
    /// guarantee to deployments with mail configured (see DESIGN.md).
    pub async fn request_password_reset(&self, email: &str) -> Result<(), ServiceError> {
        let Some(account) = self.accounts.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self.issue_reset_token(account.id).await?;

        let body = format!(
            "A password reset was requested for your account.\n\
             Use this single-use token within {RESET_TOKEN_TTL_MINUTES} minutes: {token}\n\
             If you did not request a reset, ignore this message."
        );

        self.mailer
            .send(&account.email, "Password reset", &body)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "reset mail could not be dispatched");
                ServiceError::Auth(AuthError::MailUnavailable)
            })?;

        Ok(())
    }

    /// Redeem a reset token. Consumption is atomic: of two concurrent
    /// redemptions with the same token, exactly one can succeed.
    pub async fn redeem_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        validate_new_password(new_password).map_err(ServiceError::Auth)?;

        let account_id = self
            .reset_tokens
            .consume(token, Utc::now())
            .await?
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let hash = hash_password(new_password).map_err(ServiceError::Auth)?;
        self.accounts.set_password_hash(account_id, hash).await?;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Section overrides
    // ─────────────────────────────────────────────────────────────────────

    /// Resolve section visibility for an account.
    ///
    /// Admins resolve all-true without touching storage; for everyone else
    /// a missing record means "allowed" (default-allow).
    pub async fn resolve_sections_for(
        &self,
        account: &Account,
    ) -> Result<BTreeMap<String, bool>, ServiceError> {
        if account.role.is_admin() {
            return Ok(DEFAULT_SECTIONS
                .iter()
                .map(|key| ((*key).to_string(), true))
                .collect());
        }

        let records = self.sections.records_for(account.id).await?;
        Ok(resolve_sections(account.role, DEFAULT_SECTIONS, &records))
    }

    pub async fn resolve_sections_by_id(
        &self,
        account_id: AccountId,
    ) -> Result<BTreeMap<String, bool>, ServiceError> {
        let account = self
            .accounts
            .get(account_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        self.resolve_sections_for(&account).await
    }

    /// Replace an account's full override set. A write targeting an admin
    /// account is silently skipped — never an error.
    pub async fn set_section_overrides(
        &self,
        target: AccountId,
        overrides: std::collections::HashMap<String, bool>,
    ) -> Result<(), ServiceError> {
        let account = self
            .accounts
            .get(target)
            .await?
            .ok_or(DomainError::NotFound)?;

        if account.role.is_admin() {
            tracing::debug!(account = %target, "section override write ignored for admin");
            return Ok(());
        }

        self.sections.replace(target, overrides).await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────

    pub async fn create_account(
        &self,
        created_by: Option<AccountId>,
        params: CreateAccountParams,
    ) -> Result<Account, ServiceError> {
        validate_new_password(&params.password).map_err(ServiceError::Auth)?;

        if let Some(branch) = params.branch_id {
            self.branches
                .get(branch)
                .await?
                .ok_or_else(|| DomainError::validation("branch does not exist"))?;
        }

        let hash = hash_password(&params.password).map_err(ServiceError::Auth)?;

        let account = Account::create(NewAccount {
            id: AccountId::new(),
            email: params.email,
            display_name: params.display_name,
            password_hash: hash,
            role: params.role,
            department: params.department,
            phone: params.phone,
            branch_id: params.branch_id,
            created_by,
            created_at: Utc::now(),
        })?;

        self.accounts.insert(account.clone()).await?;
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, ServiceError> {
        self.accounts
            .get(id)
            .await?
            .ok_or(DomainError::NotFound.into())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, ServiceError> {
        Ok(self.accounts.list().await?)
    }

    /// Lifecycle flip; accounts are never hard-deleted.
    pub async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<(), ServiceError> {
        Ok(self.accounts.set_status(id, status).await?)
    }

    /// Reassign (or clear) an account's branch. Outstanding session tokens
    /// keep the old snapshot; listings pick the change up on the next call.
    pub async fn set_account_branch(
        &self,
        id: AccountId,
        branch: Option<BranchId>,
    ) -> Result<(), ServiceError> {
        if let Some(branch) = branch {
            self.branches
                .get(branch)
                .await?
                .ok_or_else(|| DomainError::validation("branch does not exist"))?;
        }
        Ok(self.accounts.set_branch(id, branch).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Branches
    // ─────────────────────────────────────────────────────────────────────

    pub async fn create_branch(&self, name: &str) -> Result<Branch, ServiceError> {
        let branch = Branch::create(BranchId::new(), name, Utc::now())?;
        self.branches.insert(branch.clone()).await?;
        Ok(branch)
    }

    pub async fn list_branches(&self) -> Result<Vec<Branch>, ServiceError> {
        Ok(self.branches.list().await?)
    }

    /// Delete a branch unless any account still references it.
    pub async fn delete_branch(&self, id: BranchId) -> Result<(), ServiceError> {
        self.branches.get(id).await?.ok_or(DomainError::NotFound)?;

        let members = self.accounts.count_in_branch(id).await?;
        if members > 0 {
            return Err(DomainError::conflict(format!(
                "branch still has {members} member account(s)"
            ))
            .into());
        }

        Ok(self.branches.delete(id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Directory (chat peers / mail recipients)
    // ─────────────────────────────────────────────────────────────────────

    /// Other active accounts the actor may discover, narrowed by branch.
    pub async fn peers_for(
        &self,
        actor_id: AccountId,
        actor_role: Role,
        actor_branch: Option<BranchId>,
    ) -> Result<Vec<Account>, ServiceError> {
        let candidates: Vec<Account> = self
            .accounts
            .list()
            .await?
            .into_iter()
            .filter(|a| a.id != actor_id && a.is_active())
            .collect();

        Ok(filter_by_branch(actor_role, actor_branch, candidates))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────

    pub async fn query_audit(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, ServiceError> {
        Ok(self.audit.query(query).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bootstrap
    // ─────────────────────────────────────────────────────────────────────

    /// Ensure an admin account exists (first-run bootstrap). Returns the
    /// created account, or `None` when the email is already registered.
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, ServiceError> {
        if self.accounts.find_by_email(email).await?.is_some() {
            return Ok(None);
        }

        let account = self
            .create_account(
                None,
                CreateAccountParams {
                    email: email.to_string(),
                    display_name: "Administrator".to_string(),
                    password: password.to_string(),
                    role: Role::Admin,
                    department: None,
                    phone: None,
                    branch_id: None,
                },
            )
            .await?;

        tracing::info!(account = %account.id, %email, "bootstrap admin account created");
        Ok(Some(account))
    }
}
