//! In-memory stores for tests and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use harborcrm_auth::{Account, AccountStatus, Branch};
use harborcrm_core::{AccountId, BranchId};

use super::{
    AccountStore, AuditEntry, AuditQuery, AuditStore, BranchStore, ResetToken, ResetTokenStore,
    SectionOverrideStore, StoreError,
};

fn poisoned() -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: AccountId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Account),
    {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let account = map.get_mut(&id).ok_or(StoreError::NotFound)?;
        f(account);
        account.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&account.id) {
            return Err(StoreError::Conflict("account id already exists".to_string()));
        }
        if map.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        map.insert(account.id, account);
        Ok(())
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let needle = email.trim().to_lowercase();
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|a| a.email == needle).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|a| a.matches_identifier(identifier)).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut accounts: Vec<Account> = map.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    async fn set_status(&self, id: AccountId, status: AccountStatus) -> Result<(), StoreError> {
        self.update(id, |a| a.status = status)
    }

    async fn set_branch(&self, id: AccountId, branch: Option<BranchId>) -> Result<(), StoreError> {
        self.update(id, |a| a.branch_id = branch)
    }

    async fn set_password_hash(&self, id: AccountId, hash: String) -> Result<(), StoreError> {
        self.update(id, |a| a.password_hash = hash)
    }

    async fn touch_last_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(id, |a| a.last_login_at = Some(at))
    }

    async fn count_in_branch(&self, branch: BranchId) -> Result<u64, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|a| a.branch_id == Some(branch)).count() as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Branches
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryBranchStore {
    inner: RwLock<HashMap<BranchId, Branch>>,
}

impl InMemoryBranchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BranchStore for InMemoryBranchStore {
    async fn insert(&self, branch: Branch) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.values().any(|b| b.name == branch.name) {
            return Err(StoreError::Conflict("branch name already exists".to_string()));
        }
        map.insert(branch.id, branch);
        Ok(())
    }

    async fn get(&self, id: BranchId) -> Result<Option<Branch>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Branch>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut branches: Vec<Branch> = map.values().cloned().collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn delete(&self, id: BranchId) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Section overrides
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemorySectionOverrideStore {
    inner: RwLock<HashMap<AccountId, HashMap<String, bool>>>,
}

impl InMemorySectionOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SectionOverrideStore for InMemorySectionOverrideStore {
    async fn records_for(&self, account: AccountId) -> Result<HashMap<String, bool>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&account).cloned().unwrap_or_default())
    }

    async fn replace(
        &self,
        account: AccountId,
        overrides: HashMap<String, bool>,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(account, overrides);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Password-reset tokens
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryResetTokenStore {
    inner: RwLock<HashMap<String, ResetToken>>,
}

impl InMemoryResetTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResetTokenStore for InMemoryResetTokenStore {
    async fn put(&self, token: ResetToken) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.insert(token.token.clone(), token);
        Ok(())
    }

    async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AccountId>, StoreError> {
        // Remove-then-check under one write lock: the second concurrent
        // redemption finds nothing. Expired rows are dead either way, so
        // dropping them on a failed consume is fine.
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.remove(token) {
            Some(row) if row.expires_at > now => Ok(Some(row.account_id)),
            _ => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit trail
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    inner: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.inner.write().map_err(|_| poisoned())?;
        entries.push(entry);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let entries = self.inner.read().map_err(|_| poisoned())?;
        let mut matched: Vec<AuditEntry> =
            entries.iter().filter(|e| query.matches(e)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(query.effective_limit());
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use harborcrm_auth::{NewAccount, Role};
    use harborcrm_core::AuditEntryId;

    fn account(email: &str, name: &str) -> Account {
        Account::create(NewAccount {
            id: AccountId::new(),
            email: email.to_string(),
            display_name: name.to_string(),
            password_hash: "h".to_string(),
            role: Role::Staff,
            department: None,
            phone: None,
            branch_id: None,
            created_by: None,
            created_at: Utc::now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryAccountStore::new();
        store.insert(account("a@co.com", "A")).await.unwrap();

        let err = store.insert(account("a@co.com", "B")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn identifier_lookup_matches_email_and_name() {
        let store = InMemoryAccountStore::new();
        store.insert(account("alice@co.com", "Alice Smith")).await.unwrap();

        assert!(store.find_by_identifier("alice@co.com").await.unwrap().is_some());
        assert!(store.find_by_identifier("ALICE SMITH").await.unwrap().is_some());
        assert!(store.find_by_identifier("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = InMemoryResetTokenStore::new();
        let account_id = AccountId::new();
        let now = Utc::now();

        store
            .put(ResetToken {
                token: "tok".to_string(),
                account_id,
                expires_at: now + Duration::hours(1),
                created_at: now,
            })
            .await
            .unwrap();

        assert_eq!(store.consume("tok", now).await.unwrap(), Some(account_id));
        assert_eq!(store.consume("tok", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let store = InMemoryResetTokenStore::new();
        let now = Utc::now();

        store
            .put(ResetToken {
                token: "tok".to_string(),
                account_id: AccountId::new(),
                expires_at: now - Duration::minutes(1),
                created_at: now - Duration::hours(2),
            })
            .await
            .unwrap();

        assert_eq!(store.consume("tok", now).await.unwrap(), None);
    }

    fn entry(actor: AccountId, action: &str, at: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::new(),
            actor_id: actor,
            action: action.to_string(),
            entity_type: "user".to_string(),
            entity_id: None,
            changes: serde_json::json!({}),
            origin: "127.0.0.1".to_string(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn audit_query_is_newest_first_and_limited() {
        let store = InMemoryAuditStore::new();
        let actor = AccountId::new();
        let base = Utc::now();

        for i in 0..5 {
            store
                .append(entry(actor, "update", base + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let query = AuditQuery { limit: Some(3), ..Default::default() };
        let result = store.query(&query).await.unwrap();

        assert_eq!(result.len(), 3);
        assert!(result.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(result[0].created_at, base + Duration::seconds(4));
    }

    #[tokio::test]
    async fn audit_query_filters_by_actor_and_range() {
        let store = InMemoryAuditStore::new();
        let actor = AccountId::new();
        let other = AccountId::new();
        let base = Utc::now();

        store.append(entry(actor, "create", base)).await.unwrap();
        store.append(entry(other, "create", base)).await.unwrap();
        store
            .append(entry(actor, "delete", base + Duration::hours(2)))
            .await
            .unwrap();

        let query = AuditQuery {
            actor_id: Some(actor),
            to: Some(base + Duration::hours(1)),
            ..Default::default()
        };
        let result = store.query(&query).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].action, "create");
        assert_eq!(result[0].actor_id, actor);
    }
}
