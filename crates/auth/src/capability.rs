use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{AuthError, Role, SessionClaims};

/// Capability identifier.
///
/// Capabilities are coarse-grained named permissions (e.g. `contacts.read`)
/// tested against a role, independent of any specific record. Unknown tokens
/// simply resolve to "not granted".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Well-known capability tokens.
pub mod caps {
    use super::Capability;

    pub const CONTACTS_READ: Capability = Capability::from_static("contacts.read");
    pub const CONTACTS_WRITE: Capability = Capability::from_static("contacts.write");
    pub const ORDERS_READ: Capability = Capability::from_static("orders.read");
    pub const ORDERS_WRITE: Capability = Capability::from_static("orders.write");
    pub const TASKS_READ: Capability = Capability::from_static("tasks.read");
    pub const TASKS_WRITE: Capability = Capability::from_static("tasks.write");
    pub const CALENDAR_READ: Capability = Capability::from_static("calendar.read");
    pub const CALENDAR_WRITE: Capability = Capability::from_static("calendar.write");
    pub const DOCUMENTS_READ: Capability = Capability::from_static("documents.read");
    pub const DOCUMENTS_WRITE: Capability = Capability::from_static("documents.write");
    pub const CHAT_USE: Capability = Capability::from_static("chat.use");
    pub const EMAIL_USE: Capability = Capability::from_static("email.use");
    pub const REPORTS_READ: Capability = Capability::from_static("reports.read");
    pub const SYSTEM_EXPORT: Capability = Capability::from_static("system.export");
    pub const AUDIT_READ: Capability = Capability::from_static("audit.read");
    pub const USERS_READ: Capability = Capability::from_static("admin.users.read");
    pub const USERS_WRITE: Capability = Capability::from_static("admin.users.write");
    pub const BRANCHES_WRITE: Capability = Capability::from_static("admin.branches.write");
    pub const SECTIONS_WRITE: Capability = Capability::from_static("admin.sections.write");
}

/// Fixed role→capability table.
///
/// `admin` is never consulted against this table — `has_capability`
/// short-circuits before reaching it, so the admin slice stays empty.
pub fn role_capabilities(role: Role) -> &'static [Capability] {
    use caps::*;

    const ADMIN: &[Capability] = &[];
    const EXECUTIVE: &[Capability] = &[
        CONTACTS_READ,
        CONTACTS_WRITE,
        ORDERS_READ,
        ORDERS_WRITE,
        TASKS_READ,
        TASKS_WRITE,
        CALENDAR_READ,
        CALENDAR_WRITE,
        DOCUMENTS_READ,
        DOCUMENTS_WRITE,
        CHAT_USE,
        EMAIL_USE,
        REPORTS_READ,
        SYSTEM_EXPORT,
        AUDIT_READ,
        USERS_READ,
    ];
    // Managers also hold the user-directory read, but every record
    // carrying a department label is additionally narrowed by the
    // per-record predicate below.
    const MANAGER: &[Capability] = &[
        CONTACTS_READ,
        CONTACTS_WRITE,
        ORDERS_READ,
        ORDERS_WRITE,
        TASKS_READ,
        TASKS_WRITE,
        CALENDAR_READ,
        CALENDAR_WRITE,
        DOCUMENTS_READ,
        DOCUMENTS_WRITE,
        CHAT_USE,
        EMAIL_USE,
        REPORTS_READ,
        USERS_READ,
    ];
    const STAFF: &[Capability] = &[
        CONTACTS_READ,
        ORDERS_READ,
        TASKS_READ,
        TASKS_WRITE,
        CALENDAR_READ,
        CALENDAR_WRITE,
        DOCUMENTS_READ,
        CHAT_USE,
        EMAIL_USE,
    ];
    const GUEST: &[Capability] = &[CONTACTS_READ, CALENDAR_READ];

    match role {
        Role::Admin => ADMIN,
        Role::Executive => EXECUTIVE,
        Role::Manager => MANAGER,
        Role::Staff => STAFF,
        Role::Guest => GUEST,
    }
}

/// Pure capability check: `admin` holds every capability implicitly, every
/// other role is looked up in the fixed table.
pub fn has_capability(role: Role, capability: &Capability) -> bool {
    if role.is_admin() {
        return true;
    }

    role_capabilities(role)
        .iter()
        .any(|c| c.as_str() == capability.as_str())
}

/// Snapshot of the record fields that per-record authorization looks at.
///
/// Today that is only the department label; the snapshot struct keeps the
/// call sites honest about passing record state rather than just a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceScope<'a> {
    pub department: Option<&'a str>,
}

/// Department narrowing layered on top of the capability table.
///
/// Only managers are narrowed: a record carrying a department label is
/// visible to a manager only when it matches the manager's own label.
/// Records without a label are unaffected. Must run per record.
fn department_permits(role: Role, actor_department: Option<&str>, resource: &ResourceScope<'_>) -> bool {
    if role != Role::Manager {
        return true;
    }

    match resource.department {
        None => true,
        Some(dept) => actor_department
            .map(|own| own.trim() == dept.trim())
            .unwrap_or(false),
    }
}

/// Two-stage authorization: role→capability lookup, then the per-record
/// department predicate when a resource snapshot is supplied.
pub fn authorize(
    claims: &SessionClaims,
    capability: &Capability,
    resource: Option<&ResourceScope<'_>>,
) -> Result<(), AuthError> {
    if !has_capability(claims.role, capability) {
        return Err(AuthError::Forbidden);
    }

    if let Some(resource) = resource {
        if !department_permits(claims.role, claims.department.as_deref(), resource) {
            return Err(AuthError::Forbidden);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use chrono::Utc;
    use harborcrm_core::AccountId;

    fn claims(role: Role, department: Option<&str>) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: AccountId::new(),
            email: "t@example.com".to_string(),
            role,
            department: department.map(str::to_string),
            branch_id: None,
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn admin_holds_every_capability() {
        for cap in ["contacts.read", "system:config", "made.up.token"] {
            assert!(has_capability(Role::Admin, &Capability::new(cap.to_string())));
        }
    }

    #[test]
    fn guest_cannot_touch_system_config() {
        assert!(!has_capability(Role::Guest, &Capability::new("system:config")));
        assert!(!has_capability(Role::Guest, &caps::SYSTEM_EXPORT));
    }

    #[test]
    fn staff_reads_but_does_not_write_contacts() {
        assert!(has_capability(Role::Staff, &caps::CONTACTS_READ));
        assert!(!has_capability(Role::Staff, &caps::CONTACTS_WRITE));
    }

    #[test]
    fn manager_is_scoped_to_own_department() {
        let actor = claims(Role::Manager, Some("sales"));

        let same = ResourceScope { department: Some("sales") };
        let other = ResourceScope { department: Some("support") };
        let unlabeled = ResourceScope { department: None };

        assert!(authorize(&actor, &caps::CONTACTS_READ, Some(&same)).is_ok());
        assert!(authorize(&actor, &caps::CONTACTS_READ, Some(&other)).is_err());
        assert!(authorize(&actor, &caps::CONTACTS_READ, Some(&unlabeled)).is_ok());
    }

    #[test]
    fn department_rule_does_not_narrow_other_roles() {
        let actor = claims(Role::Executive, None);
        let labeled = ResourceScope { department: Some("support") };

        assert!(authorize(&actor, &caps::CONTACTS_READ, Some(&labeled)).is_ok());
    }

    #[test]
    fn missing_capability_is_forbidden_before_scope_runs() {
        let actor = claims(Role::Guest, Some("sales"));
        let scope = ResourceScope { department: Some("sales") };

        assert_eq!(
            authorize(&actor, &caps::ORDERS_WRITE, Some(&scope)),
            Err(AuthError::Forbidden)
        );
    }

    fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        /// Property: the table never grants a capability outside a role's
        /// declared slice, and admin is always granted.
        #[test]
        fn table_is_closed_over_declared_slices(
            role in arb_role(),
            token in "[a-z]{3,10}\\.[a-z]{3,10}",
        ) {
            let cap = Capability::new(token.clone());
            let granted = has_capability(role, &cap);

            if role.is_admin() {
                prop_assert!(granted);
            } else {
                let declared = role_capabilities(role)
                    .iter()
                    .any(|c| c.as_str() == token);
                prop_assert_eq!(granted, declared);
            }
        }
    }
}
