use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::Role;

/// Feature sections whose navigation/API visibility can be toggled per user.
pub const DEFAULT_SECTIONS: &[&str] = &[
    "contacts",
    "orders",
    "tasks",
    "chat",
    "email",
    "calendar",
    "documents",
    "reports",
];

/// Three-state resolution of a section override.
///
/// `Unset` must never be conflated with `Denied`: the absence of a stored
/// record means "allowed". A newly created user with zero configured
/// overrides has full navigational access until an administrator disables
/// sections deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionAccess {
    Granted,
    Denied,
    Unset,
}

impl SectionAccess {
    /// Collapse to the boolean the navigation layer consumes.
    pub fn allowed(self) -> bool {
        !matches!(self, SectionAccess::Denied)
    }
}

/// Resolve a single section against explicit override records.
///
/// Admins resolve `Granted` unconditionally — override rows written for an
/// admin (there should be none, writes are skipped) are ignored.
pub fn section_access(role: Role, key: &str, records: &HashMap<String, bool>) -> SectionAccess {
    if role.is_admin() {
        return SectionAccess::Granted;
    }

    match records.get(key) {
        Some(true) => SectionAccess::Granted,
        Some(false) => SectionAccess::Denied,
        None => SectionAccess::Unset,
    }
}

/// Resolve a set of section keys to the boolean visibility map returned to
/// clients (login response, section endpoints).
pub fn resolve_sections<S: AsRef<str>>(
    role: Role,
    keys: &[S],
    records: &HashMap<String, bool>,
) -> BTreeMap<String, bool> {
    keys.iter()
        .map(|key| {
            let key = key.as_ref();
            (key.to_string(), section_access(role, key, records).allowed())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn no_records() -> HashMap<String, bool> {
        HashMap::new()
    }

    #[test]
    fn absent_record_defaults_to_allowed() {
        let map = resolve_sections(Role::Staff, DEFAULT_SECTIONS, &no_records());
        assert!(map.values().all(|v| *v));
        assert_eq!(map.len(), DEFAULT_SECTIONS.len());
    }

    #[test]
    fn explicit_false_denies_only_that_section() {
        let mut records = no_records();
        records.insert("chat".to_string(), false);

        let map = resolve_sections(Role::Staff, DEFAULT_SECTIONS, &records);
        assert!(!map["chat"]);
        assert!(map["email"]);
        assert!(map["contacts"]);
    }

    #[test]
    fn admin_ignores_stored_records() {
        let mut records = no_records();
        for key in DEFAULT_SECTIONS {
            records.insert((*key).to_string(), false);
        }

        let map = resolve_sections(Role::Admin, DEFAULT_SECTIONS, &records);
        assert!(map.values().all(|v| *v));
    }

    #[test]
    fn unset_is_distinguishable_from_denied() {
        let mut records = no_records();
        records.insert("orders".to_string(), false);
        records.insert("tasks".to_string(), true);

        assert_eq!(
            section_access(Role::Staff, "orders", &records),
            SectionAccess::Denied
        );
        assert_eq!(
            section_access(Role::Staff, "tasks", &records),
            SectionAccess::Granted
        );
        assert_eq!(
            section_access(Role::Staff, "chat", &records),
            SectionAccess::Unset
        );
        assert!(section_access(Role::Staff, "chat", &records).allowed());
    }

    proptest! {
        /// Property: for non-admin roles the resolved boolean equals the
        /// stored record when present and `true` when absent; admin is
        /// always `true`.
        #[test]
        fn resolution_matches_records(
            stored in proptest::collection::hash_map("[a-z]{3,8}", any::<bool>(), 0..6),
            admin in any::<bool>(),
        ) {
            let role = if admin { Role::Admin } else { Role::Guest };
            let keys: Vec<String> = stored
                .keys()
                .cloned()
                .chain(std::iter::once("never-stored".to_string()))
                .collect();

            let map = resolve_sections(role, &keys, &stored);

            for key in &keys {
                let expected = if admin {
                    true
                } else {
                    stored.get(key).copied().unwrap_or(true)
                };
                prop_assert_eq!(map[key], expected);
            }
        }
    }
}
