use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use harborcrm_core::{BranchId, DomainError, DomainResult};

use crate::Role;

/// An organizational partition with a unique name.
///
/// A branch cannot be deleted while any account still references it — the
/// store layer enforces a referential guard, not a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Branch {
    pub fn create(id: BranchId, name: &str, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("branch name cannot be empty"));
        }
        Ok(Self { id, name, created_at })
    }
}

/// Implemented by anything the branch partition guard can filter
/// (account listings for chat peer discovery, email recipient pickers).
pub trait BranchScoped {
    fn branch_id(&self) -> Option<BranchId>;
}

/// Narrow a candidate listing to the actor's branch.
///
/// - `admin` actors are never filtered.
/// - Actors without a branch assignment see the unfiltered listing; "same
///   branch" is undefined for them, and the product historically treats all
///   unassigned accounts as one shared pool (see DESIGN.md).
///
/// Pure filter, re-evaluated on every request — no caching, so a branch
/// reassignment takes effect on the very next call.
pub fn filter_by_branch<T: BranchScoped>(
    actor_role: Role,
    actor_branch: Option<BranchId>,
    candidates: Vec<T>,
) -> Vec<T> {
    if actor_role.is_admin() {
        return candidates;
    }

    let Some(branch) = actor_branch else {
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|c| c.branch_id() == Some(branch))
        .collect()
}
