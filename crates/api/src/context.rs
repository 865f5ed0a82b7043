use harborcrm_auth::{Role, SessionClaims};
use harborcrm_core::{AccountId, BranchId};

/// Verified actor identity for a request.
///
/// Carries the token's claims snapshot; it is inserted by the auth
/// middleware and must be present for all protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    claims: SessionClaims,
}

impl ActorContext {
    pub fn new(claims: SessionClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }

    pub fn account_id(&self) -> AccountId {
        self.claims.sub
    }

    pub fn role(&self) -> Role {
        self.claims.role
    }

    pub fn branch_id(&self) -> Option<BranchId> {
        self.claims.branch_id
    }

    pub fn department(&self) -> Option<&str> {
        self.claims.department.as_deref()
    }
}
