//! Request-level authorization guard.
//!
//! Enforced at the top of handlers, before any storage work, while keeping
//! the policy itself in `harborcrm-auth`. Rejections never name the missing
//! capability — callers only learn "insufficient permissions".

use axum::response::Response;

use harborcrm_auth::{authorize, Capability, ResourceScope};

use crate::app::errors;
use crate::context::ActorContext;

/// Require a capability for the acting account.
pub fn require(actor: &ActorContext, capability: &Capability) -> Result<(), Response> {
    authorize(actor.claims(), capability, None).map_err(|_| errors::forbidden())
}

/// Require any one of the given capabilities.
pub fn require_any(actor: &ActorContext, capabilities: &[&Capability]) -> Result<(), Response> {
    if capabilities
        .iter()
        .any(|cap| authorize(actor.claims(), cap, None).is_ok())
    {
        Ok(())
    } else {
        Err(errors::forbidden())
    }
}

/// Require a capability against a specific record snapshot (runs the
/// per-record department predicate for managers).
pub fn require_scoped(
    actor: &ActorContext,
    capability: &Capability,
    resource: &ResourceScope<'_>,
) -> Result<(), Response> {
    authorize(actor.claims(), capability, Some(resource)).map_err(|_| errors::forbidden())
}
