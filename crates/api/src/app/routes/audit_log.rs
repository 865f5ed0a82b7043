//! Audit trail retrieval.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use harborcrm_auth::caps;
use harborcrm_core::AccountId;
use harborcrm_infra::AuditQuery;

use crate::app::{
    dto::{AuditEntryDto, AuditQueryParams},
    errors,
    services::AppServices,
};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/", get(query_audit))
}

/// GET /admin/audit - matching entries, newest first, capped at `limit`
/// (default 100). Restricted to roles with the audit-read capability.
pub async fn query_audit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(params): Query<AuditQueryParams>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::AUDIT_READ) {
        return resp;
    }

    let query = AuditQuery {
        actor_id: params.actor.map(AccountId::from_uuid),
        entity_type: params.entity_type,
        entity_id: params.entity_id,
        from: params.from,
        to: params.to,
        limit: params.limit,
    };

    match services.query_audit(&query).await {
        Ok(entries) => {
            let entries: Vec<AuditEntryDto> =
                entries.into_iter().map(AuditEntryDto::from).collect();
            (StatusCode::OK, Json(serde_json::json!({ "entries": entries }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
