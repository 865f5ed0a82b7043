//! Branch administration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    handler::Handler,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use uuid::Uuid;

use harborcrm_auth::caps;
use harborcrm_core::BranchId;
use harborcrm_infra::AuditStore;

use crate::app::{
    dto::{BranchDto, CreateBranchRequest},
    errors,
    services::AppServices,
};
use crate::audit::{self, AuditContext};
use crate::authz;
use crate::context::ActorContext;

pub fn router(sink: Arc<dyn AuditStore>) -> Router {
    let audited = move |action: &'static str, entity: &'static str| {
        from_fn_with_state(AuditContext::new(sink.clone(), action, entity), audit::record)
    };

    Router::new()
        .route(
            "/",
            post(create_branch.layer(audited("create", "branch"))).get(list_branches),
        )
        .route(
            "/:id",
            delete(delete_branch.layer(audited("delete", "branch"))),
        )
}

/// POST /admin/branches
pub async fn create_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CreateBranchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::BRANCHES_WRITE) {
        return resp;
    }

    match services.create_branch(&body.name).await {
        Ok(branch) => (StatusCode::CREATED, Json(BranchDto::from(branch))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/branches
pub async fn list_branches(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_READ) {
        return resp;
    }

    match services.list_branches().await {
        Ok(branches) => {
            let branches: Vec<BranchDto> = branches.into_iter().map(BranchDto::from).collect();
            (StatusCode::OK, Json(serde_json::json!({ "branches": branches }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /admin/branches/:id
///
/// Referential guard, not a cascade: fails with a conflict while any
/// account still references the branch.
pub async fn delete_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::BRANCHES_WRITE) {
        return resp;
    }

    let id = match id.parse::<Uuid>() {
        Ok(id) => BranchId::from_uuid(id),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid branch id");
        }
    };

    match services.delete_branch(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string(), "deleted": true })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
