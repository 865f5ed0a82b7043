//! Admin routes for account management and section overrides.
//!
//! These are the canonical mutating routes the audit layer observes; every
//! write is wrapped with its `action × entity_type` declaration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    handler::Handler,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use harborcrm_auth::{authorize, caps, ResourceScope};
use harborcrm_core::{AccountId, BranchId};
use harborcrm_infra::AuditStore;

use crate::app::{
    dto::{AccountDto, CreateUserRequest, SetBranchRequest, SetSectionsRequest, SetStatusRequest},
    errors,
    services::{AppServices, CreateAccountParams},
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
            post(create_user.layer(audited("create", "user"))).get(list_users),
        )
        .route("/:id", get(get_user))
        .route(
            "/:id/status",
            post(set_status.layer(audited("update", "user"))),
        )
        .route(
            "/:id/branch",
            post(set_branch.layer(audited("update", "user"))),
        )
        .route(
            "/:id/sections",
            put(put_sections.layer(audited("update", "section"))).get(get_sections),
        )
}

fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse::<Uuid>()
        .map(AccountId::from_uuid)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"))
}

/// POST /admin/users - create an account.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<CreateUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_WRITE) {
        return resp;
    }

    let params = CreateAccountParams {
        email: body.email,
        display_name: body.display_name,
        password: body.password,
        role: body.role,
        department: body.department,
        phone: body.phone,
        branch_id: body.branch_id.map(BranchId::from_uuid),
    };

    match services.create_account(Some(actor.account_id()), params).await {
        Ok(account) => {
            (StatusCode::CREATED, Json(AccountDto::from(account))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users - account directory.
///
/// Managers hold the read capability but are narrowed per record: accounts
/// labeled with a different department are dropped from their listing.
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_READ) {
        return resp;
    }

    match services.list_accounts().await {
        Ok(accounts) => {
            let users: Vec<AccountDto> = accounts
                .into_iter()
                .filter(|account| {
                    let scope = ResourceScope { department: account.department.as_deref() };
                    authorize(actor.claims(), &caps::USERS_READ, Some(&scope)).is_ok()
                })
                .map(AccountDto::from)
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "users": users }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_READ) {
        return resp;
    }
    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.get_account(id).await {
        Ok(account) => {
            // Second authorization stage: the record's department snapshot.
            let scope = ResourceScope { department: account.department.as_deref() };
            if let Err(resp) = authz::require_scoped(&actor, &caps::USERS_READ, &scope) {
                return resp;
            }
            (StatusCode::OK, Json(AccountDto::from(account))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /admin/users/:id/status - lifecycle flip; no hard delete exists.
pub async fn set_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<SetStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_WRITE) {
        return resp;
    }
    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.set_account_status(id, body.status).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string(), "status": body.status })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /admin/users/:id/branch - assign or clear the branch reference.
///
/// Outstanding session tokens keep their issuance-time snapshot; listings
/// pick the change up on the next request.
pub async fn set_branch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<SetBranchRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_WRITE) {
        return resp;
    }
    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services
        .set_account_branch(id, body.branch_id.map(BranchId::from_uuid))
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": id.to_string(),
                "branch_id": body.branch_id,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/users/:id/sections - resolved visibility for an account.
pub async fn get_sections(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::USERS_READ) {
        return resp;
    }
    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.resolve_sections_by_id(id).await {
        Ok(sections) => {
            (StatusCode::OK, Json(serde_json::json!({ "sections": sections }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /admin/users/:id/sections - replace the account's override set.
///
/// Overrides can only narrow what a non-admin sees; a write targeting an
/// admin account is silently ignored, never an error.
pub async fn put_sections(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<SetSectionsRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&actor, &caps::SECTIONS_WRITE) {
        return resp;
    }
    let id = match parse_account_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.set_section_overrides(id, body.overrides).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string() })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
