use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::{errors, services::AppServices};
use crate::context::ActorContext;

/// GET /health - liveness, unauthenticated.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /whoami - echo the verified claims snapshot.
pub async fn whoami(Extension(actor): Extension<ActorContext>) -> impl IntoResponse {
    let claims = actor.claims();
    Json(serde_json::json!({
        "account_id": claims.sub.to_string(),
        "email": claims.email,
        "role": claims.role,
        "department": claims.department,
        "branch_id": claims.branch_id.map(|b| b.to_string()),
        "expires_at": claims.expires_at,
    }))
}

/// GET /sections - the actor's own resolved section visibility.
pub async fn my_sections(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    match services.resolve_sections_by_id(actor.account_id()).await {
        Ok(sections) => {
            (StatusCode::OK, Json(serde_json::json!({ "sections": sections }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
