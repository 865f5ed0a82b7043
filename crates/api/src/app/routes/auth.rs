//! Public authentication endpoints (no session required).

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::app::{
    dto::{ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest},
    errors,
    services::AppServices,
};

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.identifier, &body.password).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(LoginResponse {
                token: outcome.token,
                account: outcome.account.into(),
                permissions: outcome.permissions,
            }),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /auth/password/forgot
///
/// Always answers 202 for well-formed requests so callers cannot probe which
/// emails exist. The one exception is an unconfigured mail dispatcher,
/// surfaced as a 503 configuration error.
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> axum::response::Response {
    match services.request_password_reset(&body.email).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "ok" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /auth/password/reset
pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ResetPasswordRequest>,
) -> axum::response::Response {
    match services
        .redeem_password_reset(&body.token, &body.new_password)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "password updated" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
