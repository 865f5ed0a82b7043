use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use harborcrm_auth::AuthError;
use harborcrm_core::DomainError;
use harborcrm_infra::StoreError;

use crate::app::services::ServiceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Fixed 403 body. Never says which capability was missing.
pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient permissions")
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Auth(e) => auth_error_to_response(e),
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => store_error_to_response(e),
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "unauthenticated")
        }
        AuthError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid credentials",
        ),
        // Deliberately distinct from invalid_credentials (see DESIGN.md).
        AuthError::AccountInactive => json_error(
            StatusCode::UNAUTHORIZED,
            "account_inactive",
            "account is inactive",
        ),
        AuthError::Forbidden => forbidden(),
        AuthError::InvalidOrExpiredToken => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_token",
            "invalid or expired token",
        ),
        AuthError::WeakPassword => json_error(
            StatusCode::BAD_REQUEST,
            "weak_password",
            err.to_string(),
        ),
        // Configuration problem, surfaced for operators; not a security
        // signal for the requesting user.
        AuthError::MailUnavailable => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "mail_unavailable",
            "mail dispatcher unavailable",
        ),
        AuthError::Hashing => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "hashing_error",
            "credential hashing failed",
        ),
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Encoding(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "encoding_error", msg)
        }
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}
