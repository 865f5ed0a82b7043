//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store/codec/mailer wiring and boundary orchestration
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
///
/// Request path: session verification (protected routes) → capability and
/// section checks inside handlers → branch narrowing for listings → audit
/// recording for mutations.
pub async fn build_app(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        verifier: services.codec(),
    };

    // Protected routes: require a verified session token.
    let protected = routes::protected_router(services.audit_sink()).layer(
        axum::middleware::from_fn_with_state(auth_state, middleware::auth_middleware),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
