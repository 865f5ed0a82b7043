use std::sync::Arc;

use axum::{routing::get, Router};

use harborcrm_infra::AuditStore;

pub mod admin;
pub mod audit_log;
pub mod auth;
pub mod branches;
pub mod directory;
pub mod system;

/// Router for all authenticated endpoints.
pub fn protected_router(audit_sink: Arc<dyn AuditStore>) -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/sections", get(system::my_sections))
        .nest("/directory", directory::router())
        .nest("/admin/users", admin::router(audit_sink.clone()))
        .nest("/admin/branches", branches::router(audit_sink))
        .nest("/admin/audit", audit_log::router())
}
