//! Peer discovery for chat and internal email recipient selection.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use harborcrm_auth::caps;

use crate::app::{dto::AccountDto, errors, services::AppServices};
use crate::authz;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/peers", get(peers))
}

/// GET /directory/peers
///
/// Other active accounts the actor may discover or message, narrowed to the
/// actor's branch by the partition guard (admins see everyone; actors with
/// no branch see the unfiltered pool).
pub async fn peers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_any(&actor, &[&caps::CHAT_USE, &caps::EMAIL_USE]) {
        return resp;
    }

    match services
        .peers_for(actor.account_id(), actor.role(), actor.branch_id())
        .await
    {
        Ok(peers) => {
            let peers: Vec<AccountDto> = peers.into_iter().map(AccountDto::from).collect();
            (StatusCode::OK, Json(serde_json::json!({ "peers": peers }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
