//! Audit recording layer for mutating routes.
//!
//! Each wrapped route declares an `action × entity_type` pair. The layer
//! observes the outcome of the inner handler and, only when the response
//! status is below 400 and an authenticated actor is present, dispatches an
//! asynchronous append of one audit entry. The response never awaits that
//! write: audit is observability, not correctness, so a slow or failing
//! audit store must not become a slow or failing user-facing request.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use uuid::Uuid;

use harborcrm_core::AuditEntryId;
use harborcrm_infra::{AuditEntry, AuditStore};

use crate::context::ActorContext;

/// Payload capture cap. Mutating requests in this product are small JSON
/// bodies; an oversized body skips capture and recording entirely.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AuditContext {
    pub sink: Arc<dyn AuditStore>,
    pub action: &'static str,
    pub entity_type: &'static str,
}

impl AuditContext {
    pub fn new(sink: Arc<dyn AuditStore>, action: &'static str, entity_type: &'static str) -> Self {
        Self { sink, action, entity_type }
    }
}

/// Middleware entry point, attached per route via
/// `handler.layer(middleware::from_fn_with_state(ctx, audit::record))`.
pub async fn record(State(ctx): State<AuditContext>, req: Request, next: Next) -> Response {
    let actor = req.extensions().get::<ActorContext>().cloned();
    let origin = client_origin(&req);
    let path_entity_id = last_uuid_segment(req.uri().path());

    // Buffer the payload so it can be stored as the entry's "changes" while
    // still reaching the handler untouched.
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_CAPTURE_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let req = Request::from_parts(parts, Body::empty());
            return next.run(req).await;
        }
    };
    let changes = capture_changes(&bytes);
    let req = Request::from_parts(parts, Body::from(bytes));

    let response = next.run(req).await;

    if response.status().as_u16() >= 400 {
        return response;
    }
    let Some(actor) = actor else {
        return response;
    };

    // Entity id: route parameter wins; otherwise look for an `id` field in
    // the (JSON) response body — the create endpoints return one.
    let (res_parts, res_body) = response.into_parts();
    let res_bytes = to_bytes(res_body, MAX_CAPTURE_BYTES).await.unwrap_or_default();
    let entity_id = path_entity_id.or_else(|| response_entity_id(&res_bytes));
    let response = Response::from_parts(res_parts, Body::from(res_bytes.clone()));

    let entry = AuditEntry {
        id: AuditEntryId::new(),
        actor_id: actor.account_id(),
        action: ctx.action.to_string(),
        entity_type: ctx.entity_type.to_string(),
        entity_id,
        changes,
        origin,
        created_at: Utc::now(),
    };

    let sink = ctx.sink.clone();
    tokio::spawn(async move {
        if let Err(e) = sink.append(entry).await {
            tracing::warn!(error = %e, "audit append failed; entry dropped");
        }
    });

    response
}

fn capture_changes(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        return serde_json::json!({});
    }

    serde_json::from_slice(bytes).unwrap_or_else(|_| {
        serde_json::json!({ "raw": String::from_utf8_lossy(bytes) })
    })
}

fn response_entity_id(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    match value.get("id")? {
        serde_json::Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

/// Last UUID-shaped path segment, e.g. `/admin/users/{id}/status`.
fn last_uuid_segment(path: &str) -> Option<String> {
    path.split('/')
        .filter(|segment| Uuid::from_str(segment).is_ok())
        .next_back()
        .map(str::to_string)
}

fn client_origin(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_last_uuid_in_path() {
        let id = Uuid::now_v7();
        let path = format!("/admin/users/{id}/status");
        assert_eq!(last_uuid_segment(&path), Some(id.to_string()));
        assert_eq!(last_uuid_segment("/admin/users"), None);
    }

    #[test]
    fn non_json_payload_is_kept_raw() {
        let value = capture_changes(b"a=1&b=2");
        assert_eq!(value["raw"], "a=1&b=2");
        assert_eq!(capture_changes(b""), serde_json::json!({}));
    }

    #[test]
    fn entity_id_read_from_response_body() {
        assert_eq!(
            response_entity_id(br#"{"id":"abc","name":"x"}"#),
            Some("abc".to_string())
        );
        assert_eq!(response_entity_id(br#"{"name":"x"}"#), None);
        assert_eq!(response_entity_id(b"not json"), None);
    }
}
