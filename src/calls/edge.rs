//! Edge-delivery (personalization) call.

use chrono::{DateTime, Utc};
use http::Method;
use serde_json::json;

use super::dispatch;
use crate::audit::AuditLog;
use crate::config::ReplayConfig;
use crate::replay::ReplayResult;
use crate::session::{RequestBody, RequestDescriptor, ResponseRecord, Session, call_headers};

pub const EDGE_TAG: &str = "mbox";

/// Builds the delivery request. An empty or missing `raw_body` is replaced by
/// a page-load payload whose request id is derived from `now`.
pub fn edge_delivery_request(
    config: &ReplayConfig,
    raw_body: Option<&str>,
    now: DateTime<Utc>,
) -> ReplayResult<RequestDescriptor> {
    let body = match raw_body.filter(|body| !body.is_empty()) {
        Some(body) => body.to_string(),
        None => json!({
            "requestId": format!("simulated-{}", now.timestamp()),
            "context": {
                "channel": "web",
                "userAgent": config.user_agent,
                "address": {"url": config.page_url},
            },
        })
        .to_string(),
    };

    Ok(RequestDescriptor {
        tag: EDGE_TAG,
        method: Method::POST,
        url: config.edge_url.clone(),
        headers: call_headers("text/plain")?,
        body: RequestBody::Raw(body),
    })
}

pub async fn call_edge_delivery(
    session: &Session,
    log: &AuditLog,
    raw_body: Option<&str>,
) -> ReplayResult<ResponseRecord> {
    let request = edge_delivery_request(session.config(), raw_body, Utc::now())?;
    dispatch(session, log, &request)
        .await
        .inspect_err(|err| log.error(&format!("[{EDGE_TAG}] request error: {err}")))
}
