//! Coupon webhook and its echo.
//!
//! Neither call fails the run: a transport error or a body that is not a
//! JSON object is logged and reported as `None`.

use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use super::dispatch;
use crate::audit::AuditLog;
use crate::config::ReplayConfig;
use crate::replay::ReplayResult;
use crate::session::{RequestBody, RequestDescriptor, Session, call_headers};

pub const WEBHOOK_TAG: &str = "n8n";
pub const ECHO_TAG: &str = "n8n-echo";

/// JSON object returned by the webhook.
pub type WebhookReply = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<String>,
}

impl WebhookPayload {
    /// Correlation id when known, plus an existing coupon when non-empty.
    pub fn new(cid: Option<&str>, existing_coupon: Option<&str>) -> Self {
        Self {
            cid: cid.map(str::to_string),
            coupon: existing_coupon
                .filter(|coupon| !coupon.is_empty())
                .map(str::to_string),
        }
    }
}

pub fn webhook_request(
    config: &ReplayConfig,
    tag: &'static str,
    payload: &WebhookPayload,
) -> ReplayResult<RequestDescriptor> {
    Ok(RequestDescriptor {
        tag,
        method: Method::POST,
        url: config.webhook_url.clone(),
        headers: call_headers("application/json")?,
        body: RequestBody::Raw(serde_json::to_string(payload)?),
    })
}

/// Asks the webhook for a coupon.
pub async fn call_webhook(
    session: &Session,
    log: &AuditLog,
    cid: Option<&str>,
    existing_coupon: Option<&str>,
) -> Option<WebhookReply> {
    post(session, log, WEBHOOK_TAG, &WebhookPayload::new(cid, existing_coupon)).await
}

/// Reports a received coupon back to the webhook. Skipped for empty coupons.
pub async fn echo_coupon(session: &Session, log: &AuditLog, coupon: &str) -> Option<WebhookReply> {
    if coupon.is_empty() {
        return None;
    }
    let payload = WebhookPayload {
        cid: None,
        coupon: Some(coupon.to_string()),
    };
    post(session, log, ECHO_TAG, &payload).await
}

async fn post(
    session: &Session,
    log: &AuditLog,
    tag: &'static str,
    payload: &WebhookPayload,
) -> Option<WebhookReply> {
    let request = match webhook_request(session.config(), tag, payload) {
        Ok(request) => request,
        Err(err) => {
            log.error(&format!("[{tag}] invalid request: {err}"));
            return None;
        }
    };

    let response = match dispatch(session, log, &request).await {
        Ok(response) => response,
        Err(err) => {
            log.error(&format!("[{tag}] connection error: {err}"));
            return None;
        }
    };

    match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Object(reply)) => Some(reply),
        Ok(_) | Err(_) => {
            log.error(&format!("[{tag}] response not JSON"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_absent_fields() {
        let body = serde_json::to_string(&WebhookPayload::new(None, None)).unwrap();
        assert_eq!(body, "{}");

        let body = serde_json::to_string(&WebhookPayload::new(Some("1.2"), Some(""))).unwrap();
        assert_eq!(body, r#"{"cid":"1.2"}"#);

        let body = serde_json::to_string(&WebhookPayload::new(Some("1.2"), Some("OLD"))).unwrap();
        assert_eq!(body, r#"{"cid":"1.2","coupon":"OLD"}"#);
    }

    #[test]
    fn request_posts_json_to_webhook() {
        let config = ReplayConfig::default();
        let request =
            webhook_request(&config, ECHO_TAG, &WebhookPayload::new(None, Some("ABC"))).unwrap();
        assert_eq!(request.tag, "n8n-echo");
        assert_eq!(request.url, config.webhook_url);
        assert_eq!(request.headers["content-type"], "application/json");
        assert_eq!(request.body, RequestBody::Raw(r#"{"coupon":"ABC"}"#.into()));
    }
}
