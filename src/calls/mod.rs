//! The replayed calls.
//!
//! Each function rebuilds one captured request from the shared session and
//! its default template, logs it, dispatches it and logs what came back.
//! Edge delivery and tracking propagate transport failures; the webhook
//! calls turn them into an absent reply.

pub mod edge;
pub mod tracking;
pub mod webhook;

pub use edge::{EDGE_TAG, call_edge_delivery, edge_delivery_request};
pub use tracking::{TRACKING_TAG, call_tracking, tracking_form, tracking_request};
pub use webhook::{
    ECHO_TAG, WEBHOOK_TAG, WebhookPayload, WebhookReply, call_webhook, echo_coupon,
};

use crate::audit::AuditLog;
use crate::replay::ReplayResult;
use crate::session::{RequestDescriptor, ResponseRecord, Session};

/// Logs, sends and logs the response. Transport errors are left to the
/// caller so each call can apply its own policy.
pub(crate) async fn dispatch(
    session: &Session,
    log: &AuditLog,
    request: &RequestDescriptor,
) -> ReplayResult<ResponseRecord> {
    log.log_request(
        request.tag,
        &request.method,
        &request.url,
        &request.headers,
        Some(&request.body.preview()),
    );

    let response = session.send(request).await?;
    log.log_response(request.tag, &response);
    Ok(response)
}
