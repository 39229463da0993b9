use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use bytes::Bytes;
use tower::limit::ConcurrencyLimitLayer;
use tracing::{debug, error, info, warn};
use vpb_bus::{BrokerTransport, OUTBOUND_TOPIC};
use vpb_core::OutboundEnvelope;
use vpb_telemetry::metrics::WEBHOOK_TOTAL;

use crate::ledger::{FailedJobLedger, status_message_key};
use crate::payload::{CheckRunEvent, FailedJob};
use crate::signature::{SIGNATURE_HEADER, verify_signature};

pub const EVENT_HEADER: &str = "x-github-event";

#[derive(Clone)]
pub struct WebhookState {
    pub bus: Arc<dyn BrokerTransport>,
    pub ledger: Arc<dyn FailedJobLedger>,
    pub channel_id: String,
    pub role_id: String,
    pub branch: String,
    pub webhook_secret: Option<String>,
}

pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/github-webhook", post(handle_webhook))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .layer(ConcurrencyLimitLayer::new(64))
        .with_state(state)
}

/// Status message listing every failed job of the suite so far.
pub fn failure_report(job: &FailedJob, role_id: &str, failed: &[String]) -> String {
    let jobs: String = failed.iter().map(|entry| format!(" - {entry}\n")).collect();
    format!(
        "CI is failing again... Somebody messed up... Wonder who... *eyes BDFL* \
         (commit: {}) <@&{role_id}>\nFailed jobs:\n{jobs}",
        job.head_sha
    )
}

async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let status = process_webhook(&state, &headers, &body).await;
    vpb_telemetry::record_counter(WEBHOOK_TOTAL, "status", status.as_str());
    status
}

async fn process_webhook(state: &WebhookState, headers: &HeaderMap, body: &Bytes) -> StatusCode {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let provided = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if let Err(err) = verify_signature(secret, body, provided) {
            warn!(error = %err, "rejecting unsigned webhook");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    debug!(event, "github webhook received");
    if event != "check_run" {
        return StatusCode::OK;
    }

    let run: CheckRunEvent = match serde_json::from_slice(body) {
        Ok(run) => run,
        Err(err) => {
            error!(error = %err, "malformed check_run payload");
            return StatusCode::BAD_REQUEST;
        }
    };
    let Some(job) = run.failure_on(&state.branch) else {
        return StatusCode::OK;
    };

    let failed = match state.ledger.record(job.suite_id, &job.ledger_entry()).await {
        Ok(failed) => failed,
        Err(err) => {
            error!(suite_id = job.suite_id, error = %err, "failed to record failed job");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let envelope = OutboundEnvelope::message(
        &state.channel_id,
        failure_report(&job, &state.role_id, &failed),
    )
    .with_internal_id(status_message_key(job.suite_id));
    match vpb_bus::publish(state.bus.as_ref(), OUTBOUND_TOPIC, &envelope).await {
        Ok(()) => {
            info!(
                suite_id = job.suite_id,
                job = %job.name,
                failed = failed.len(),
                "published CI failure"
            );
            StatusCode::OK
        }
        Err(err) => {
            error!(suite_id = job.suite_id, error = %err, "failed to publish CI failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_jobs_and_mentions_the_role() {
        let job = FailedJob {
            suite_id: 1,
            head_sha: "abc".into(),
            name: "a".into(),
            details_url: "u".into(),
        };
        let text = failure_report(&job, "99", &["a: <u>".into(), "b: <v>".into()]);
        assert!(text.starts_with("CI is failing again..."));
        assert!(text.contains("(commit: abc) <@&99>\nFailed jobs:\n - a: <u>\n - b: <v>\n"));
    }
}
