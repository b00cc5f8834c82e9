//! Webhook ingress for provider lifecycle events.
//!
//! Providers retry on non-2xx, so the contract is: malformed payloads are
//! rejected with 400 and no state change; recognized events run through the
//! reconciler synchronously and answer 200 whether they applied, were
//! duplicates, or dropped; store failures answer 500 so the provider
//! redelivers (the terminal-state checks make redelivery safe).

use axum::extract::{Form, State};
use axum::response::IntoResponse;
use axum::Json;
use bullhorn_core::event::ProviderEvent;
use bullhorn_provider::{telnyx, twilio};
use serde_json::{json, Value};

use crate::engine::reconciler::ReconcileOutcome;
use crate::error::AppResult;
use crate::state::AppState;

fn received() -> Json<Value> {
    Json(json!({ "received": true }))
}

async fn apply_event(state: &AppState, event: &ProviderEvent) -> AppResult<Json<Value>> {
    let outcome = state.reconciler.handle_event(event).await?;

    match outcome {
        ReconcileOutcome::Applied => {
            tracing::info!(provider_id = event.provider_id(), "Webhook event applied");
        }
        ReconcileOutcome::Ignored => {
            tracing::debug!(
                provider_id = event.provider_id(),
                "Webhook event ignored (duplicate or no transition)",
            );
        }
        ReconcileOutcome::Dropped => {
            tracing::warn!(
                provider_id = event.provider_id(),
                to = event.destination(),
                "Webhook event dropped (no matching delivery record)",
            );
        }
    }

    Ok(received())
}

/// POST /api/v1/webhooks/twilio
///
/// Form-encoded status callback for both voice and SMS.
pub async fn twilio_status(
    State(state): State<AppState>,
    Form(payload): Form<twilio::TwilioWebhook>,
) -> AppResult<Json<Value>> {
    let Some(event) = twilio::parse_webhook(&payload)? else {
        return Ok(received());
    };
    apply_event(&state, &event).await
}

/// POST /api/v1/webhooks/telnyx
///
/// JSON `{event_type, data}` envelope.
pub async fn telnyx_status(
    State(state): State<AppState>,
    Json(payload): Json<telnyx::TelnyxWebhook>,
) -> AppResult<Json<Value>> {
    let Some(event) = telnyx::parse_webhook(&payload)? else {
        return Ok(received());
    };
    apply_event(&state, &event).await
}

/// GET on a webhook path -- liveness probe for provider console checks.
pub async fn twilio_liveness() -> impl IntoResponse {
    Json(json!({ "status": "Twilio webhook endpoint active" }))
}

pub async fn telnyx_liveness() -> impl IntoResponse {
    Json(json!({ "status": "Telnyx webhook endpoint active" }))
}
