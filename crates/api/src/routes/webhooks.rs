//! Route definitions for provider webhook ingress.

use axum::routing::get;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`.
///
/// ```text
/// GET|POST  /twilio  -> liveness | status callback
/// GET|POST  /telnyx  -> liveness | status callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/twilio",
            get(webhooks::twilio_liveness).post(webhooks::twilio_status),
        )
        .route(
            "/telnyx",
            get(webhooks::telnyx_liveness).post(webhooks::telnyx_status),
        )
}
