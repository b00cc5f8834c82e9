//! Route definitions for the scheduler trigger.

use axum::routing::get;
use axum::Router;

use crate::handlers::cron;
use crate::state::AppState;

/// Routes mounted at `/cron`. Both methods are accepted because cron
/// runners differ in what they emit.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/due-campaigns",
        get(cron::run_due_campaigns).post(cron::run_due_campaigns),
    )
}
