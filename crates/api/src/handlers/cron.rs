//! Scheduler trigger: an external cron hits this endpoint periodically and
//! any scheduled campaign whose time has come is dispatched.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use bullhorn_core::error::CoreError;
use bullhorn_core::types::DbId;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::engine::dispatcher::DispatchError;
use crate::error::AppResult;
use crate::state::AppState;

/// Per-campaign trigger outcome.
#[derive(Debug, Serialize)]
pub struct TriggerOutcome {
    pub campaign_id: DbId,
    /// `triggered`, `skipped` (already sending/completed), or `failed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET|POST /api/v1/cron/due-campaigns
///
/// Dispatch every scheduled campaign whose `scheduled_for` has passed,
/// soonest first, one at a time. A failure to trigger one campaign does not
/// block the others; double-triggering is absorbed by the dispatcher's
/// precondition and reported as `skipped`.
pub async fn run_due_campaigns(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.cron_secret {
        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(secret.as_str()) {
            return Err(CoreError::Unauthorized("Invalid or missing cron secret".into()).into());
        }
    }

    let now = Utc::now();
    let due = state.store.due_campaigns(now).await?;
    tracing::info!(count = due.len(), "Scheduler trigger: due campaigns");

    let mut results = Vec::with_capacity(due.len());
    for campaign in &due {
        let outcome = match state.dispatcher.dispatch(campaign.id).await {
            Ok(summary) => TriggerOutcome {
                campaign_id: campaign.id,
                status: "triggered",
                success_count: Some(summary.success_count),
                fail_count: Some(summary.fail_count),
                error: None,
            },
            Err(DispatchError::AlreadyRunning(_)) => {
                tracing::info!(campaign_id = campaign.id, "Due campaign already running; skipped");
                TriggerOutcome {
                    campaign_id: campaign.id,
                    status: "skipped",
                    success_count: None,
                    fail_count: None,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(campaign_id = campaign.id, error = %e, "Due campaign trigger failed");
                TriggerOutcome {
                    campaign_id: campaign.id,
                    status: "failed",
                    success_count: None,
                    fail_count: None,
                    error: Some(e.to_string()),
                }
            }
        };
        results.push(outcome);
    }

    Ok(Json(json!({
        "count": results.len(),
        "results": results,
    })))
}
