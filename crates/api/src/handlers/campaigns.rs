//! Handlers for the `/campaigns` resource.
//!
//! Campaign setup here is minimal -- enough to stage a campaign and hand it
//! to the dispatch engine. Contact management lives outside this service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bullhorn_core::error::CoreError;
use bullhorn_core::types::DbId;
use bullhorn_db::models::campaign::NewCampaign;
use bullhorn_db::models::status::{CampaignStatus, ChannelKind};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body for POST /api/v1/campaigns/{id}/recipients.
#[derive(Debug, Deserialize)]
pub struct AddRecipients {
    pub contact_ids: Vec<DbId>,
}

/// Enforce the channel/payload pairing: text campaigns carry a message
/// body, voice campaigns carry an audio reference, never both.
fn validate_payload(input: &NewCampaign) -> Result<(), CoreError> {
    match ChannelKind::from_id(input.kind_id) {
        Some(ChannelKind::Sms) | Some(ChannelKind::Whatsapp) => {
            if input.message.as_deref().is_none_or(|m| m.trim().is_empty()) {
                return Err(CoreError::Validation(
                    "Text campaigns require a message body".into(),
                ));
            }
            if input.audio_url.is_some() {
                return Err(CoreError::Validation(
                    "Text campaigns cannot carry an audio URL".into(),
                ));
            }
        }
        Some(ChannelKind::Voice) => {
            if input.audio_url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                return Err(CoreError::Validation(
                    "Voice campaigns require an audio URL".into(),
                ));
            }
            if input.message.is_some() {
                return Err(CoreError::Validation(
                    "Voice campaigns cannot carry a message body".into(),
                ));
            }
        }
        None => {
            return Err(CoreError::Validation(format!(
                "Unknown channel kind: {}",
                input.kind_id
            )));
        }
    }
    Ok(())
}

/// POST /api/v1/campaigns
///
/// Create a campaign in `draft` status (`scheduled` when `scheduled_for`
/// is given). Returns 201 with the created campaign.
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(input): Json<NewCampaign>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("Campaign name is required".into()).into());
    }
    validate_payload(&input)?;

    let campaign = state.store.insert_campaign(&input).await?;
    tracing::info!(campaign_id = campaign.id, kind_id = campaign.kind_id, "Campaign created");

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /api/v1/campaigns/{id}
///
/// Fetch a campaign -- also the polling surface for dispatch progress, since
/// the send endpoint returns before the run finishes.
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = state
        .store
        .campaign(campaign_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Campaign",
            id: campaign_id,
        }))?;
    Ok(Json(campaign))
}

/// POST /api/v1/campaigns/{id}/recipients
///
/// Attach existing contacts to a campaign as pending recipients.
pub async fn add_recipients(
    State(state): State<AppState>,
    Path(campaign_id): Path<DbId>,
    Json(input): Json<AddRecipients>,
) -> AppResult<impl IntoResponse> {
    if input.contact_ids.is_empty() {
        return Err(CoreError::Validation("contact_ids must not be empty".into()).into());
    }

    state
        .store
        .campaign(campaign_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Campaign",
            id: campaign_id,
        }))?;

    let mut added = 0;
    for contact_id in &input.contact_ids {
        state.store.insert_recipient(campaign_id, *contact_id).await?;
        added += 1;
    }

    tracing::info!(campaign_id, added, "Recipients added to campaign");
    Ok((StatusCode::CREATED, Json(json!({ "added": added }))))
}

/// POST /api/v1/campaigns/{id}/send
///
/// Start dispatching a campaign. The run executes as an explicit background
/// task; this returns 202 immediately and callers observe completion by
/// polling the campaign's status.
pub async fn send_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let campaign = state
        .store
        .campaign(campaign_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Campaign",
            id: campaign_id,
        }))?;

    // Best-effort early refusal; the dispatcher's atomic check-and-set is
    // what actually prevents a double run.
    match CampaignStatus::from_id(campaign.status_id) {
        Some(CampaignStatus::Sending) | Some(CampaignStatus::Completed) => {
            return Err(CoreError::Conflict(
                "Campaign is already sending or completed".into(),
            )
            .into());
        }
        _ => {}
    }

    let recipient_count = state.store.pending_recipients(campaign_id).await?.len();

    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        match dispatcher.dispatch(campaign_id).await {
            Ok(summary) => tracing::info!(
                campaign_id,
                success_count = summary.success_count,
                fail_count = summary.fail_count,
                "Campaign dispatch task finished",
            ),
            Err(e) => tracing::error!(
                campaign_id,
                error = %e,
                "Campaign dispatch task failed",
            ),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Campaign dispatch started",
            "recipient_count": recipient_count,
        })),
    ))
}
