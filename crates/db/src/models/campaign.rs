//! Campaign entity models and DTOs.

use bullhorn_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `campaigns` table.
///
/// `message` and `audio_url` are mutually exclusive payloads selected by
/// `kind_id`; the dispatcher validates the pairing before any send.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Campaign {
    pub id: DbId,
    pub name: String,
    pub kind_id: StatusId,
    pub message: Option<String>,
    pub audio_url: Option<String>,
    pub status_id: StatusId,
    pub scheduled_for: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a campaign.
#[derive(Debug, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    pub kind_id: StatusId,
    pub message: Option<String>,
    pub audio_url: Option<String>,
    pub scheduled_for: Option<Timestamp>,
}
