//! Campaign recipient models -- the (campaign, contact) join carrying the
//! per-recipient delivery lifecycle.

use bullhorn_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `campaign_recipients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Recipient {
    pub id: DbId,
    pub campaign_id: DbId,
    pub contact_id: DbId,
    pub status_id: StatusId,
    /// Provider message identifier; set once an SMS send succeeds.
    pub provider_message_id: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub delivered_at: Option<Timestamp>,
    pub failed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

/// A recipient joined with its contact's phone number, as the dispatcher
/// and the self-healing lookup consume it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecipientContact {
    pub id: DbId,
    pub campaign_id: DbId,
    pub contact_id: DbId,
    pub status_id: StatusId,
    pub phone_number: String,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
}
