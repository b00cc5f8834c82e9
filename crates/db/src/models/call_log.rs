//! Call log models -- provider-side lifecycle records for voice calls.

use bullhorn_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `call_logs` table, keyed externally by the provider's
/// call identifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CallLogEntry {
    pub id: DbId,
    pub campaign_id: DbId,
    pub contact_id: DbId,
    pub provider_call_id: String,
    pub status_id: StatusId,
    pub answered: bool,
    pub duration_seconds: i32,
    pub answered_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for inserting a call log row, either at dispatch time or lazily by
/// the reconciler when an event arrives before the row exists.
#[derive(Debug, Clone)]
pub struct NewCallLog {
    pub campaign_id: DbId,
    pub contact_id: DbId,
    pub provider_call_id: String,
    pub status_id: StatusId,
}
