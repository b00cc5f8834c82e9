//! Repository for the `call_logs` table.
//!
//! Rows are keyed externally by `provider_call_id`. Lifecycle updates are
//! terminal-protected in SQL: once a row reaches a terminal status, later
//! events (duplicates, late retries) leave it untouched.

use bullhorn_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::call_log::{CallLogEntry, NewCallLog};
use crate::models::status::{CallStatus, StatusId};

/// Column list for `call_logs` queries.
const COLUMNS: &str = "\
    id, campaign_id, contact_id, provider_call_id, status_id, \
    answered, duration_seconds, answered_at, ended_at, created_at";

/// Terminal statuses: completed, busy, failed, no-answer, canceled,
/// machine-detected.
const TERMINAL_STATUSES: [StatusId; 6] = [
    CallStatus::Completed as StatusId,
    CallStatus::Busy as StatusId,
    CallStatus::Failed as StatusId,
    CallStatus::NoAnswer as StatusId,
    CallStatus::Canceled as StatusId,
    CallStatus::MachineDetected as StatusId,
];

/// Provides keyed operations on call logs.
pub struct CallLogRepo;

impl CallLogRepo {
    /// Insert a call log row (`initiated` at dispatch time, or whatever
    /// status the reconciler saw first when self-healing).
    pub async fn insert(pool: &PgPool, input: &NewCallLog) -> Result<CallLogEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO call_logs \
                 (campaign_id, contact_id, provider_call_id, status_id, answered, duration_seconds) \
             VALUES ($1, $2, $3, $4, FALSE, 0) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CallLogEntry>(&query)
            .bind(input.campaign_id)
            .bind(input.contact_id)
            .bind(&input.provider_call_id)
            .bind(input.status_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_provider_id(
        pool: &PgPool,
        provider_call_id: &str,
    ) -> Result<Option<CallLogEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM call_logs WHERE provider_call_id = $1");
        sqlx::query_as::<_, CallLogEntry>(&query)
            .bind(provider_call_id)
            .fetch_optional(pool)
            .await
    }

    /// The call log for a (campaign, contact) pair -- the sweep's access
    /// path from a stuck recipient back to the provider call id.
    pub async fn find_by_campaign_contact(
        pool: &PgPool,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<CallLogEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM call_logs \
             WHERE campaign_id = $1 AND contact_id = $2 \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, CallLogEntry>(&query)
            .bind(campaign_id)
            .bind(contact_id)
            .fetch_optional(pool)
            .await
    }

    /// Progress update for a live call (initiated/ringing/in-progress).
    /// A no-op when the row is already terminal.
    pub async fn update_status(
        pool: &PgPool,
        provider_call_id: &str,
        status: CallStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE call_logs SET status_id = $2 \
             WHERE provider_call_id = $1 AND status_id <> ALL($3)",
        )
        .bind(provider_call_id)
        .bind(status.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Terminal write: final status, answered flag, and duration. A no-op
    /// when the row is already terminal, which makes duplicate terminal
    /// events idempotent.
    pub async fn close(
        pool: &PgPool,
        provider_call_id: &str,
        status: CallStatus,
        answered: bool,
        duration_seconds: i32,
        answered_at: Option<Timestamp>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE call_logs \
             SET status_id = $2, answered = $3, duration_seconds = $4, \
                 answered_at = $5, ended_at = NOW() \
             WHERE provider_call_id = $1 AND status_id <> ALL($6)",
        )
        .bind(provider_call_id)
        .bind(status.id())
        .bind(answered)
        .bind(duration_seconds)
        .bind(answered_at)
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
