//! Repository for the `campaign_recipients` table.
//!
//! All writes are narrow keyed updates (by row id, by campaign+contact, or
//! by provider message id) so concurrent writers -- the dispatcher and the
//! webhook reconciler -- never clobber each other's columns. Reconciler-
//! driven updates additionally refuse to overwrite a terminal status.

use bullhorn_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::recipient::{Recipient, RecipientContact};
use crate::models::status::{RecipientStatus, StatusId};

/// Column list for `campaign_recipients` queries.
const COLUMNS: &str = "\
    id, campaign_id, contact_id, status_id, provider_message_id, \
    sent_at, delivered_at, failed_at, error_message, created_at";

/// Column list for recipient rows joined with the contact phone number.
const JOINED_COLUMNS: &str = "\
    r.id, r.campaign_id, r.contact_id, r.status_id, c.phone_number, \
    r.sent_at, r.created_at";

/// Terminal statuses: delivered, failed.
const TERMINAL_STATUSES: [StatusId; 2] = [
    RecipientStatus::Delivered as StatusId,
    RecipientStatus::Failed as StatusId,
];

/// Provides keyed operations on campaign recipients.
pub struct RecipientRepo;

impl RecipientRepo {
    /// Attach a contact to a campaign as a pending recipient.
    pub async fn create(
        pool: &PgPool,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Recipient, sqlx::Error> {
        let query = format!(
            "INSERT INTO campaign_recipients (campaign_id, contact_id, status_id) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Recipient>(&query)
            .bind(campaign_id)
            .bind(contact_id)
            .bind(RecipientStatus::Pending.id())
            .fetch_one(pool)
            .await
    }

    /// All pending recipients of a campaign, joined with contact phone
    /// numbers -- the dispatcher's work list.
    pub async fn pending_for_campaign(
        pool: &PgPool,
        campaign_id: DbId,
    ) -> Result<Vec<RecipientContact>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM campaign_recipients r \
             JOIN contacts c ON c.id = r.contact_id \
             WHERE r.campaign_id = $1 AND r.status_id = $2 \
             ORDER BY r.id ASC"
        );
        sqlx::query_as::<_, RecipientContact>(&query)
            .bind(campaign_id)
            .bind(RecipientStatus::Pending.id())
            .fetch_all(pool)
            .await
    }

    /// Record a successful send, optionally storing the provider message id.
    pub async fn mark_sent(
        pool: &PgPool,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaign_recipients \
             SET status_id = $2, sent_at = NOW(), \
                 provider_message_id = COALESCE($3, provider_message_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(RecipientStatus::Sent.id())
        .bind(provider_message_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failed send with the adapter's error message.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaign_recipients \
             SET status_id = $2, failed_at = NOW(), error_message = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(RecipientStatus::Failed.id())
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Apply a reconciler transition keyed by provider message id.
    ///
    /// Refuses to overwrite a terminal status; returns the number of rows
    /// changed so callers can tell an unknown id from a no-op duplicate.
    pub async fn update_by_message_id(
        pool: &PgPool,
        message_id: &str,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaign_recipients \
             SET status_id = $2, \
                 sent_at = CASE WHEN $2 = $4 THEN NOW() ELSE sent_at END, \
                 delivered_at = CASE WHEN $2 = $5 THEN NOW() ELSE delivered_at END, \
                 failed_at = CASE WHEN $2 = $6 THEN NOW() ELSE failed_at END, \
                 error_message = COALESCE($3, error_message) \
             WHERE provider_message_id = $1 \
               AND status_id <> ALL($7)",
        )
        .bind(message_id)
        .bind(status.id())
        .bind(error)
        .bind(RecipientStatus::Sent.id())
        .bind(RecipientStatus::Delivered.id())
        .bind(RecipientStatus::Failed.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Apply a reconciler transition keyed by (campaign, contact), the
    /// access path used after resolving a call log. Terminal-protected
    /// like [`Self::update_by_message_id`].
    pub async fn update_by_campaign_contact(
        pool: &PgPool,
        campaign_id: DbId,
        contact_id: DbId,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE campaign_recipients \
             SET status_id = $3, \
                 delivered_at = CASE WHEN $3 = $5 THEN NOW() ELSE delivered_at END, \
                 failed_at = CASE WHEN $3 = $6 THEN NOW() ELSE failed_at END, \
                 error_message = COALESCE($4, error_message) \
             WHERE campaign_id = $1 AND contact_id = $2 \
               AND status_id <> ALL($7)",
        )
        .bind(campaign_id)
        .bind(contact_id)
        .bind(status.id())
        .bind(error)
        .bind(RecipientStatus::Delivered.id())
        .bind(RecipientStatus::Failed.id())
        .bind(&TERMINAL_STATUSES[..])
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Self-healing lookup: recipients in `pending`/`sent` whose contact
    /// has the given phone number, most recent first, across campaigns.
    pub async fn find_active_by_phone(
        pool: &PgPool,
        phone_number: &str,
    ) -> Result<Vec<RecipientContact>, sqlx::Error> {
        let query = format!(
            "SELECT {JOINED_COLUMNS} \
             FROM campaign_recipients r \
             JOIN contacts c ON c.id = r.contact_id \
             WHERE c.phone_number = $1 AND r.status_id IN ($2, $3) \
             ORDER BY r.created_at DESC"
        );
        sqlx::query_as::<_, RecipientContact>(&query)
            .bind(phone_number)
            .bind(RecipientStatus::Pending.id())
            .bind(RecipientStatus::Sent.id())
            .fetch_all(pool)
            .await
    }

    /// Recipients stuck in `sent` since before `cutoff` -- candidates for
    /// the reconciliation sweep.
    pub async fn stuck_sent(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<Recipient>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaign_recipients \
             WHERE status_id = $1 AND sent_at < $2 \
             ORDER BY sent_at ASC"
        );
        sqlx::query_as::<_, Recipient>(&query)
            .bind(RecipientStatus::Sent.id())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }
}
