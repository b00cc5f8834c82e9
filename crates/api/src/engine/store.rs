//! The narrow persistence interface the engine operates against.
//!
//! The dispatcher and reconciler never see SQL or a pool -- only keyed reads,
//! keyed partial updates, and inserts. Production wires in [`PgDeliveryStore`];
//! tests substitute an in-memory implementation.

use async_trait::async_trait;
use bullhorn_core::types::{DbId, Timestamp};
use bullhorn_db::models::call_log::{CallLogEntry, NewCallLog};
use bullhorn_db::models::campaign::{Campaign, NewCampaign};
use bullhorn_db::models::recipient::{Recipient, RecipientContact};
use bullhorn_db::models::status::{CallStatus, CampaignStatus, RecipientStatus};
use bullhorn_db::repositories::{CallLogRepo, CampaignRepo, RecipientRepo};
use bullhorn_db::DbPool;
use chrono::Utc;

/// Opaque store failure.
///
/// Keeps sqlx out of the engine's signatures so test stores do not have to
/// fabricate database errors.
#[derive(Debug, thiserror::Error)]
#[error("Store operation failed: {0}")]
pub struct StoreError(pub String);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self(err.to_string())
    }
}

/// Keyed access to campaigns, recipients, and call logs.
///
/// All updates are narrow (a fixed set of columns for one keyed row) so the
/// dispatcher and the reconciler can write concurrently without clobbering
/// each other. Updates driven by provider events refuse to overwrite a
/// terminal status; their `u64` return value is the number of rows changed,
/// which lets callers tell an unknown key from a terminal-protected no-op.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    // --- Campaigns ---

    async fn insert_campaign(&self, input: &NewCampaign) -> Result<Campaign, StoreError>;

    async fn campaign(&self, id: DbId) -> Result<Option<Campaign>, StoreError>;

    /// Atomic dispatch precondition: move the campaign into `sending` unless
    /// it is already sending or completed. Returns `false` when refused.
    async fn try_begin_sending(&self, id: DbId) -> Result<bool, StoreError>;

    /// Record the campaign's final status and completion time.
    async fn finish_campaign(&self, id: DbId, status: CampaignStatus) -> Result<(), StoreError>;

    /// Scheduled campaigns whose `scheduled_for` has passed, soonest first.
    async fn due_campaigns(&self, now: Timestamp) -> Result<Vec<Campaign>, StoreError>;

    // --- Recipients ---

    /// Attach a contact to a campaign as a pending recipient.
    async fn insert_recipient(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Recipient, StoreError>;

    /// The dispatcher's work list: pending recipients joined with contact
    /// phone numbers.
    async fn pending_recipients(
        &self,
        campaign_id: DbId,
    ) -> Result<Vec<RecipientContact>, StoreError>;

    /// Record a successful send, optionally storing the provider message id.
    async fn mark_recipient_sent(
        &self,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Record a failed send with the error message.
    async fn mark_recipient_failed(&self, id: DbId, error: &str) -> Result<(), StoreError>;

    /// Reconciler transition keyed by provider message id (SMS path).
    async fn update_recipient_by_message_id(
        &self,
        message_id: &str,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError>;

    /// Reconciler transition keyed by (campaign, contact) -- the access path
    /// after resolving a call log.
    async fn update_recipient_by_campaign_contact(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError>;

    /// Self-healing lookup: recipients in pending/sent whose contact has
    /// this phone number, most recent first, across campaigns.
    async fn active_recipients_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<RecipientContact>, StoreError>;

    /// Recipients stuck in `sent` since before `cutoff`.
    async fn stuck_recipients(&self, cutoff: Timestamp) -> Result<Vec<Recipient>, StoreError>;

    // --- Call logs ---

    async fn insert_call_log(&self, input: &NewCallLog) -> Result<CallLogEntry, StoreError>;

    async fn call_log(&self, provider_call_id: &str) -> Result<Option<CallLogEntry>, StoreError>;

    /// The latest call log for a (campaign, contact) pair.
    async fn call_log_for(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<CallLogEntry>, StoreError>;

    /// Progress update for a live call; a no-op once the row is terminal.
    async fn update_call_status(
        &self,
        provider_call_id: &str,
        status: CallStatus,
    ) -> Result<u64, StoreError>;

    /// Terminal write: final status, answered flag, duration. A no-op once
    /// the row is terminal, which makes duplicate terminal events idempotent.
    async fn close_call(
        &self,
        provider_call_id: &str,
        status: CallStatus,
        answered: bool,
        duration_seconds: i32,
    ) -> Result<u64, StoreError>;

    // --- Health ---

    async fn healthy(&self) -> bool;
}

/// Production [`DeliveryStore`] delegating to the `bullhorn-db` repositories.
pub struct PgDeliveryStore {
    pool: DbPool,
}

impl PgDeliveryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert_campaign(&self, input: &NewCampaign) -> Result<Campaign, StoreError> {
        Ok(CampaignRepo::create(&self.pool, input).await?)
    }

    async fn campaign(&self, id: DbId) -> Result<Option<Campaign>, StoreError> {
        Ok(CampaignRepo::find_by_id(&self.pool, id).await?)
    }

    async fn try_begin_sending(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(CampaignRepo::try_begin_sending(&self.pool, id).await?)
    }

    async fn finish_campaign(&self, id: DbId, status: CampaignStatus) -> Result<(), StoreError> {
        Ok(CampaignRepo::finish(&self.pool, id, status).await?)
    }

    async fn due_campaigns(&self, now: Timestamp) -> Result<Vec<Campaign>, StoreError> {
        Ok(CampaignRepo::due_scheduled(&self.pool, now).await?)
    }

    async fn insert_recipient(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Recipient, StoreError> {
        Ok(RecipientRepo::create(&self.pool, campaign_id, contact_id).await?)
    }

    async fn pending_recipients(
        &self,
        campaign_id: DbId,
    ) -> Result<Vec<RecipientContact>, StoreError> {
        Ok(RecipientRepo::pending_for_campaign(&self.pool, campaign_id).await?)
    }

    async fn mark_recipient_sent(
        &self,
        id: DbId,
        provider_message_id: Option<&str>,
    ) -> Result<(), StoreError> {
        Ok(RecipientRepo::mark_sent(&self.pool, id, provider_message_id).await?)
    }

    async fn mark_recipient_failed(&self, id: DbId, error: &str) -> Result<(), StoreError> {
        Ok(RecipientRepo::mark_failed(&self.pool, id, error).await?)
    }

    async fn update_recipient_by_message_id(
        &self,
        message_id: &str,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError> {
        Ok(RecipientRepo::update_by_message_id(&self.pool, message_id, status, error).await?)
    }

    async fn update_recipient_by_campaign_contact(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
        status: RecipientStatus,
        error: Option<&str>,
    ) -> Result<u64, StoreError> {
        Ok(
            RecipientRepo::update_by_campaign_contact(
                &self.pool,
                campaign_id,
                contact_id,
                status,
                error,
            )
            .await?,
        )
    }

    async fn active_recipients_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<RecipientContact>, StoreError> {
        Ok(RecipientRepo::find_active_by_phone(&self.pool, phone).await?)
    }

    async fn stuck_recipients(&self, cutoff: Timestamp) -> Result<Vec<Recipient>, StoreError> {
        Ok(RecipientRepo::stuck_sent(&self.pool, cutoff).await?)
    }

    async fn insert_call_log(&self, input: &NewCallLog) -> Result<CallLogEntry, StoreError> {
        Ok(CallLogRepo::insert(&self.pool, input).await?)
    }

    async fn call_log(&self, provider_call_id: &str) -> Result<Option<CallLogEntry>, StoreError> {
        Ok(CallLogRepo::find_by_provider_id(&self.pool, provider_call_id).await?)
    }

    async fn call_log_for(
        &self,
        campaign_id: DbId,
        contact_id: DbId,
    ) -> Result<Option<CallLogEntry>, StoreError> {
        Ok(CallLogRepo::find_by_campaign_contact(&self.pool, campaign_id, contact_id).await?)
    }

    async fn update_call_status(
        &self,
        provider_call_id: &str,
        status: CallStatus,
    ) -> Result<u64, StoreError> {
        Ok(CallLogRepo::update_status(&self.pool, provider_call_id, status).await?)
    }

    async fn close_call(
        &self,
        provider_call_id: &str,
        status: CallStatus,
        answered: bool,
        duration_seconds: i32,
    ) -> Result<u64, StoreError> {
        let answered_at = answered.then(Utc::now);
        Ok(CallLogRepo::close(
            &self.pool,
            provider_call_id,
            status,
            answered,
            duration_seconds,
            answered_at,
        )
        .await?)
    }

    async fn healthy(&self) -> bool {
        bullhorn_db::health_check(&self.pool).await.is_ok()
    }
}
