//! Repository for the `campaigns` table.

use bullhorn_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::campaign::{Campaign, NewCampaign};
use crate::models::status::CampaignStatus;

/// Column list for `campaigns` queries.
const COLUMNS: &str = "\
    id, name, kind_id, message, audio_url, status_id, \
    scheduled_for, sent_at, completed_at, created_at, updated_at";

/// Provides keyed operations on campaigns.
pub struct CampaignRepo;

impl CampaignRepo {
    /// Create a campaign in `Draft` status, or `Scheduled` when a
    /// `scheduled_for` time is given.
    pub async fn create(pool: &PgPool, input: &NewCampaign) -> Result<Campaign, sqlx::Error> {
        let status = if input.scheduled_for.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };
        let query = format!(
            "INSERT INTO campaigns (name, kind_id, message, audio_url, status_id, scheduled_for) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(&input.name)
            .bind(input.kind_id)
            .bind(&input.message)
            .bind(&input.audio_url)
            .bind(status.id())
            .bind(input.scheduled_for)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Campaign>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM campaigns WHERE id = $1");
        sqlx::query_as::<_, Campaign>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically move a campaign into `Sending` and stamp `sent_at`.
    ///
    /// The conditional `UPDATE ... RETURNING` makes the dispatch
    /// precondition a single check-and-set: returns `false` when the
    /// campaign is already sending or completed, which protects against
    /// double-triggering.
    pub async fn try_begin_sending(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let claimed: Option<DbId> = sqlx::query_scalar(
            "UPDATE campaigns \
             SET status_id = $2, sent_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($2, $3) \
             RETURNING id",
        )
        .bind(id)
        .bind(CampaignStatus::Sending.id())
        .bind(CampaignStatus::Completed.id())
        .fetch_optional(pool)
        .await?;
        Ok(claimed.is_some())
    }

    /// Record the campaign's final status and completion time.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        status: CampaignStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE campaigns \
             SET status_id = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Scheduled campaigns whose `scheduled_for` has passed, soonest first.
    pub async fn due_scheduled(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Campaign>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM campaigns \
             WHERE status_id = $1 AND scheduled_for <= $2 \
             ORDER BY scheduled_for ASC"
        );
        sqlx::query_as::<_, Campaign>(&query)
            .bind(CampaignStatus::Scheduled.id())
            .bind(now)
            .fetch_all(pool)
            .await
    }
}
