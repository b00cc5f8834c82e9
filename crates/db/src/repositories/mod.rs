//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async keyed operations
//! that accept `&PgPool` as the first argument.

pub mod call_log_repo;
pub mod campaign_repo;
pub mod recipient_repo;

pub use call_log_repo::CallLogRepo;
pub use campaign_repo::CampaignRepo;
pub use recipient_repo::RecipientRepo;
