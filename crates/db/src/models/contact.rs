//! Contact entity model.
//!
//! Contact CRUD lives outside this service; the table exists because
//! recipients join onto it and dispatch needs the phone number.

use bullhorn_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `contacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contact {
    pub id: DbId,
    pub name: Option<String>,
    pub phone_number: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
