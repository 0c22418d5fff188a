//! Email verification token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A one-time credential proving control of an email address.
///
/// Only the SHA-256 digest of the raw token is stored. A token is consumable
/// iff `used_at` is null and `expires_at` is in the future; expired and used
/// tokens are permanently invalid.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmailToken {
    pub id: Uuid,
    pub lead_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: Vec<u8>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
