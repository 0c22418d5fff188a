//! Lead model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A known email address and its consent/verification state.
///
/// Leads are created on the first verification request for an address and are
/// never deleted by this service. `verified_at` is set once, on the first
/// successful token consumption.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub email: String,
    pub consent_marketing: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
