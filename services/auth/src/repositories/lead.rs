//! Lead repository for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::Lead;

/// Lead repository
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    /// Create a new lead repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a lead by normalized email.
    ///
    /// Repeated requests for the same address reuse the existing row and only
    /// update the consent flag; no duplicates are ever created. The caller
    /// must not be able to tell a fresh lead from an existing one.
    pub async fn upsert(&self, email: &str, consent_marketing: bool) -> Result<Lead> {
        let row = sqlx::query(
            r#"
            INSERT INTO leads (email, consent_marketing)
            VALUES ($1, $2)
            ON CONFLICT (email)
            DO UPDATE SET consent_marketing = EXCLUDED.consent_marketing
            RETURNING id, email, consent_marketing, verified_at, created_at
            "#,
        )
        .bind(email)
        .bind(consent_marketing)
        .fetch_one(&self.pool)
        .await?;

        Ok(Lead {
            id: row.get("id"),
            email: row.get("email"),
            consent_marketing: row.get("consent_marketing"),
            verified_at: row.get("verified_at"),
            created_at: row.get("created_at"),
        })
    }

    /// List all leads, newest first, for the admin export.
    pub async fn list_all(&self) -> Result<Vec<Lead>> {
        info!("Listing leads for export");

        let rows = sqlx::query(
            r#"
            SELECT id, email, consent_marketing, verified_at, created_at
            FROM leads
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let leads = rows
            .into_iter()
            .map(|row| Lead {
                id: row.get("id"),
                email: row.get("email"),
                consent_marketing: row.get("consent_marketing"),
                verified_at: row.get("verified_at"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(leads)
    }
}
