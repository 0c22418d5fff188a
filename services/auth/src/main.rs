use anyhow::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod mailer;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod tokens;
mod validation;

use common::database::{self, DatabaseConfig};
use common::session::{SessionConfig, SessionService};

use crate::config::AuthConfig;
use crate::mailer::{Mailer, MailerConfig};
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::repositories::{LeadRepository, TokenRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub session_service: SessionService,
    pub lead_repository: LeadRepository,
    pub token_repository: TokenRepository,
    pub mailer: Mailer,
    pub rate_limiter: RateLimiter,
    pub config: AuthConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting email gate service");

    // Initialize database connection pool and apply migrations
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(common::error::DatabaseError::Migration)?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // A missing session secret is fatal; the service never starts without one.
    let session_config = SessionConfig::from_env()?;
    let session_service = SessionService::new(session_config)?;

    let config = AuthConfig::from_env();
    let mailer = Mailer::new(MailerConfig::from_env());
    if !mailer.is_configured() {
        info!("Mail API not configured; verification links will be logged");
    }

    let app_state = AppState {
        db_pool: pool.clone(),
        session_service,
        lead_repository: LeadRepository::new(pool.clone()),
        token_repository: TokenRepository::new(pool),
        mailer,
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        config: config.clone(),
    };

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Email gate service listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
