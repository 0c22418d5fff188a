use anyhow::Result;
use aws_config::BehaviorVersion;
use tokio::net::TcpListener;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod error;
mod metadata;
mod middleware;
mod models;
mod routes;
mod s3;
mod storage;

use common::session::{SessionConfig, SessionService};

use crate::s3::{PresignConfig, Uploads};
use crate::storage::{JobStorage, StorageConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService,
    pub storage: JobStorage,
    pub uploads: Option<Uploads>,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting processing gateway");

    // A missing session secret is fatal; the gateway cannot authenticate
    // requests without it.
    let session_service = SessionService::new(SessionConfig::from_env()?)?;

    let storage = JobStorage::new(StorageConfig::from_env());

    let uploads = match PresignConfig::from_env() {
        Some(config) => {
            let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
            Some(Uploads::new(aws_sdk_s3::Client::new(&aws), config))
        }
        None => {
            info!("Object storage not configured; direct uploads disabled");
            None
        }
    };

    // Periodic sweep of aged job files. Best-effort: a failed run only logs.
    let schedule =
        std::env::var("SWEEP_SCHEDULE").unwrap_or_else(|_| "0 */10 * * * *".to_string());
    let scheduler = JobScheduler::new().await?;
    let sweep_storage = storage.clone();
    let job = Job::new_async(schedule.as_str(), move |_, _| {
        let storage = sweep_storage.clone();
        Box::pin(async move {
            match storage.sweep().await {
                Ok(0) => {}
                Ok(removed) => info!("Swept {} expired job files", removed),
                Err(e) => error!("Failed to sweep job files: {}", e),
            }
        })
    })?;
    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("Started job sweep with schedule: {}", schedule);

    let app_state = AppState {
        session_service,
        storage,
        uploads,
        http: reqwest::Client::new(),
    };

    let app = routes::create_router(app_state);

    let listen_addr =
        std::env::var("MEDIA_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Processing gateway listening on {}", listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
