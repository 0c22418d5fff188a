//! Session middleware for the processing gateway

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{AppState, error::ApiError};

/// Require a valid, verified session cookie.
///
/// Every failure mode -- no cookie, malformed credential, bad signature,
/// expired, unverified -- collapses to the same EMAIL_REQUIRED response, so
/// callers learn nothing about why verification failed.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let identity = state
        .session_service
        .verify_cookie_header(cookie_header)
        .map_err(|err| {
            debug!("Rejected session credential: {}", err);
            ApiError::EmailRequired
        })?;

    if !identity.verified {
        return Err(ApiError::EmailRequired);
    }

    // Make the identity available to handlers that key work by lead.
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
