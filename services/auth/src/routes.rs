//! Email gate service routes

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::AppState;
use crate::models::Lead;
use crate::rate_limiter::Decision;
use crate::tokens::{self, VERIFICATION_TOKEN_BYTES};
use crate::validation::{normalize_email, validate_email};

/// Request for a verification link
#[derive(Deserialize)]
pub struct RequestVerification {
    pub email: String,
    #[serde(default, rename = "consentMarketing")]
    pub consent_marketing: bool,
}

/// Uniform response for the request endpoint
#[derive(Serialize)]
pub struct Accepted {
    pub ok: bool,
}

/// Response for the session status endpoint
#[derive(Serialize)]
pub struct SessionStatus {
    pub verified: bool,
    pub email: Option<String>,
}

/// Query parameters of the verification link
#[derive(Deserialize)]
pub struct VerifyParams {
    pub token: Option<String>,
}

/// Create the router for the email gate service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/request", post(request_verification))
        .route("/api/auth/verify", get(verify_email))
        .route("/api/auth/status", get(session_status))
        .route("/api/admin/leads", get(export_leads))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "auth-service"
    }))
}

/// Request a verification link for an email address.
///
/// The response is the same `{ok: true}` whether the address was already
/// known, newly created, or rate limited, so the endpoint cannot be used to
/// probe which emails exist.
pub async fn request_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RequestVerification>,
) -> Result<impl IntoResponse, AuthError> {
    let email = normalize_email(&payload.email);
    validate_email(&email).map_err(AuthError::Validation)?;

    if let Some(ip) = client_ip(&headers) {
        if state.rate_limiter.check(&format!("ip:{ip}")).await == Decision::Limited {
            return Ok(Json(Accepted { ok: true }));
        }
    }
    if state.rate_limiter.check(&format!("email:{email}")).await == Decision::Limited {
        return Ok(Json(Accepted { ok: true }));
    }

    let lead = state
        .lead_repository
        .upsert(&email, payload.consent_marketing)
        .await
        .map_err(|e| {
            error!("Failed to upsert lead: {}", e);
            AuthError::Internal
        })?;

    let token = tokens::generate_token(VERIFICATION_TOKEN_BYTES);
    let token_hash = tokens::hash_token(&token);
    state
        .token_repository
        .create(lead.id, &token_hash, state.config.token_ttl_minutes)
        .await
        .map_err(|e| {
            error!("Failed to persist verification token: {}", e);
            AuthError::Internal
        })?;

    let verify_url = format!("{}/api/auth/verify?token={}", state.config.app_url, token);
    state
        .mailer
        .send_verification(&email, &verify_url)
        .await
        .map_err(|e| {
            error!("Failed to send verification email: {}", e);
            AuthError::Internal
        })?;

    Ok(Json(Accepted { ok: true }))
}

/// Consume a verification link, mint the session cookie and redirect.
///
/// Unknown, expired and already-used tokens all redirect to the same
/// `status=invalid` page; the distinction never reaches the client.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let app_url = &state.config.app_url;

    let Some(token) = params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
    else {
        return Redirect::to(&format!("{app_url}/verify?status=missing")).into_response();
    };

    let token_hash = tokens::hash_token(token);
    let lead = match state.token_repository.consume(&token_hash).await {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            return Redirect::to(&format!("{app_url}/verify?status=invalid")).into_response();
        }
        Err(e) => {
            error!("Failed to consume verification token: {}", e);
            return Redirect::to(&format!("{app_url}/verify?status=invalid")).into_response();
        }
    };

    let credential = match state.session_service.issue(lead.id, &lead.email, true) {
        Ok(credential) => credential,
        Err(e) => {
            // The token is already burned at this point; the user requests a
            // fresh link rather than risk a replay.
            error!("Failed to issue session credential: {}", e);
            return Redirect::to(&format!("{app_url}/verify?status=invalid")).into_response();
        }
    };

    let cookie = state.session_service.cookie(&credential);
    let Ok(cookie) = header::HeaderValue::from_str(&cookie) else {
        error!("Session cookie is not a valid header value");
        return Redirect::to(&format!("{app_url}/verify?status=invalid")).into_response();
    };

    let mut response = Redirect::to(&format!("{app_url}/verified")).into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    response
}

/// Report whether the caller holds a verified session.
///
/// Never fails to the caller; any verification problem degrades to
/// `{verified: false, email: null}`.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionStatus> {
    let identity = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookie_header| state.session_service.verify_cookie_header(cookie_header).ok());

    match identity {
        Some(identity) if identity.verified => Json(SessionStatus {
            verified: true,
            email: Some(identity.email),
        }),
        _ => Json(SessionStatus {
            verified: false,
            email: None,
        }),
    }
}

/// Export all leads as CSV. Requires the admin bearer token; when none is
/// configured the endpoint always rejects.
pub async fn export_leads(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let Some(expected) = state.config.admin_token.as_deref() else {
        return Err(AuthError::Unauthorized);
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if presented != format!("Bearer {expected}") {
        return Err(AuthError::Unauthorized);
    }

    let leads = state.lead_repository.list_all().await.map_err(|e| {
        error!("Failed to list leads: {}", e);
        AuthError::Internal
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leads.csv\"",
            ),
            (header::CACHE_CONTROL, "no-store"),
        ],
        leads_csv(&leads),
    )
        .into_response())
}

fn leads_csv(leads: &[Lead]) -> String {
    let mut lines = vec!["email,verified_at,consent_marketing,created_at".to_string()];
    for lead in leads {
        let verified_at = lead
            .verified_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_default();
        lines.push(
            [
                csv_field(&lead.email),
                csv_field(&verified_at),
                csv_field(if lead.consent_marketing { "true" } else { "false" }),
                csv_field(&lead.created_at.to_rfc3339()),
            ]
            .join(","),
        );
    }
    lines.join("\n")
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Extract a client IP for rate limiting from common proxy headers.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Errors surfaced by the email gate handlers
#[derive(Error, Debug)]
pub enum AuthError {
    /// User-correctable input problem
    #[error("{0}")]
    Validation(String),
    /// Missing or wrong admin credentials
    #[error("Unauthorized")]
    Unauthorized,
    /// Anything internal; details stay server-side
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "ok": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
