//! Outbound verification email delivery
//!
//! Delivery goes through a generic transactional mail HTTP API. When the API
//! is not configured the mailer runs in dev mode: it logs the verification
//! link instead of failing, so the flow stays usable on a laptop without
//! credentials.

use anyhow::{Result, anyhow};
use serde_json::json;
use tracing::info;

/// Mailer configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Transactional mail API endpoint; dev mode when unset
    pub api_url: Option<String>,
    /// Bearer token for the mail API
    pub api_key: Option<String>,
    /// From address used for outbound mail
    pub from: String,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MAIL_API_URL`: Mail API endpoint (unset enables dev mode)
    /// - `MAIL_API_KEY`: Mail API bearer token
    /// - `MAIL_FROM`: From address (default: "Metascrub <no-reply@localhost>")
    pub fn from_env() -> Self {
        let api_url = std::env::var("MAIL_API_URL").ok().filter(|v| !v.is_empty());
        let api_key = std::env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty());
        let from = std::env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Metascrub <no-reply@localhost>".to_string());

        MailerConfig {
            api_url,
            api_key,
            from,
        }
    }
}

/// Sends verification links to leads
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    config: MailerConfig,
}

impl Mailer {
    /// Create a new mailer
    pub fn new(config: MailerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Whether the mail API is configured; false means dev mode.
    pub fn is_configured(&self) -> bool {
        self.config.api_url.is_some() && self.config.api_key.is_some()
    }

    /// Deliver the verification link to `email`.
    pub async fn send_verification(&self, email: &str, verify_url: &str) -> Result<()> {
        let (Some(api_url), Some(api_key)) = (&self.config.api_url, &self.config.api_key) else {
            info!("[dev mail] mail API not configured");
            info!("[dev mail] verification link for {}: {}", email, verify_url);
            return Ok(());
        };

        let body = json!({
            "from": self.config.from,
            "to": [email],
            "subject": "Confirm your email to continue",
            "html": verification_html(verify_url),
        });

        let response = self
            .http
            .post(api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "mail API returned status {}",
                response.status().as_u16()
            ));
        }

        Ok(())
    }
}

fn verification_html(verify_url: &str) -> String {
    format!(
        r#"<div style="font-family: ui-sans-serif, system-ui; line-height: 1.4">
  <h2>Confirm your email</h2>
  <p>Click the button below to unlock access and continue.</p>
  <p style="margin: 24px 0">
    <a href="{verify_url}" style="background:#111;color:#fff;padding:12px 16px;border-radius:10px;text-decoration:none;display:inline-block">
      Confirm my email
    </a>
  </p>
  <p style="color:#666;font-size:12px">If you did not request this, you can ignore this email.</p>
</div>"#
    )
}
