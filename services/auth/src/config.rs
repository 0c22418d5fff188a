//! Email gate service configuration

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Public application origin used in verification links and redirects
    pub app_url: String,
    /// Bearer token for the admin export; endpoint always rejects when unset
    pub admin_token: Option<String>,
    /// Verification token validity window in minutes
    pub token_ttl_minutes: i64,
    /// Listen address for the HTTP server
    pub listen_addr: String,
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `APP_URL`: Public origin (default: "http://localhost:3000")
    /// - `ADMIN_TOKEN`: Admin export bearer token (unset disables the export)
    /// - `VERIFY_TOKEN_TTL_MINUTES`: Token validity in minutes (default: 30)
    /// - `AUTH_LISTEN_ADDR`: Listen address (default: "0.0.0.0:3000")
    pub fn from_env() -> Self {
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|v| !v.is_empty());

        let token_ttl_minutes = std::env::var("VERIFY_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(30);

        let listen_addr =
            std::env::var("AUTH_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        AuthConfig {
            app_url,
            admin_token,
            token_ttl_minutes,
            listen_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_without_env() {
        unsafe {
            std::env::remove_var("APP_URL");
            std::env::remove_var("ADMIN_TOKEN");
            std::env::remove_var("VERIFY_TOKEN_TTL_MINUTES");
            std::env::remove_var("AUTH_LISTEN_ADDR");
        }

        let config = AuthConfig::from_env();
        assert_eq!(config.app_url, "http://localhost:3000");
        assert_eq!(config.admin_token, None);
        assert_eq!(config.token_ttl_minutes, 30);
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    #[serial]
    fn app_url_trailing_slash_is_trimmed() {
        unsafe {
            std::env::set_var("APP_URL", "https://metascrub.example/");
        }

        let config = AuthConfig::from_env();
        assert_eq!(config.app_url, "https://metascrub.example");

        unsafe {
            std::env::remove_var("APP_URL");
        }
    }
}
