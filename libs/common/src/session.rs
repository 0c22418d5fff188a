//! Stateless session credentials for the email gate.
//!
//! After a successful email verification the auth service mints a signed
//! credential and sets it as a cookie; the media service requires it on every
//! protected request. Verification is self-contained: it needs the credential
//! bytes, the shared signing secret, and the clock, and performs no database
//! or network I/O. There is no server-side revocation; expiry is the only
//! invalidation mechanism.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default cookie name when `SESSION_COOKIE_NAME` is not set
pub const DEFAULT_COOKIE_NAME: &str = "metascrub_session";

/// Default credential lifetime: 7 days
pub const DEFAULT_LIFETIME_SECS: u64 = 604_800;

/// Ways a presented credential can fail verification.
///
/// Callers at the API boundary collapse all of these into a single
/// "not verified" outcome; the distinction exists for logging and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The signing secret is missing; fatal at startup, never recoverable
    #[error("SESSION_SECRET is not configured")]
    Configuration,
    /// No session cookie was presented
    #[error("no session credential presented")]
    MissingCredential,
    /// The credential does not parse as a well-formed signed token
    #[error("malformed session credential")]
    Malformed,
    /// The integrity proof does not match the claims
    #[error("session credential signature mismatch")]
    InvalidSignature,
    /// The signature is valid but the claims are incomplete
    #[error("session credential claims are invalid")]
    InvalidClaims,
    /// The signature is valid but the credential is past its lifetime
    #[error("session credential has expired")]
    Expired,
}

/// Claims carried inside the signed credential
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Lead ID
    pub sub: Uuid,
    /// Lead email
    pub email: String,
    /// Whether the email was verified
    pub verified: bool,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// The identity a valid credential proves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub lead_id: Uuid,
    pub email: String,
    pub verified: bool,
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared signing secret; must be non-empty
    pub secret: String,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Credential lifetime in seconds
    pub lifetime_secs: u64,
    /// Whether to mark the cookie `Secure` (on in production)
    pub secure: bool,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_SECRET`: Shared signing secret (required)
    /// - `SESSION_COOKIE_NAME`: Cookie name (default: "metascrub_session")
    /// - `SESSION_LIFETIME_SECS`: Credential lifetime in seconds (default: 604800)
    /// - `SESSION_COOKIE_SECURE`: Mark the cookie `Secure` (default: false)
    pub fn from_env() -> Result<Self, SessionError> {
        let secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or(SessionError::Configuration)?;

        let cookie_name = std::env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let lifetime_secs = std::env::var("SESSION_LIFETIME_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_LIFETIME_SECS);

        let secure = std::env::var("SESSION_COOKIE_SECURE")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(SessionConfig {
            secret,
            cookie_name,
            lifetime_secs,
            secure,
        })
    }
}

/// Issues and verifies session credentials
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: SessionConfig,
}

impl SessionService {
    /// Initialize a new session service.
    ///
    /// Fails with [`SessionError::Configuration`] when the secret is empty;
    /// callers treat that as fatal at startup.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        if config.secret.is_empty() {
            return Err(SessionError::Configuration);
        }

        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(SessionService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Mint a credential for a verified lead.
    ///
    /// The caller asserts `verified`; the issuer does not re-check it against
    /// the store. No side effects beyond the signing computation.
    pub fn issue(
        &self,
        lead_id: Uuid,
        email: &str,
        verified: bool,
    ) -> Result<String, SessionError> {
        if lead_id.is_nil() || email.trim().is_empty() {
            return Err(SessionError::InvalidClaims);
        }

        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: lead_id,
            email: email.to_string(),
            verified,
            iat: now,
            exp: now + self.config.lifetime_secs,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| SessionError::Configuration)
    }

    /// Validate a raw credential string and return the identity it proves.
    ///
    /// The integrity proof is checked (in constant time) before any claim is
    /// interpreted, and expiry is enforced here, not left to callers.
    pub fn verify_token(&self, credential: &str) -> Result<Identity, SessionError> {
        let data = decode::<Claims>(credential, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => SessionError::Expired,
                ErrorKind::InvalidSignature => SessionError::InvalidSignature,
                ErrorKind::MissingRequiredClaim(_) => SessionError::InvalidClaims,
                ErrorKind::Json(_) => SessionError::InvalidClaims,
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                    SessionError::Malformed
                }
                _ => SessionError::InvalidSignature,
            },
        )?;

        let claims = data.claims;
        if claims.sub.is_nil() || claims.email.trim().is_empty() {
            return Err(SessionError::InvalidClaims);
        }

        Ok(Identity {
            lead_id: claims.sub,
            email: claims.email,
            verified: claims.verified,
        })
    }

    /// Extract the session cookie from a raw `Cookie` header and validate it.
    ///
    /// The header is split on `;`, each part trimmed, and the configured
    /// cookie name matched exactly (first match wins). A missing cookie is
    /// [`SessionError::MissingCredential`], indistinguishable to callers from
    /// a request with no cookie header at all.
    pub fn verify_cookie_header(&self, cookie_header: &str) -> Result<Identity, SessionError> {
        let raw = cookie_value(cookie_header, &self.config.cookie_name)
            .ok_or(SessionError::MissingCredential)?;

        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| SessionError::Malformed)?;

        self.verify_token(&decoded)
    }

    /// Serialize a `Set-Cookie` value carrying the credential.
    pub fn cookie(&self, credential: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.config.cookie_name, credential, self.config.lifetime_secs
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Credential lifetime in seconds
    pub fn lifetime_secs(&self) -> u64 {
        self.config.lifetime_secs
    }
}

/// Find a cookie value by exact name in a `Cookie` header.
fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serial_test::serial;

    fn config() -> SessionConfig {
        SessionConfig {
            secret: "test-secret-which-is-long-enough".to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            secure: false,
        }
    }

    fn service() -> SessionService {
        SessionService::new(config()).unwrap()
    }

    fn encode_claims(service: &SessionService, claims: &Claims) -> String {
        encode(&Header::default(), claims, &service.encoding_key).unwrap()
    }

    #[test]
    fn round_trip_preserves_identity() {
        let service = service();
        let lead_id = Uuid::new_v4();

        let credential = service.issue(lead_id, "alice@example.com", true).unwrap();
        let identity = service.verify_token(&credential).unwrap();

        assert_eq!(identity.lead_id, lead_id);
        assert_eq!(identity.email, "alice@example.com");
        assert!(identity.verified);
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let mut config = config();
        config.secret = String::new();
        assert_eq!(
            SessionService::new(config).err(),
            Some(SessionError::Configuration)
        );
    }

    #[test]
    fn issue_rejects_empty_identity() {
        let service = service();
        assert_eq!(
            service.issue(Uuid::new_v4(), "  ", true).err(),
            Some(SessionError::InvalidClaims)
        );
        assert_eq!(
            service.issue(Uuid::nil(), "a@example.com", true).err(),
            Some(SessionError::InvalidClaims)
        );
    }

    #[test]
    fn every_flipped_signature_byte_is_rejected() {
        let service = service();
        let credential = service
            .issue(Uuid::new_v4(), "alice@example.com", true)
            .unwrap();

        let parts: Vec<&str> = credential.split('.').collect();
        assert_eq!(parts.len(), 3);
        let signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();

        for index in 0..signature.len() {
            let mut tampered = signature.clone();
            tampered[index] ^= 0x01;
            let forged = format!(
                "{}.{}.{}",
                parts[0],
                parts[1],
                URL_SAFE_NO_PAD.encode(&tampered)
            );
            assert_eq!(
                service.verify_token(&forged).err(),
                Some(SessionError::InvalidSignature),
                "flipped signature byte {index} was accepted"
            );
        }
    }

    #[test]
    fn tampered_claims_fail_signature_check() {
        let service = service();
        let credential = service
            .issue(Uuid::new_v4(), "alice@example.com", true)
            .unwrap();

        let parts: Vec<&str> = credential.split('.').collect();
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let json = String::from_utf8(payload).unwrap();
        let swapped = json.replace("alice@example.com", "mallory@example.com");
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(swapped.as_bytes()),
            parts[2]
        );

        assert_eq!(
            service.verify_token(&forged).err(),
            Some(SessionError::InvalidSignature)
        );
    }

    #[test]
    fn truncated_credential_is_malformed() {
        let service = service();
        let credential = service
            .issue(Uuid::new_v4(), "alice@example.com", true)
            .unwrap();
        let parts: Vec<&str> = credential.split('.').collect();

        assert_eq!(
            service
                .verify_token(&format!("{}.{}", parts[0], parts[1]))
                .err(),
            Some(SessionError::Malformed)
        );
        assert_eq!(
            service.verify_token("not-a-credential").err(),
            Some(SessionError::Malformed)
        );
    }

    #[test]
    fn expired_credential_fails_with_expiry_not_signature() {
        let service = service();
        let now = chrono::Utc::now().timestamp() as u64;

        // Issued 8 days ago with a 7-day lifetime.
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            verified: true,
            iat: now - 8 * 86_400,
            exp: now - 86_400,
        };
        let credential = encode_claims(&service, &claims);

        assert_eq!(
            service.verify_token(&credential).err(),
            Some(SessionError::Expired)
        );
    }

    #[test]
    fn credential_within_lifetime_still_verifies() {
        let service = service();
        let now = chrono::Utc::now().timestamp() as u64;

        // Issued 6 days ago with a 7-day lifetime.
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            verified: true,
            iat: now - 6 * 86_400,
            exp: now + 86_400,
        };
        let credential = encode_claims(&service, &claims);

        assert!(service.verify_token(&credential).is_ok());
    }

    #[test]
    fn empty_email_claim_is_rejected_after_signature_check() {
        let service = service();
        let now = chrono::Utc::now().timestamp() as u64;

        let claims = Claims {
            sub: Uuid::new_v4(),
            email: String::new(),
            verified: true,
            iat: now,
            exp: now + 3600,
        };
        let credential = encode_claims(&service, &claims);

        assert_eq!(
            service.verify_token(&credential).err(),
            Some(SessionError::InvalidClaims)
        );
    }

    #[test]
    fn cookie_header_extraction_matches_name_exactly() {
        let service = service();
        let credential = service
            .issue(Uuid::new_v4(), "alice@example.com", true)
            .unwrap();

        let header = format!(
            "other=1; {}={}; trailing=x",
            DEFAULT_COOKIE_NAME, credential
        );
        assert!(service.verify_cookie_header(&header).is_ok());

        // A cookie whose name merely starts with ours must not match.
        let prefixed = format!("{}x={}", DEFAULT_COOKIE_NAME, credential);
        assert_eq!(
            service.verify_cookie_header(&prefixed).err(),
            Some(SessionError::MissingCredential)
        );
    }

    #[test]
    fn missing_cookie_and_name_mismatch_look_identical() {
        let service = service();

        assert_eq!(
            service.verify_cookie_header("").err(),
            Some(SessionError::MissingCredential)
        );
        assert_eq!(
            service.verify_cookie_header("unrelated=value").err(),
            Some(SessionError::MissingCredential)
        );
    }

    #[test]
    fn first_matching_cookie_wins() {
        let service = service();
        let credential = service
            .issue(Uuid::new_v4(), "alice@example.com", true)
            .unwrap();

        let header = format!(
            "{name}={cred}; {name}=garbage",
            name = DEFAULT_COOKIE_NAME,
            cred = credential
        );
        let identity = service.verify_cookie_header(&header).unwrap();
        assert_eq!(identity.email, "alice@example.com");
    }

    #[test]
    fn cookie_serialization_carries_expected_attributes() {
        let service = service();
        let cookie = service.cookie("value");
        assert!(cookie.starts_with("metascrub_session=value"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        let mut secure_config = config();
        secure_config.secure = true;
        let secure_service = SessionService::new(secure_config).unwrap();
        assert!(secure_service.cookie("value").ends_with("; Secure"));
    }

    #[test]
    #[serial]
    fn config_from_env_requires_secret() {
        unsafe {
            std::env::remove_var("SESSION_SECRET");
        }
        assert_eq!(
            SessionConfig::from_env().err(),
            Some(SessionError::Configuration)
        );

        unsafe {
            std::env::set_var("SESSION_SECRET", "secret");
        }
        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert_eq!(config.lifetime_secs, DEFAULT_LIFETIME_SECS);
        assert!(!config.secure);

        unsafe {
            std::env::remove_var("SESSION_SECRET");
        }
    }
}
