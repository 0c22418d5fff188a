//! Integration tests for the session credential flow
//!
//! These exercise the path the two services share: the auth service issues a
//! credential and serializes the cookie, the media service extracts it from a
//! Cookie header and verifies it.

use common::session::{SessionConfig, SessionError, SessionService, DEFAULT_COOKIE_NAME};
use uuid::Uuid;

fn service(secret: &str) -> SessionService {
    SessionService::new(SessionConfig {
        secret: secret.to_string(),
        cookie_name: DEFAULT_COOKIE_NAME.to_string(),
        lifetime_secs: 604_800,
        secure: false,
    })
    .expect("session service")
}

#[test]
fn issue_set_cookie_then_verify_from_header() {
    let issuer = service("shared-secret");
    let verifier = service("shared-secret");

    let lead_id = Uuid::new_v4();
    let credential = issuer.issue(lead_id, "alice@example.com", true).unwrap();

    // The Set-Cookie value round-trips through a client echoing it back.
    let set_cookie = issuer.cookie(&credential);
    let cookie_pair = set_cookie.split(';').next().unwrap();

    let identity = verifier.verify_cookie_header(cookie_pair).unwrap();
    assert_eq!(identity.lead_id, lead_id);
    assert_eq!(identity.email, "alice@example.com");
    assert!(identity.verified);
}

#[test]
fn services_with_different_secrets_reject_each_other() {
    let issuer = service("secret-one");
    let verifier = service("secret-two");

    let credential = issuer
        .issue(Uuid::new_v4(), "alice@example.com", true)
        .unwrap();

    assert_eq!(
        verifier.verify_token(&credential).err(),
        Some(SessionError::InvalidSignature)
    );
}

#[test]
fn renamed_cookie_is_invisible_to_a_default_verifier() {
    let issuer = SessionService::new(SessionConfig {
        secret: "shared-secret".to_string(),
        cookie_name: "other_session".to_string(),
        lifetime_secs: 604_800,
        secure: false,
    })
    .expect("session service");
    let verifier = service("shared-secret");

    let credential = issuer
        .issue(Uuid::new_v4(), "alice@example.com", true)
        .unwrap();
    let header = format!("other_session={credential}");

    assert_eq!(
        verifier.verify_cookie_header(&header).err(),
        Some(SessionError::MissingCredential)
    );
}
