//! Signed bearer tokens.
//! Stateless HS256 tokens carrying {sub, iat, exp}; the signing key is the
//! base64-decoded configured secret and the expiry window is a configured
//! millisecond TTL. Nothing here keeps per-token state, so a single service
//! value is shared freely across request tasks.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identity::Principal;

/// Claims embedded in every issued token. Timestamps are Unix seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_ms: i64,
}

impl TokenService {
    /// Build a service from the base64-encoded secret and TTL in
    /// milliseconds. Both are required configuration; a secret that does not
    /// decode is a startup error, not a per-request one.
    pub fn new(secret_b64: &str, ttl_ms: i64) -> Result<Self> {
        let secret = BASE64
            .decode(secret_b64)
            .context("signing secret is not valid base64")?;
        if secret.len() < 32 {
            tracing::warn!("signing secret is shorter than recommended (32 bytes)");
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry must be exact for the configured TTL to mean anything.
        validation.leeway = 0;
        validation.validate_aud = false;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            validation,
            ttl_ms,
        })
    }

    /// Issue a token for an authenticated principal.
    pub fn issue(&self, principal: &Principal) -> Result<String> {
        let iat = Utc::now().timestamp();
        // Claims carry whole seconds; round the millisecond TTL up so a
        // sub-second lifetime still outlives its own issuance.
        let exp = iat + (self.ttl_ms + 999) / 1000;
        let claims = Claims { sub: principal.username.clone(), iat, exp };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("failed to sign token")
    }

    /// Verify signature and expiry. Every rejection cause is logged under its
    /// own category but callers only ever see "invalid".
    pub fn validate(&self, token: &str) -> bool {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(_) => true,
            Err(e) => {
                use jsonwebtoken::errors::ErrorKind::*;
                match e.kind() {
                    ExpiredSignature => debug!("bearer token is expired: {e}"),
                    InvalidSignature => debug!("bearer token signature mismatch: {e}"),
                    InvalidToken | Base64(_) | Json(_) | Utf8(_) => {
                        debug!("malformed bearer token: {e}")
                    }
                    InvalidAlgorithm | InvalidAlgorithmName => {
                        debug!("unsupported bearer token algorithm: {e}")
                    }
                    _ => debug!("bearer token rejected: {e}"),
                }
                false
            }
        }
    }

    /// Subject of a verified token. Only meaningful after `validate`
    /// succeeded; the parse is still checked, so an unvalidated token yields
    /// an error rather than a forged subject.
    pub fn subject(&self, token: &str) -> Result<String> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .context("token no longer verifies")?;
        Ok(data.claims.sub)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl_ms", &self.ttl_ms).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 48 bytes of zeroes, base64-encoded; plenty for HS256.
    const SECRET: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    fn principal(username: &str) -> Principal {
        Principal {
            id: "abc123".to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            authorities: vec!["ROLE_USER".to_string()],
        }
    }

    #[test]
    fn issued_token_validates_and_carries_subject() {
        let svc = TokenService::new(SECRET, 60_000).unwrap();
        let token = svc.issue(&principal("alice")).unwrap();
        assert!(svc.validate(&token));
        assert_eq!(svc.subject(&token).unwrap(), "alice");
    }

    #[test]
    fn expired_token_is_invalid() {
        // Negative TTL puts exp in the past at issue time.
        let svc = TokenService::new(SECRET, -5_000).unwrap();
        let token = svc.issue(&principal("alice")).unwrap();
        assert!(!svc.validate(&token));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let svc = TokenService::new(SECRET, 60_000).unwrap();
        let token = svc.issue(&principal("alice")).unwrap();
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert_ne!(token, tampered);
        assert!(!svc.validate(&tampered));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let issuer = TokenService::new(SECRET, 60_000).unwrap();
        let other = TokenService::new(
            "//////////////////////////////////////////8=", // different key bytes
            60_000,
        )
        .unwrap();
        let token = issuer.issue(&principal("alice")).unwrap();
        assert!(!other.validate(&token));
    }

    #[test]
    fn garbage_tokens_are_invalid() {
        let svc = TokenService::new(SECRET, 60_000).unwrap();
        assert!(!svc.validate(""));
        assert!(!svc.validate("not.a.token"));
        assert!(!svc.validate("a.b"));
        assert!(svc.subject("not.a.token").is_err());
    }

    #[test]
    fn non_base64_secret_is_a_startup_error() {
        assert!(TokenService::new("!!! not base64 !!!", 1_000).is_err());
    }

    #[test]
    fn short_ttl_rounds_up_to_a_full_second() {
        let svc = TokenService::new(SECRET, 500).unwrap();
        let token = svc.issue(&principal("alice")).unwrap();
        assert!(svc.validate(&token));
    }
}
