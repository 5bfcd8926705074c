pub mod admin;
pub mod lens;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use admin::{AdminRegistry, StaticAdminRegistry};
pub use lens::{LensClient, LensError};

/// Access token payload. Only `id` is read; other claims are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Address of the wallet the token was issued to
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub exp: i64,
}

impl Claims {
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            role: Some("normal".to_string()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Address of the caller, derived from a verified token for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirms an access token is currently valid (signature, expiry, revocation).
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> bool;
}

/// Whether an address currently controls a profile. Must reflect live state.
#[async_trait]
pub trait OwnershipChecker: Send + Sync {
    async fn owns(&self, caller: &CallerIdentity, profile_id: &str) -> bool;
}

/// Read the subject out of a token without checking its signature.
///
/// Only call this after an [`IdentityVerifier`] accepted the same token.
pub fn extract_subject(token: &str) -> Option<CallerIdentity> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) if !data.claims.id.is_empty() => Some(CallerIdentity(data.claims.id)),
        Ok(_) => None,
        Err(e) => {
            debug!("Failed to decode access token payload: {}", e);
            None
        }
    }
}

/// Verifies HS256 tokens signed with a shared secret
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> bool {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(_) => true,
            Err(e) => {
                debug!("Access token rejected: {}", e);
                false
            }
        }
    }
}

/// Sign claims with a shared secret, for local deployments and tests
pub fn sign_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[tokio::test]
    async fn verifies_signature_and_expiry() {
        let verifier = JwtIdentityVerifier::new(SECRET);

        let good = sign_token(&Claims::new("0xabc", Duration::hours(1)), SECRET).unwrap();
        assert!(verifier.verify(&good).await);

        let forged = sign_token(&Claims::new("0xabc", Duration::hours(1)), "other").unwrap();
        assert!(!verifier.verify(&forged).await);

        let expired = sign_token(&Claims::new("0xabc", Duration::hours(-2)), SECRET).unwrap();
        assert!(!verifier.verify(&expired).await);

        assert!(!verifier.verify("not-a-jwt").await);
    }

    #[test]
    fn extracts_subject_regardless_of_signer() {
        let token = sign_token(&Claims::new("0xabc", Duration::hours(-2)), "whoever").unwrap();
        assert_eq!(extract_subject(&token).unwrap().address(), "0xabc");
    }

    #[test]
    fn extraction_fails_on_garbage() {
        assert!(extract_subject("a.b.c").is_none());
        assert!(extract_subject("").is_none());

        let blank = sign_token(&Claims::new("", Duration::hours(1)), SECRET).unwrap();
        assert!(extract_subject(&blank).is_none());
    }
}
