//! The verification capability the access gate depends on.
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::services::auth::key_set::KeySetError;

/// Verifies an access token and returns its validated claims.
///
/// Implementations must be safe to share across request tasks; any caching
/// they do is their own business.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AccessClaims, VerifyError>;
}

/// Claims carried by a Cloudflare Access application token.
///
/// Registered claims default when absent so that their presence is reported
/// by claim validation (`MissingClaim`) rather than as a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: Audience,

    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub exp: u64,

    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,

    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub token_type: Option<String>,
    #[serde(default)]
    pub identity_nonce: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Default for Audience {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Audience {
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Self::One(s) => s == aud,
            Self::Many(v) => v.iter().any(|s| s == aud),
        }
    }
}

/// Everything that can make a token unacceptable.
///
/// The gate does not branch on these; it renders the text into the 401 body.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed jwt: {0}")]
    Malformed(String),

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("no signing key found for kid {}", .0.as_deref().unwrap_or("<none>"))]
    UnknownKey(Option<String>),

    #[error("failed to verify signature")]
    InvalidSignature,

    #[error("token is expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("expected audience {expected:?} not found in token")]
    AudienceMismatch { expected: String },

    #[error("id token issued by a different provider, expected {expected:?}")]
    IssuerMismatch { expected: String },

    #[error("missing required claim {0:?}")]
    MissingClaim(String),

    #[error("fetching keys: {0}")]
    KeySet(#[from] KeySetError),

    #[error("verification timed out")]
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_accepts_string_or_array() {
        let one: Audience = serde_json::from_str(r#""abc123""#).unwrap();
        let many: Audience = serde_json::from_str(r#"["xyz999", "abc123"]"#).unwrap();

        assert!(one.contains("abc123"));
        assert!(many.contains("abc123"));
        assert!(!many.contains("abc"));
    }

    #[test]
    fn audience_mismatch_names_the_audience() {
        let err = VerifyError::AudienceMismatch {
            expected: "abc123".into(),
        };
        assert_eq!(
            err.to_string(),
            r#"expected audience "abc123" not found in token"#
        );
    }

    #[test]
    fn unknown_key_without_kid() {
        assert_eq!(
            VerifyError::UnknownKey(None).to_string(),
            "no signing key found for kid <none>"
        );
    }

    #[test]
    fn parses_cloudflare_claims() {
        let claims: AccessClaims = serde_json::from_value(serde_json::json!({
            "aud": ["abc123"],
            "email": "user@example.com",
            "exp": 1_700_000_000u64,
            "iat": 1_699_990_000u64,
            "nbf": 1_699_990_000u64,
            "iss": "https://example.cloudflareaccess.com",
            "type": "app",
            "identity_nonce": "6ei69kawdKzMIAPF",
            "sub": "7335d417-61da-459d-899c-0a01c76a2f94",
            "country": "US"
        }))
        .unwrap();

        assert!(claims.aud.contains("abc123"));
        assert_eq!(claims.token_type.as_deref(), Some("app"));
        assert_eq!(claims.email.as_deref(), Some("user@example.com"));
    }
}
