use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, errors::ErrorKind as JwtErrorKind, jwk::Jwk,
};

use crate::services::auth::key_set::KeySource;
use crate::services::auth::verifier::{AccessClaims, TokenVerifier, VerifyError};

/// Algorithms accepted when the caller does not say otherwise.
/// Cloudflare Access signs application tokens with RS256.
pub const DEFAULT_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256];

/// Knobs for [`AccessJwtVerifier`].
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    pub algorithms: Vec<Algorithm>,
    pub leeway_seconds: u64,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            algorithms: DEFAULT_ALGORITHMS.to_vec(),
            leeway_seconds: 60,
        }
    }
}

/// Access-token verifier backed by a signing-key source.
///
/// Checks, in order:
/// - the header algorithm is one we accept
/// - a key from `keys` with the header's `kid` verifies the signature
/// - `exp` / `nbf` (with leeway), `iss` equals the trust domain, `aud`
///   contains the policy audience
pub struct AccessJwtVerifier<K: KeySource> {
    keys: K,
    issuer: String,
    audience: String,
    options: VerifierOptions,
}

impl<K: KeySource> std::fmt::Debug for AccessJwtVerifier<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessJwtVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("options", &self.options)
            .finish()
    }
}

impl<K: KeySource> AccessJwtVerifier<K> {
    pub fn new(
        keys: K,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        options: VerifierOptions,
    ) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: audience.into(),
            options,
        }
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = self.options.leeway_seconds;
        validation
    }

    fn decode_with(
        &self,
        token: &str,
        jwk: &Jwk,
        validation: &Validation,
    ) -> Result<AccessClaims, VerifyError> {
        // A key we cannot use (wrong type for the algorithm, bad parameters)
        // simply does not verify this token.
        let key = DecodingKey::from_jwk(jwk).map_err(|_| VerifyError::InvalidSignature)?;

        jsonwebtoken::decode::<AccessClaims>(token, &key, validation)
            .map(|data| data.claims)
            .map_err(|e| self.map_jwt_error(e))
    }

    fn map_jwt_error(&self, err: jsonwebtoken::errors::Error) -> VerifyError {
        match err.kind() {
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidKeyFormat => VerifyError::InvalidSignature,
            JwtErrorKind::ExpiredSignature => VerifyError::Expired,
            JwtErrorKind::ImmatureSignature => VerifyError::NotYetValid,
            JwtErrorKind::InvalidAudience => VerifyError::AudienceMismatch {
                expected: self.audience.clone(),
            },
            JwtErrorKind::InvalidIssuer => VerifyError::IssuerMismatch {
                expected: self.issuer.clone(),
            },
            JwtErrorKind::MissingRequiredClaim(claim) => VerifyError::MissingClaim(claim.clone()),
            _ => VerifyError::Malformed(err.to_string()),
        }
    }
}

#[async_trait]
impl<K: KeySource> TokenVerifier for AccessJwtVerifier<K> {
    async fn verify(&self, token: &str) -> Result<AccessClaims, VerifyError> {
        let header =
            jsonwebtoken::decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;

        if !self.options.algorithms.contains(&header.alg) {
            return Err(VerifyError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.as_deref();
        let candidates = self.keys.keys_for(kid).await?;
        if candidates.is_empty() {
            return Err(VerifyError::UnknownKey(header.kid.clone()));
        }

        let validation = self.validation(header.alg);

        // Without a kid several keys may be candidates; only a signature
        // failure moves on to the next one.
        let mut last_err = VerifyError::InvalidSignature;
        for jwk in &candidates {
            match self.decode_with(token, jwk, &validation) {
                Ok(claims) => return Ok(claims),
                Err(VerifyError::InvalidSignature) => last_err = VerifyError::InvalidSignature,
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }
}
