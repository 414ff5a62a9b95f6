/// Factory: build the production `TokenVerifier` from application `Config`.
use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::services::auth::{AccessJwtVerifier, RemoteKeySet, TokenVerifier, VerifierOptions};

pub fn build_verifier(config: &Config) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    let certs_url = config.certs_url()?;

    // Keys are fetched on first use, not here.
    let keys = RemoteKeySet::new(certs_url, config.certs_cache_ttl, config.verify_timeout)
        .context("building signing-key client")?;

    let verifier = AccessJwtVerifier::new(
        keys,
        config.team_domain.clone(),
        config.policy_aud.clone(),
        VerifierOptions {
            leeway_seconds: config.token_leeway_seconds,
            ..VerifierOptions::default()
        },
    );

    Ok(Arc::new(verifier))
}
