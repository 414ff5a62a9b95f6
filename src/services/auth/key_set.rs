//! Signing keys for access-token verification.
//!
//! `RemoteKeySet` fetches the issuer's JWKS lazily on first use, caches it,
//! and fetches again when the cache is older than its TTL or when a token
//! names a `kid` the cache does not know (key rotation).
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use url::Url;

/// Key-set retrieval errors.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Source of candidate verification keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Keys that may have signed a token with the given `kid`.
    ///
    /// Without a `kid` every key is a candidate. An empty result means no
    /// key matches.
    async fn keys_for(&self, kid: Option<&str>) -> Result<Vec<Jwk>, KeySetError>;
}

fn select(set: &JwkSet, kid: Option<&str>) -> Vec<Jwk> {
    match kid {
        Some(kid) => set.find(kid).cloned().into_iter().collect(),
        None => set.keys.clone(),
    }
}

/// A fixed key set (tests, or keys pinned through configuration).
#[async_trait]
impl KeySource for JwkSet {
    async fn keys_for(&self, kid: Option<&str>) -> Result<Vec<Jwk>, KeySetError> {
        Ok(select(self, kid))
    }
}

struct CachedKeys {
    set: JwkSet,
    fetched_at: Instant,
    // Bumped by every successful fetch.
    generation: u64,
}

/// JWKS fetched over HTTP and cached in memory.
pub struct RemoteKeySet {
    url: Url,
    http: reqwest::Client,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
    // Held for the duration of a fetch; waiters reuse its result.
    refresh: Mutex<()>,
}

impl std::fmt::Debug for RemoteKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKeySet")
            .field("url", &self.url.as_str())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// What a reader saw in the cache before deciding to fetch.
enum Lookup {
    Hit(Vec<Jwk>),
    Miss { generation: u64 },
}

impl RemoteKeySet {
    /// `timeout` bounds each HTTP request to the certs endpoint.
    pub fn new(url: Url, ttl: Duration, timeout: Duration) -> Result<Self, KeySetError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            http,
            ttl,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        })
    }

    async fn lookup(&self, kid: Option<&str>) -> Lookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return Lookup::Miss { generation: 0 };
        };

        if cached.fetched_at.elapsed() < self.ttl {
            let keys = select(&cached.set, kid);
            if !keys.is_empty() {
                return Lookup::Hit(keys);
            }
        }
        Lookup::Miss {
            generation: cached.generation,
        }
    }

    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        tracing::debug!(url = %self.url, "fetching signing keys");

        let set = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<JwkSet>()
            .await?;

        tracing::info!(url = %self.url, keys = set.keys.len(), "signing keys refreshed");
        Ok(set)
    }
}

#[async_trait]
impl KeySource for RemoteKeySet {
    async fn keys_for(&self, kid: Option<&str>) -> Result<Vec<Jwk>, KeySetError> {
        let seen = match self.lookup(kid).await {
            Lookup::Hit(keys) => return Ok(keys),
            Lookup::Miss { generation } => generation,
        };

        let _guard = self.refresh.lock().await;

        // A fetch that completed while we waited is as fresh as one we would
        // make now, so its answer stands even when the kid is absent.
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.generation != seen) {
                return Ok(select(&cached.set, kid));
            }
        }

        let set = self.fetch().await?;
        let keys = select(&set, kid);

        *self.cache.write().await = Some(CachedKeys {
            set,
            fetched_at: Instant::now(),
            generation: seen + 1,
        });

        Ok(keys)
    }
}
