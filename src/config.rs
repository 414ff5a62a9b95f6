/*
 * Responsibility
 * - 環境変数の読み込み (CF_TEAMDOMAIN, CF_POLICY_AUD と任意の調整値)
 * - 設定値のバリデーション (不足・NOTSET なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

/// Placeholder value deployment templates use for "not configured".
pub const UNSET_SENTINEL: &str = "NOTSET";

/// Path of the signing-key endpoint below the trust domain.
pub const CERTS_PATH: &str = "/cdn-cgi/access/certs";

const LISTEN_PORT: u16 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Limits applied to every request by the HTTP-level middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} env var not set", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    /// Issuer base URL, without a trailing slash.
    pub team_domain: String,
    pub policy_aud: String,

    pub token_leeway_seconds: u64,
    pub verify_timeout: Duration,
    pub certs_cache_ttl: Duration,

    pub http: HttpLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// `CF_POLICY_AUD` is checked before `CF_TEAMDOMAIN`, so a process missing
    /// both reports the audience first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let policy_aud = required(&lookup, "CF_POLICY_AUD")?;

        let team_domain = required(&lookup, "CF_TEAMDOMAIN")?
            .trim_end_matches('/')
            .to_string();
        Url::parse(&team_domain).map_err(|_| ConfigError::Invalid("CF_TEAMDOMAIN"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let token_leeway_seconds = lookup("CF_TOKEN_LEEWAY_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(60);

        let verify_timeout = lookup("CF_VERIFY_TIMEOUT_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let certs_cache_ttl = lookup("CF_CERTS_CACHE_TTL_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        let defaults = HttpLimits::default();

        // The gate must get to answer 401 before the global timeout turns a
        // slow verification into a 408.
        let request_timeout = lookup("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout)
            .max(verify_timeout + Duration::from_secs(1));

        let body_limit_bytes = lookup("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(defaults.body_limit_bytes);

        Ok(Self {
            addr: SocketAddr::from(([0, 0, 0, 0], LISTEN_PORT)),
            app_env,
            team_domain,
            policy_aud,
            token_leeway_seconds,
            verify_timeout,
            certs_cache_ttl,
            http: HttpLimits {
                request_timeout,
                body_limit_bytes,
            },
        })
    }

    /// Endpoint serving the issuer's public signing keys.
    pub fn certs_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("{}{}", self.team_domain, CERTS_PATH))
            .map_err(|_| ConfigError::Invalid("CF_TEAMDOMAIN"))
    }
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() && v.trim() != UNSET_SENTINEL => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}
