/// file: src/config.rs
/// description: Typed environment configuration with fail-fast parsing.
/// Configuration is loaded from environment variables (dotenv + real env).
///
/// Every setting has a working default so `vidscout search "..."` runs with an
/// empty environment; values that are present but malformed abort startup.
use crate::normalize::Locale;
use std::net::SocketAddr;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Source of raw setting values; absent and empty both read as `None`.
type Lookup = dyn Fn(&str) -> Option<String>;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub search: SearchConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&env_opt)
    }

    fn from_lookup(get: &Lookup) -> anyhow::Result<Self> {
        Ok(Config {
            server: ServerConfig::from_lookup(get)?,
            search: SearchConfig::from_lookup(get)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allow_origins: Vec<String>,
}

impl ServerConfig {
    fn from_lookup(get: &Lookup) -> anyhow::Result<Self> {
        let cors_allow_origins = get("CORS_ALLOW_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToOwned::to_owned)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: opt_u16(get, "PORT")?.unwrap_or(3000),
            cors_allow_origins,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

// ---------------------------------------------------------------------------
// Upstream search page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Origin of the video site; `/results` is appended for searches.
    pub base_url: String,
    /// Sent as the `hl` query parameter and selects the count/label table.
    /// Only Portuguese tags (`pt-BR`, `pt`) are accepted.
    pub locale: String,
    pub accept_language: String,
    pub user_agent: String,
    /// `None` leaves the transport default in place (no client deadline).
    pub timeout_seconds: Option<u64>,
}

impl SearchConfig {
    fn from_lookup(get: &Lookup) -> anyhow::Result<Self> {
        let base_url =
            get("SEARCH_BASE_URL").unwrap_or_else(|| "https://www.youtube.com".to_string());
        Url::parse(&base_url)
            .map_err(|e| anyhow::anyhow!("Invalid SEARCH_BASE_URL `{base_url}`: {e}"))?;

        let locale = get("SEARCH_LOCALE").unwrap_or_else(|| "pt-BR".to_string());
        if Locale::for_tag(&locale).is_none() {
            anyhow::bail!("Unsupported SEARCH_LOCALE `{locale}`: only pt-BR is available");
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            locale,
            accept_language: get("SEARCH_ACCEPT_LANGUAGE")
                .unwrap_or_else(|| "pt-BR,pt;q=0.9".to_string()),
            user_agent: get("SEARCH_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout_seconds: opt_u64(get, "SEARCH_TIMEOUT_SECONDS")?,
        })
    }

    /// Defaults pointed at `base_url`; used by tests against a local stub.
    #[cfg(test)]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            locale: "pt-BR".to_string(),
            accept_language: "pt-BR,pt;q=0.9".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Env-reading helpers
// ---------------------------------------------------------------------------

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn opt_u16(get: &Lookup, key: &str) -> anyhow::Result<Option<u16>> {
    get(key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| anyhow::anyhow!("Invalid u16 value for env var {key}: {raw}"))
        })
        .transpose()
}

fn opt_u64(get: &Lookup, key: &str) -> anyhow::Result<Option<u64>> {
    get(key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| anyhow::anyhow!("Invalid u64 value for env var {key}: {raw}"))
        })
        .transpose()
}
