// Process configuration loaded from the environment.
// Follows the deployment contract: X_BEARER_TOKEN, API_BASE,
// CACHE_TTL, and PORT.

use crate::error::{ApiError, Result};

/// Default upstream API base URL.
const DEFAULT_API_BASE: &str = "https://api.x.com/2";

/// Default cache TTL in seconds. A value `<= 0` disables the cache.
const DEFAULT_CACHE_TTL: i64 = 60;

/// Default listen port.
const DEFAULT_PORT: u16 = 5000;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer credential for the upstream API.
    pub bearer_token: String,
    /// Upstream API base URL, without a trailing slash.
    pub api_base: String,
    /// Response cache TTL in seconds; `<= 0` disables caching.
    pub cache_ttl: i64,
    /// HTTP listen port.
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let bearer_token = std::env::var("X_BEARER_TOKEN").map_err(|_| ApiError::MissingToken)?;
        let api_base = std::env::var("API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let cache_ttl = std::env::var("CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            bearer_token,
            api_base,
            cache_ttl,
            port,
        })
    }
}
