// Upstream X API HTTP client.
// Performs single authenticated GETs through the response cache and
// separates transport failures from completed non-200 responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use crate::cache::{ResponseCache, cache_key};
use crate::config::Config;
use crate::error::{ApiError, Result};

use super::params::{
    EXPANSIONS, MEDIA_FIELDS, PROFILE_FIELDS, TWEET_FIELDS, USER_FIELDS,
};
use super::types::RateLimit;

/// Per-request timeout for upstream fetches. Expiry is a transport
/// failure, not retried here.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A completed upstream response: status, decoded body, headers.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
    pub headers: HashMap<String, String>,
}

impl UpstreamResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Normalized rate-limit summary from this response's headers.
    pub fn rate_limit(&self) -> RateLimit {
        RateLimit::from_headers(&self.headers)
    }
}

/// One upstream query that can be advanced with a pagination token.
/// The same shape drives the search path, the timeline primary path,
/// and the timeline fallback path.
#[derive(Debug, Clone)]
pub enum PageQuery {
    /// Recent-search endpoint; `query` carries any `-is:` operators.
    Search { query: String, limit: u32 },
    /// Direct user-timeline endpoint.
    UserTweets {
        user_id: String,
        limit: u32,
        exclude: Option<String>,
    },
}

/// Authenticated client for the upstream API.
///
/// Every fetch goes through the shared [`ResponseCache`]; only 200
/// responses are ever served from or written to it.
pub struct UpstreamClient {
    client: Client,
    api_base: String,
    cache: Arc<ResponseCache>,
    cache_ttl: i64,
}

impl UpstreamClient {
    /// Create a client with the configured bearer credential and an
    /// injected response cache.
    pub fn new(config: &Config, cache: Arc<ResponseCache>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.bearer_token))
                .map_err(|_| ApiError::InvalidToken)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cache,
            cache_ttl: config.cache_ttl,
        })
    }

    /// GET through the cache. A live entry for the same URL and
    /// parameters is returned without a network call; a live fetch
    /// that completes with a non-200 status returns normally so
    /// callers can branch on the status code.
    pub async fn get_cached(&self, url: &str, params: &[(&str, String)]) -> Result<UpstreamResponse> {
        let key = cache_key(url, params);
        if self.cache_ttl > 0 {
            if let Some(hit) = self.cache.lookup(&key) {
                debug!(url, "cache hit");
                return Ok(UpstreamResponse {
                    status: hit.status,
                    body: hit.body,
                    headers: hit.headers,
                });
            }
        }

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let text = response.text().await.map_err(ApiError::Transport)?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "text": text }));

        self.cache.store(&key, status, &body, &headers, self.cache_ttl);
        debug!(url, status, "upstream fetch");
        Ok(UpstreamResponse {
            status,
            body,
            headers,
        })
    }

    /// Fetch one page for a query, following a continuation cursor.
    pub async fn fetch_page(
        &self,
        query: &PageQuery,
        cursor: Option<&str>,
    ) -> Result<UpstreamResponse> {
        let (url, mut params) = match query {
            PageQuery::Search { query, limit } => (
                format!("{}/tweets/search/recent", self.api_base),
                vec![
                    ("query", query.clone()),
                    ("max_results", limit.to_string()),
                    ("tweet.fields", TWEET_FIELDS.to_string()),
                    ("expansions", EXPANSIONS.to_string()),
                    ("user.fields", USER_FIELDS.to_string()),
                    ("media.fields", MEDIA_FIELDS.to_string()),
                ],
            ),
            PageQuery::UserTweets {
                user_id,
                limit,
                exclude,
            } => {
                let mut params = vec![
                    ("max_results", limit.to_string()),
                    ("tweet.fields", TWEET_FIELDS.to_string()),
                    ("expansions", EXPANSIONS.to_string()),
                    ("user.fields", USER_FIELDS.to_string()),
                    ("media.fields", MEDIA_FIELDS.to_string()),
                ];
                if let Some(exclude) = exclude {
                    params.push(("exclude", exclude.clone()));
                }
                (format!("{}/users/{}/tweets", self.api_base, user_id), params)
            }
        };

        if let Some(token) = cursor {
            params.push(("pagination_token", token.to_string()));
        }
        self.get_cached(&url, &params).await
    }

    /// Look up a user profile by username.
    pub async fn user_by_username(&self, username: &str) -> Result<UpstreamResponse> {
        let url = format!("{}/users/by/username/{}", self.api_base, username);
        let params = [("user.fields", PROFILE_FIELDS.to_string())];
        self.get_cached(&url, &params).await
    }
}
