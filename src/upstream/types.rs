// Upstream X API response types.
// Lenient serde models: every field is defaulted and unknown fields
// are carried in a flattened map, so a page survives a raw re-export
// and upstream schema additions are ignored rather than fatal.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// One raw upstream page: `{data, includes, meta}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Tweet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Includes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Page {
    /// Lenient decode; an unexpected body shape yields an empty page.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Continuation cursor for the next page, if one was returned.
    pub fn next_token(&self) -> Option<&str> {
        self.meta.as_ref()?.next_token.as_deref()
    }

    /// The raw shape rendered when no page was ever fetched.
    pub fn empty_value() -> Value {
        json!({ "data": [], "includes": {}, "meta": {} })
    }
}

/// Cross-referenced entities returned alongside a page of tweets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Pagination metadata for a page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tweet record. Hydration attaches `author` and `media`, resolved
/// from the page includes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub possibly_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub public_metrics: HashMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Attachments>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub referenced_tweets: Vec<ReferencedTweet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Media keys attached to a tweet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media_keys: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference to a related tweet (retweet, reply, quote).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferencedTweet {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An upstream user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub public_metrics: HashMap<String, u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An attached media entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /users/by/username/{username}` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub data: Option<User>,
}

/// Normalized rate-limit summary parsed from upstream headers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_epoch: Option<u64>,
    pub reset_utc: Option<String>,
    pub seconds_until_reset: Option<i64>,
}

impl RateLimit {
    /// Parse the `x-rate-limit-*` headers into a summary.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        let limit = parse("x-rate-limit-limit");
        let remaining = parse("x-rate-limit-remaining");
        let reset_epoch = parse("x-rate-limit-reset");
        let reset_utc = reset_epoch
            .and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0))
            .map(|dt: DateTime<Utc>| dt.to_rfc3339());
        let seconds_until_reset =
            reset_epoch.map(|epoch| (epoch as i64 - Utc::now().timestamp()).max(0));

        Self {
            limit,
            remaining,
            reset_epoch,
            reset_utc,
            seconds_until_reset,
        }
    }
}
