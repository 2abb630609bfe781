// Core request orchestration.
// Translates one client call into upstream fetch loops and selects
// the response representation. The HTTP layer above only parses
// parameters and renders what these functions return.

use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::export::{Export, safe_stem};
use crate::fetch::paginate::{BoundQuery, FetchResult, paginate};
use crate::fetch::rows::user_row;
use crate::fetch::timeline::fetch_with_fallback;
use crate::upstream::client::{PageQuery, UpstreamClient};
use crate::upstream::params::{apply_excludes, clamp_or, resolve_exclude};
use crate::upstream::types::{Page, User, UserEnvelope};

/// Requested response representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Csv,
}

impl Format {
    /// Parse the `format` query parameter; anything but `csv` means
    /// JSON.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("csv") => Format::Csv,
            _ => Format::Json,
        }
    }
}

/// Parameters for the recent-search entry point.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<u32>,
    pub exclude: Option<String>,
    pub next_token: Option<String>,
    pub format: Format,
    pub pages: Option<u32>,
}

/// Parameters for the profile-with-timeline entry point.
#[derive(Debug, Clone, Default)]
pub struct UserRequest {
    pub username: String,
    pub with_tweets: bool,
    pub limit: Option<u32>,
    pub exclude: Option<String>,
    pub next_token: Option<String>,
    pub format: Format,
    pub pages: Option<u32>,
}

/// Run a recent search across up to the requested page budget.
pub async fn search(client: &UpstreamClient, req: SearchRequest) -> Result<Export> {
    let q = req.query.trim();
    if q.is_empty() {
        return Err(ApiError::Validation("missing query param q".into()));
    }

    let limit = clamp_or(req.limit, 10, 10, 100);
    let pages = clamp_or(req.pages, 1, 1, 20);
    let exclude = resolve_exclude(req.exclude.as_deref());
    let query = apply_excludes(q, &exclude);

    let source = BoundQuery {
        client,
        query: PageQuery::Search { query, limit },
    };
    let result = paginate(&source, pages, req.next_token.clone()).await?;
    info!(
        pages = result.pages_fetched,
        rows = result.rows.len(),
        "search complete"
    );

    if let Some(failure) = result.error {
        if req.format == Format::Csv && !result.rows.is_empty() {
            return Ok(Export::tweet_csv(&result.rows, "search_partial.csv".into()));
        }
        return Err(ApiError::Upstream {
            status: failure.status,
            body: failure.body,
            rate_limit: failure.rate_limit,
        });
    }

    match req.format {
        Format::Csv => {
            let stem = safe_stem(q, "query");
            Ok(Export::tweet_csv(&result.rows, format!("search_{stem}.csv")))
        }
        Format::Json => Ok(Export::Raw(raw_page(result.last_page))),
    }
}

/// Fetch a user profile, optionally with a multi-page timeline.
pub async fn user_profile(client: &UpstreamClient, req: UserRequest) -> Result<Export> {
    let username = req.username.trim().trim_start_matches('@');
    if username.is_empty() {
        return Err(ApiError::Validation("missing username".into()));
    }

    let response = client.user_by_username(username).await?;
    if !response.is_ok() {
        let rate_limit = response.rate_limit();
        return Err(ApiError::Upstream {
            status: response.status,
            body: response.body,
            rate_limit,
        });
    }

    let envelope: UserEnvelope = serde_json::from_value(response.body).unwrap_or_default();
    let Some(user) = envelope.data else {
        return Err(ApiError::UserNotFound(username.to_string()));
    };
    let resolved_name = user.username.clone().unwrap_or_else(|| username.to_string());

    if !req.with_tweets {
        return Ok(match req.format {
            Format::Csv => Export::user_csv(
                &user_row(&user),
                format!("user_{}.csv", safe_stem(&resolved_name, "profile")),
            ),
            Format::Json => Export::Raw(json!({ "user": user })),
        });
    }

    let Some(user_id) = user.id.clone() else {
        return Err(ApiError::UserNotFound(username.to_string()));
    };

    let limit = clamp_or(req.limit, 5, 1, 100);
    let pages = clamp_or(req.pages, 1, 1, 20);
    let exclude = resolve_exclude(req.exclude.as_deref());

    let primary = BoundQuery {
        client,
        query: PageQuery::UserTweets {
            user_id,
            limit,
            exclude: if exclude.is_empty() {
                None
            } else {
                Some(exclude.clone())
            },
        },
    };
    let fallback = BoundQuery {
        client,
        query: PageQuery::Search {
            query: apply_excludes(&format!("from:{resolved_name}"), &exclude),
            limit,
        },
    };

    let result = fetch_with_fallback(&primary, &fallback, pages, req.next_token.clone()).await?;
    info!(
        username = resolved_name.as_str(),
        pages = result.pages_fetched,
        fallback = result.used_fallback,
        "timeline complete"
    );

    if let Some(failure) = result.error {
        if req.format == Format::Csv && !result.rows.is_empty() {
            return Ok(Export::tweet_csv(
                &result.rows,
                format!("user_{}_partial.csv", safe_stem(&resolved_name, "profile")),
            ));
        }
        return Err(ApiError::Upstream {
            status: failure.status,
            body: failure.body,
            rate_limit: failure.rate_limit,
        });
    }

    match req.format {
        Format::Csv => Ok(Export::tweet_csv(
            &result.rows,
            format!("user_{}_tweets.csv", safe_stem(&resolved_name, "profile")),
        )),
        Format::Json => Ok(Export::Raw(timeline_value(&user, result))),
    }
}

/// Merge the profile and the last timeline page, keyed so the caller
/// can tell a genuine timeline from a search-emulated one.
fn timeline_value(user: &User, result: FetchResult) -> Value {
    let key = if result.used_fallback {
        "tweets_fallback_search"
    } else {
        "tweets"
    };
    let mut out = Map::new();
    out.insert(
        "user".to_string(),
        serde_json::to_value(user).unwrap_or(Value::Null),
    );
    out.insert(key.to_string(), raw_page(result.last_page));
    Value::Object(out)
}

/// The last hydrated page as raw JSON, or the empty page shape.
fn raw_page(page: Option<Page>) -> Value {
    page.map(|p| serde_json::to_value(&p).unwrap_or_else(|_| Page::empty_value()))
        .unwrap_or_else(Page::empty_value)
}
