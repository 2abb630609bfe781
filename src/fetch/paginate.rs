// Pagination driver.
// Drives one upstream query across a page budget, following the
// continuation cursor and accumulating flattened rows. Written once
// and reused by the search, timeline, and fallback paths.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::upstream::client::{PageQuery, UpstreamClient, UpstreamResponse};
use crate::upstream::types::{Page, RateLimit};

use super::hydrate::hydrate;
use super::rows::{TweetRow, tweet_rows};

/// A cursor-addressable source of upstream pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<UpstreamResponse>;
}

/// Binds an [`UpstreamClient`] to one [`PageQuery`] so the driver can
/// advance it cursor by cursor.
pub struct BoundQuery<'a> {
    pub client: &'a UpstreamClient,
    pub query: PageQuery,
}

#[async_trait]
impl PageSource for BoundQuery<'_> {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<UpstreamResponse> {
        self.client.fetch_page(&self.query, cursor).await
    }
}

/// The non-200 response that stopped a pagination loop.
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub status: u16,
    pub body: Value,
    pub rate_limit: RateLimit,
}

impl UpstreamFailure {
    fn from_response(response: UpstreamResponse) -> Self {
        let rate_limit = response.rate_limit();
        Self {
            status: response.status,
            body: response.body,
            rate_limit,
        }
    }
}

/// Accumulated outcome of one multi-page fetch.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Pages fetched successfully.
    pub pages_fetched: u32,
    /// Flattened rows, in fetch order across all pages.
    pub rows: Vec<TweetRow>,
    /// The last successfully fetched page, hydrated.
    pub last_page: Option<Page>,
    /// Whether the fallback endpoint produced any of the pages.
    pub used_fallback: bool,
    /// The non-200 response that stopped the loop, if any.
    pub error: Option<UpstreamFailure>,
}

/// Fetch up to `max_pages` pages, hydrating and flattening each.
///
/// Stops early when the upstream returns no continuation cursor, or on
/// the first non-200 response; rows accumulated before that point are
/// kept. Transport failures propagate as errors and discard nothing at
/// this level because nothing was completed for the failed page.
pub async fn paginate<S>(
    source: &S,
    max_pages: u32,
    start_cursor: Option<String>,
) -> Result<FetchResult>
where
    S: PageSource + ?Sized,
{
    let mut result = FetchResult::default();
    let mut cursor = start_cursor;

    for _ in 0..max_pages {
        let response = source.fetch_page(cursor.as_deref()).await?;
        if !response.is_ok() {
            result.error = Some(UpstreamFailure::from_response(response));
            break;
        }

        let mut page = Page::from_value(response.body);
        hydrate(&mut page);
        result.rows.extend(tweet_rows(&page));
        result.pages_fetched += 1;
        cursor = page.next_token().map(str::to_string);
        result.last_page = Some(page);

        if cursor.is_none() {
            debug!(pages = result.pages_fetched, "pagination exhausted");
            break;
        }
    }

    Ok(result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use crate::error::ApiError;

    /// Scripted page source: pops one canned response per fetch and
    /// records the cursor each call received.
    pub(crate) struct ScriptedSource {
        responses: Mutex<Vec<UpstreamResponse>>,
        pub cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        pub fn new(responses: Vec<UpstreamResponse>) -> Self {
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                cursors: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, cursor: Option<&str>) -> Result<UpstreamResponse> {
            self.cursors
                .lock()
                .unwrap()
                .push(cursor.map(str::to_string));
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::Validation("script exhausted".into()))
        }
    }

    /// A 200 page with `count` records and an optional next token.
    pub(crate) fn ok_page(count: usize, next_token: Option<&str>) -> UpstreamResponse {
        let data: Vec<Value> = (0..count).map(|i| json!({ "id": i.to_string() })).collect();
        let mut body = json!({ "data": data });
        if let Some(token) = next_token {
            body["meta"] = json!({ "next_token": token });
        }
        UpstreamResponse {
            status: 200,
            body,
            headers: HashMap::new(),
        }
    }

    pub(crate) fn error_page(status: u16) -> UpstreamResponse {
        UpstreamResponse {
            status,
            body: json!({ "title": "error" }),
            headers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_follows_cursor_until_exhausted() {
        let source = ScriptedSource::new(vec![ok_page(5, Some("t1")), ok_page(3, None)]);
        let result = paginate(&source, 2, None).await.unwrap();

        assert_eq!(result.pages_fetched, 2);
        assert_eq!(result.rows.len(), 8);
        assert!(result.error.is_none());
        assert_eq!(
            *source.cursors.lock().unwrap(),
            vec![None, Some("t1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_stops_at_page_budget() {
        let source = ScriptedSource::new(vec![
            ok_page(2, Some("t1")),
            ok_page(2, Some("t2")),
            ok_page(2, Some("t3")),
        ]);
        let result = paginate(&source, 2, None).await.unwrap();

        assert_eq!(result.pages_fetched, 2);
        assert_eq!(result.rows.len(), 4);
        // The third scripted page was never requested.
        assert_eq!(source.cursors.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_keeps_accumulated_rows() {
        let source = ScriptedSource::new(vec![ok_page(4, Some("t1")), error_page(500)]);
        let result = paginate(&source, 3, None).await.unwrap();

        assert_eq!(result.pages_fetched, 1);
        assert_eq!(result.rows.len(), 4);
        let failure = result.error.unwrap();
        assert_eq!(failure.status, 500);
        assert_eq!(failure.body["title"], "error");
    }

    #[tokio::test]
    async fn test_start_cursor_is_forwarded() {
        let source = ScriptedSource::new(vec![ok_page(1, None)]);
        paginate(&source, 1, Some("resume".into())).await.unwrap();
        assert_eq!(
            *source.cursors.lock().unwrap(),
            vec![Some("resume".to_string())]
        );
    }

    #[tokio::test]
    async fn test_last_page_is_hydrated() {
        let body = json!({
            "data": [{ "id": "1", "author_id": "u1" }],
            "includes": { "users": [{ "id": "u1", "username": "nasa" }] },
        });
        let source = ScriptedSource::new(vec![UpstreamResponse {
            status: 200,
            body,
            headers: HashMap::new(),
        }]);
        let result = paginate(&source, 1, None).await.unwrap();
        let page = result.last_page.unwrap();
        assert_eq!(
            page.data[0].author.as_ref().unwrap().username.as_deref(),
            Some("nasa")
        );
    }
}
