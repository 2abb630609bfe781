// Timeline fallback orchestration.
// A rate-limited or forbidden user-timeline fetch continues through
// the search endpoint with the remaining page budget.

use tracing::info;

use crate::error::Result;

use super::paginate::{FetchResult, PageSource, paginate};

/// Statuses that trigger the primary → fallback transition.
fn is_fallback_status(status: u16) -> bool {
    matches!(status, 429 | 403)
}

/// Drive the primary source, switching to the fallback source when the
/// primary is rate limited or forbidden.
///
/// The fallback restarts from the caller's original cursor because the
/// two endpoints paginate independent result streams; it receives the
/// page budget the primary did not consume. Rows accumulated on the
/// primary are retained and the combined result is flagged. At most
/// one transition happens: a 429/403 from the fallback itself is
/// terminal.
pub async fn fetch_with_fallback<P, F>(
    primary: &P,
    fallback: &F,
    max_pages: u32,
    start_cursor: Option<String>,
) -> Result<FetchResult>
where
    P: PageSource + ?Sized,
    F: PageSource + ?Sized,
{
    let mut result = paginate(primary, max_pages, start_cursor.clone()).await?;

    let fallback_worthy = result
        .error
        .as_ref()
        .is_some_and(|failure| is_fallback_status(failure.status));
    if !fallback_worthy {
        return Ok(result);
    }

    let status = result.error.as_ref().map(|f| f.status).unwrap_or_default();
    let remaining = max_pages.saturating_sub(result.pages_fetched);
    info!(
        status,
        pages = result.pages_fetched,
        remaining,
        "timeline unavailable, continuing via search fallback"
    );

    let tail = paginate(fallback, remaining, start_cursor).await?;

    result.rows.extend(tail.rows);
    result.pages_fetched += tail.pages_fetched;
    if tail.last_page.is_some() {
        result.last_page = tail.last_page;
    }
    result.error = tail.error;
    result.used_fallback = true;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::paginate::tests::{ScriptedSource, error_page, ok_page};

    #[tokio::test]
    async fn test_rate_limit_mid_loop_switches_with_remaining_budget() {
        // Primary: page 1 succeeds, page 2 is rate limited under a
        // 3-page budget; the fallback then serves up to 2 pages.
        let primary = ScriptedSource::new(vec![ok_page(5, Some("p1")), error_page(429)]);
        let fallback = ScriptedSource::new(vec![ok_page(4, Some("f1")), ok_page(2, None)]);

        let result = fetch_with_fallback(&primary, &fallback, 3, None)
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert!(result.error.is_none());
        assert_eq!(result.pages_fetched, 3);
        assert_eq!(result.rows.len(), 11);
        // Rows stay in fetch order: primary page first.
        assert_eq!(result.rows[0].tweet_id.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_fallback_restarts_from_original_cursor() {
        let primary = ScriptedSource::new(vec![ok_page(1, Some("primary-cursor")), error_page(403)]);
        let fallback = ScriptedSource::new(vec![ok_page(1, None)]);

        fetch_with_fallback(&primary, &fallback, 3, Some("original".into()))
            .await
            .unwrap();

        // The primary advanced to its own cursor, but the fallback got
        // the caller's token back, not the primary's in-progress one.
        assert_eq!(
            *primary.cursors.lock().unwrap(),
            vec![Some("original".to_string()), Some("primary-cursor".to_string())]
        );
        assert_eq!(
            *fallback.cursors.lock().unwrap(),
            vec![Some("original".to_string())]
        );
    }

    #[tokio::test]
    async fn test_immediate_rate_limit_gives_fallback_full_budget() {
        let primary = ScriptedSource::new(vec![error_page(429)]);
        let fallback = ScriptedSource::new(vec![ok_page(2, Some("f1")), ok_page(2, None)]);

        let result = fetch_with_fallback(&primary, &fallback, 2, None)
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert_eq!(result.pages_fetched, 2);
        assert_eq!(result.rows.len(), 4);
    }

    #[tokio::test]
    async fn test_non_recoverable_status_does_not_fall_back() {
        let primary = ScriptedSource::new(vec![ok_page(2, Some("p1")), error_page(500)]);
        let fallback = ScriptedSource::new(vec![ok_page(9, None)]);

        let result = fetch_with_fallback(&primary, &fallback, 3, None)
            .await
            .unwrap();

        assert!(!result.used_fallback);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.error.unwrap().status, 500);
        assert!(fallback.cursors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_failure_is_terminal_with_rows_kept() {
        let primary = ScriptedSource::new(vec![ok_page(3, Some("p1")), error_page(429)]);
        let fallback = ScriptedSource::new(vec![error_page(429)]);

        let result = fetch_with_fallback(&primary, &fallback, 3, None)
            .await
            .unwrap();

        assert!(result.used_fallback);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.error.unwrap().status, 429);
        // Only one transition: the fallback was asked exactly once.
        assert_eq!(fallback.cursors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clean_exhaustion_keeps_primary_result() {
        let primary = ScriptedSource::new(vec![ok_page(2, None)]);
        let fallback = ScriptedSource::new(vec![]);

        let result = fetch_with_fallback(&primary, &fallback, 3, None)
            .await
            .unwrap();

        assert!(!result.used_fallback);
        assert!(result.error.is_none());
        assert_eq!(result.rows.len(), 2);
    }
}
