// HTTP front-end.
// Thin axum layer: query-string parsing, core invocation, response
// rendering. All orchestration lives in the core modules.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::{self, Format, SearchRequest, UserRequest};
use crate::config::Config;
use crate::error::ApiError;
use crate::export::Export;
use crate::upstream::client::UpstreamClient;

/// Shared service state.
pub struct AppState {
    pub client: UpstreamClient,
    pub config: Config,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/search", get(search))
        .route("/api/user/{username}", get(user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<u32>,
    exclude: Option<String>,
    next_token: Option<String>,
    format: Option<String>,
    pages: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct UserParams {
    with_tweets: Option<String>,
    limit: Option<u32>,
    exclude: Option<String>,
    next_token: Option<String>,
    format: Option<String>,
    pages: Option<u32>,
}

async fn index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": "birdfeed",
        "endpoints": ["/api/search", "/api/user/{username}"],
        "cache_ttl": state.config.cache_ttl,
        "api_base": state.config.api_base,
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let request = SearchRequest {
        query: params.q.unwrap_or_default(),
        limit: params.limit,
        exclude: params.exclude,
        next_token: params.next_token,
        format: Format::parse(params.format.as_deref()),
        pages: params.pages,
    };
    render(api::search(&state.client, request).await)
}

async fn user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(params): Query<UserParams>,
) -> Response {
    let request = UserRequest {
        username,
        with_tweets: parse_flag(params.with_tweets.as_deref()),
        limit: params.limit,
        exclude: params.exclude,
        next_token: params.next_token,
        format: Format::parse(params.format.as_deref()),
        pages: params.pages,
    };
    render(api::user_profile(&state.client, request).await)
}

/// Boolean query flag: `1`, `true`, and `yes` enable.
fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes")
    )
}

/// Render a core result as an HTTP response.
fn render(result: Result<Export, ApiError>) -> Response {
    match result {
        Ok(Export::Raw(value)) => Json(value).into_response(),
        Ok(Export::Attachment {
            filename,
            content_type,
            body,
        }) => (
            [
                (header::CONTENT_TYPE, content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{filename}\""),
                ),
            ],
            body,
        )
            .into_response(),
        Err(error) => {
            let status = StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(error.payload())).into_response()
        }
    }
}
