// Upstream query-parameter construction.
// Field sets, search-operator building, and bound clamping for the
// X v2 API.

/// Tweet fields requested on every tweet-collection fetch.
pub const TWEET_FIELDS: &str =
    "created_at,public_metrics,lang,possibly_sensitive,entities,referenced_tweets,attachments,author_id";

/// Expansions resolving authors and attached media into `includes`.
pub const EXPANSIONS: &str = "author_id,attachments.media_keys";

/// User fields hydrated into tweet pages.
pub const USER_FIELDS: &str = "name,username,profile_image_url,verified,public_metrics";

/// Media fields hydrated into tweet pages.
pub const MEDIA_FIELDS: &str = "type,url,preview_image_url,width,height,alt_text";

/// User fields for a profile lookup.
pub const PROFILE_FIELDS: &str =
    "name,username,profile_image_url,verified,protected,created_at,description,location,url,public_metrics";

/// Categories excluded from results unless the caller overrides them.
pub const DEFAULT_EXCLUDE: &str = "retweets,replies";

/// Clamp an optional numeric parameter into `[min, max]`.
pub fn clamp_or(value: Option<u32>, default: u32, min: u32, max: u32) -> u32 {
    value.unwrap_or(default).clamp(min, max)
}

/// Resolve the exclusion list: an absent parameter means the default
/// filter, an explicitly empty one means include everything.
pub fn resolve_exclude(raw: Option<&str>) -> String {
    match raw {
        None => DEFAULT_EXCLUDE.to_string(),
        Some(value) => value.to_string(),
    }
}

/// Append a `-is:<category>` operator for each excluded category.
pub fn apply_excludes(query: &str, exclude: &str) -> String {
    let operators: Vec<String> = exclude
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| format!("-is:{part}"))
        .collect();

    if operators.is_empty() {
        query.to_string()
    } else {
        format!("{} {}", query, operators.join(" "))
    }
}
