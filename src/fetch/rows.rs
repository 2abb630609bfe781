// Row flattening for tabular export.
// Fixed column schemas: one row per record, multi-valued fields
// comma-joined, line breaks scrubbed from free text.

use std::collections::HashMap;

use crate::upstream::types::{Includes, Media, Page, User};

/// Tweet export columns, in emission order.
pub const TWEET_COLUMNS: [&str; 18] = [
    "tweet_id",
    "created_at",
    "author_username",
    "author_name",
    "author_id",
    "text",
    "lang",
    "like_count",
    "retweet_count",
    "reply_count",
    "quote_count",
    "bookmark_count",
    "impression_count",
    "possibly_sensitive",
    "media_urls",
    "media_types",
    "referenced_types",
    "referenced_ids",
];

/// User export columns, in emission order.
pub const USER_COLUMNS: [&str; 14] = [
    "id",
    "username",
    "name",
    "created_at",
    "verified",
    "protected",
    "location",
    "description",
    "followers_count",
    "following_count",
    "tweet_count",
    "listed_count",
    "like_count",
    "media_count",
];

/// One flat tweet record, aligned with [`TWEET_COLUMNS`].
#[derive(Debug, Clone, Default)]
pub struct TweetRow {
    pub tweet_id: Option<String>,
    pub created_at: Option<String>,
    pub author_username: Option<String>,
    pub author_name: Option<String>,
    pub author_id: Option<String>,
    pub text: String,
    pub lang: Option<String>,
    pub like_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub quote_count: Option<u64>,
    pub bookmark_count: Option<u64>,
    pub impression_count: Option<u64>,
    pub possibly_sensitive: Option<bool>,
    pub media_urls: String,
    pub media_types: String,
    pub referenced_types: String,
    pub referenced_ids: String,
}

impl TweetRow {
    /// Cell values in column order; absent values render empty.
    pub fn cells(&self) -> Vec<String> {
        vec![
            opt(&self.tweet_id),
            opt(&self.created_at),
            opt(&self.author_username),
            opt(&self.author_name),
            opt(&self.author_id),
            self.text.clone(),
            opt(&self.lang),
            count(self.like_count),
            count(self.retweet_count),
            count(self.reply_count),
            count(self.quote_count),
            count(self.bookmark_count),
            count(self.impression_count),
            flag(self.possibly_sensitive),
            self.media_urls.clone(),
            self.media_types.clone(),
            self.referenced_types.clone(),
            self.referenced_ids.clone(),
        ]
    }
}

/// One flat user-profile record, aligned with [`USER_COLUMNS`].
#[derive(Debug, Clone, Default)]
pub struct UserRow {
    pub id: Option<String>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub verified: Option<bool>,
    pub protected: Option<bool>,
    pub location: String,
    pub description: String,
    pub followers_count: Option<u64>,
    pub following_count: Option<u64>,
    pub tweet_count: Option<u64>,
    pub listed_count: Option<u64>,
    pub like_count: Option<u64>,
    pub media_count: Option<u64>,
}

impl UserRow {
    /// Cell values in column order; absent values render empty.
    pub fn cells(&self) -> Vec<String> {
        vec![
            opt(&self.id),
            opt(&self.username),
            opt(&self.name),
            opt(&self.created_at),
            flag(self.verified),
            flag(self.protected),
            self.location.clone(),
            self.description.clone(),
            count(self.followers_count),
            count(self.following_count),
            count(self.tweet_count),
            count(self.listed_count),
            count(self.like_count),
            count(self.media_count),
        ]
    }
}

/// Flatten a page into tweet rows, one per record, in page order.
///
/// Works on raw and hydrated pages alike: the author falls back to
/// the includes lookup when no hydrated author is attached, and media
/// is always re-resolved from the includes.
pub fn tweet_rows(page: &Page) -> Vec<TweetRow> {
    let default_includes = Includes::default();
    let includes = page.includes.as_ref().unwrap_or(&default_includes);

    let users: HashMap<&str, &User> = includes
        .users
        .iter()
        .filter_map(|user| user.id.as_deref().map(|id| (id, user)))
        .collect();
    let media: HashMap<&str, &Media> = includes
        .media
        .iter()
        .filter_map(|m| m.media_key.as_deref().map(|key| (key, m)))
        .collect();

    page.data
        .iter()
        .map(|tweet| {
            let author: Option<&User> = tweet.author.as_ref().or_else(|| {
                tweet
                    .author_id
                    .as_deref()
                    .and_then(|id| users.get(id).copied())
            });
            let metric = |name: &str| tweet.public_metrics.get(name).copied();

            let keys = tweet
                .attachments
                .as_ref()
                .map(|a| a.media_keys.as_slice())
                .unwrap_or_default();
            let attached: Vec<&Media> = keys
                .iter()
                .filter_map(|key| media.get(key.as_str()).copied())
                .collect();

            TweetRow {
                tweet_id: tweet.id.clone(),
                created_at: tweet.created_at.clone(),
                author_username: author.and_then(|a| a.username.clone()),
                author_name: author.and_then(|a| a.name.clone()),
                author_id: tweet.author_id.clone(),
                text: scrub(tweet.text.as_deref().unwrap_or_default()),
                lang: tweet.lang.clone(),
                like_count: metric("like_count"),
                retweet_count: metric("retweet_count"),
                reply_count: metric("reply_count"),
                quote_count: metric("quote_count"),
                bookmark_count: metric("bookmark_count"),
                impression_count: metric("impression_count"),
                possibly_sensitive: tweet.possibly_sensitive,
                media_urls: join_present(attached.iter().map(|m| m.url.as_deref())),
                media_types: join_present(attached.iter().map(|m| m.media_type.as_deref())),
                referenced_types: join_present(
                    tweet.referenced_tweets.iter().map(|r| r.ref_type.as_deref()),
                ),
                referenced_ids: join_present(tweet.referenced_tweets.iter().map(|r| r.id.as_deref())),
            }
        })
        .collect()
}

/// Flatten a user profile into its single export row.
pub fn user_row(user: &User) -> UserRow {
    let metric = |name: &str| user.public_metrics.get(name).copied();

    UserRow {
        id: user.id.clone(),
        username: user.username.clone(),
        name: user.name.clone(),
        created_at: user.created_at.clone(),
        verified: user.verified,
        protected: user.protected,
        location: user.location.clone().unwrap_or_default(),
        description: scrub(user.description.as_deref().unwrap_or_default()),
        followers_count: metric("followers_count"),
        following_count: metric("following_count"),
        tweet_count: metric("tweet_count"),
        listed_count: metric("listed_count"),
        like_count: metric("like_count"),
        media_count: metric("media_count"),
    }
}

/// Comma-join the present entries, skipping absent ones.
fn join_present<'a, I: Iterator<Item = Option<&'a str>>>(values: I) -> String {
    values.flatten().collect::<Vec<_>>().join(",")
}

/// Replace CR/LF with spaces so one record stays one row.
fn scrub(text: &str) -> String {
    text.replace('\r', " ").replace('\n', " ")
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn count(value: Option<u64>) -> String {
    value.map(|c| c.to_string()).unwrap_or_default()
}

fn flag(value: Option<bool>) -> String {
    value.map(|b| b.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_one_row_per_record_in_order() {
        let page = Page::from_value(json!({
            "data": [{ "id": "1" }, { "id": "2" }, { "id": "3" }],
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows.len(), 3);
        let ids: Vec<_> = rows.iter().map(|r| r.tweet_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("1"), Some("2"), Some("3")]);
    }

    #[test]
    fn test_media_join_is_ordered_and_filtered() {
        let page = Page::from_value(json!({
            "data": [{
                "id": "1",
                "attachments": { "media_keys": ["m1", "m2", "m3"] },
            }],
            "includes": {
                "media": [
                    { "media_key": "m1", "type": "photo", "url": "u1" },
                    { "media_key": "m2", "type": "video", "url": "u2" },
                    { "media_key": "m3", "type": "photo" },
                ],
            },
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].media_urls, "u1,u2");
        assert_eq!(rows[0].media_types, "photo,video,photo");
    }

    #[test]
    fn test_no_media_yields_empty_join() {
        let page = Page::from_value(json!({ "data": [{ "id": "1" }] }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].media_urls, "");
        assert_eq!(rows[0].media_types, "");
    }

    #[test]
    fn test_referenced_tweets_joined() {
        let page = Page::from_value(json!({
            "data": [{
                "id": "1",
                "referenced_tweets": [
                    { "type": "replied_to", "id": "9" },
                    { "type": "quoted", "id": "8" },
                ],
            }],
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].referenced_types, "replied_to,quoted");
        assert_eq!(rows[0].referenced_ids, "9,8");
    }

    #[test]
    fn test_text_line_breaks_become_spaces() {
        let page = Page::from_value(json!({
            "data": [{ "id": "1", "text": "line one\r\nline two\nthree" }],
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].text, "line one  line two three");
    }

    #[test]
    fn test_author_resolved_from_includes_without_hydration() {
        let page = Page::from_value(json!({
            "data": [{ "id": "1", "author_id": "u1" }],
            "includes": { "users": [{ "id": "u1", "username": "nasa", "name": "NASA" }] },
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].author_username.as_deref(), Some("nasa"));
        assert_eq!(rows[0].author_name.as_deref(), Some("NASA"));
    }

    #[test]
    fn test_metrics_flattened() {
        let page = Page::from_value(json!({
            "data": [{
                "id": "1",
                "public_metrics": { "like_count": 7, "retweet_count": 2, "impression_count": 950 },
            }],
        }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].like_count, Some(7));
        assert_eq!(rows[0].retweet_count, Some(2));
        assert_eq!(rows[0].impression_count, Some(950));
        assert_eq!(rows[0].reply_count, None);
    }

    #[test]
    fn test_user_row_defaults_text_fields_to_empty() {
        let user = User::default();
        let row = user_row(&user);
        assert_eq!(row.location, "");
        assert_eq!(row.description, "");
        assert_eq!(row.cells().len(), USER_COLUMNS.len());
    }

    #[test]
    fn test_user_row_flattens_profile() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "username": "nasa",
            "name": "NASA",
            "verified": true,
            "description": "explore\nthe universe",
            "public_metrics": { "followers_count": 100, "tweet_count": 42 },
        }))
        .unwrap();
        let row = user_row(&user);
        assert_eq!(row.username.as_deref(), Some("nasa"));
        assert_eq!(row.description, "explore the universe");
        assert_eq!(row.followers_count, Some(100));
        assert_eq!(row.tweet_count, Some(42));
        assert_eq!(row.listed_count, None);
    }

    #[test]
    fn test_cells_align_with_columns() {
        let page = Page::from_value(json!({ "data": [{ "id": "1" }] }));
        let rows = tweet_rows(&page);
        assert_eq!(rows[0].cells().len(), TWEET_COLUMNS.len());
    }
}
