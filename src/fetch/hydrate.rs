// Entity hydration.
// Resolves author and media references in a page against the
// cross-referenced entities in its includes.

use std::collections::HashMap;

use crate::upstream::types::{Media, Page, User};

/// Attach referenced entities to each record in the page.
///
/// Idempotent: re-running re-resolves the same mapping. A page with no
/// includes passes through unchanged. Attachment keys that resolve to
/// no media entity are silently dropped.
pub fn hydrate(page: &mut Page) {
    let Page { data, includes, .. } = page;
    let Some(includes) = includes.as_ref() else {
        return;
    };

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

    for tweet in data.iter_mut() {
        if let Some(author) = tweet.author_id.as_deref().and_then(|id| users.get(id)) {
            tweet.author = Some((*author).clone());
        }

        let keys = tweet
            .attachments
            .as_ref()
            .map(|a| a.media_keys.clone())
            .unwrap_or_default();
        if !keys.is_empty() {
            let resolved: Vec<Media> = keys
                .iter()
                .filter_map(|key| media.get(key.as_str()).map(|m| (*m).clone()))
                .collect();
            tweet.media = Some(resolved);
        }
    }
}
