//! Feed request URLs and response envelope normalization
//!
//! The feed endpoint has answered with two envelope shapes over time:
//! `{status, meta: {totalPages}, data: [...]}` and `{data, pagination}`.
//! Both collapse into a [`FeedPage`].

use serde_json::Value;

use crate::config::Config;
use crate::error::{FeedError, FeedResult};
use crate::models::{FeedPage, RawActivity};

use super::PageQuery;

const PAGINATION_KEYS: &[&str] = &["pagination", "meta", "paging"];
const TOTAL_PAGES_KEYS: &[&str] = &["totalPages", "total_pages"];

/// Full feed URL for a page query
pub fn feed_url(config: &Config, query: &PageQuery) -> String {
    let flavor = config.backend;
    let mut url = format!(
        "{}?page={}&{}={}",
        config.endpoint(&config.feed_path),
        query.page.max(1),
        flavor.page_size_param(),
        query.page_size.max(1)
    );

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        url.push_str(&format!("&search={}", urlencoding::encode(search)));
    }
    if let Some(user) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        url.push_str(&format!(
            "&{}={}",
            flavor.user_param(),
            urlencoding::encode(user)
        ));
    }

    url
}

/// Normalize a decoded feed response into items plus page count
pub fn normalize_envelope(payload: Value) -> FeedResult<FeedPage> {
    let total_pages = total_pages(&payload);

    let data = match payload {
        Value::Object(mut map) => map.remove("data").ok_or_else(|| {
            FeedError::MalformedResponse("feed response has no `data` field".to_string())
        })?,
        other => other,
    };

    let Value::Array(entries) = data else {
        return Err(FeedError::MalformedResponse(format!(
            "feed `data` is not a list (got {})",
            kind_of(&data)
        )));
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<RawActivity>(entry) {
            Ok(raw) => items.push(raw),
            Err(e) => tracing::warn!("Skipping unreadable feed entry: {e}"),
        }
    }

    Ok(FeedPage { items, total_pages })
}

fn total_pages(payload: &Value) -> u32 {
    let found = PAGINATION_KEYS
        .iter()
        .filter_map(|key| payload.get(key))
        .find_map(|meta| {
            TOTAL_PAGES_KEYS
                .iter()
                .find_map(|key| meta.get(key).and_then(crate::models::count_from_value))
        });

    found
        .map_or(1, |pages| u32::try_from(pages).unwrap_or(u32::MAX))
        .max(1)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendFlavor;
    use serde_json::json;

    #[test]
    fn test_meta_envelope() {
        let page = normalize_envelope(json!({
            "status": 200,
            "meta": {"totalPages": 4},
            "data": [{"_id": "a"}, {"_id": "b"}]
        }))
        .unwrap();
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_pagination_envelope() {
        let page = normalize_envelope(json!({
            "data": [{"id": 1}],
            "pagination": {"totalPages": "3"}
        }))
        .unwrap();
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_missing_meta_defaults_to_one_page() {
        let page = normalize_envelope(json!({"data": []})).unwrap();
        assert_eq!(page.total_pages, 1);

        let zero = normalize_envelope(json!({"data": [], "meta": {"totalPages": 0}})).unwrap();
        assert_eq!(zero.total_pages, 1);
    }

    #[test]
    fn test_bare_list_is_accepted() {
        let page = normalize_envelope(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_records_mixing_both_backend_shapes_are_kept() {
        let page = normalize_envelope(json!({
            "data": [
                {"_id": "65aa", "id": "65aa", "description": "generic"},
                {"id": 2, "content_stripped": "x", "description": "y"},
                {
                    "_id": "p3",
                    "likesCount": 1,
                    "favorite_count": 1,
                    "reactions": [
                        {"_id": "r1", "id": "r1", "reaction": "Like", "userdetail": {"userId": "me"}}
                    ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].record_id().map(ToString::to_string).as_deref(), Some("65aa"));
        assert_eq!(page.items[1].stripped_body(), Some("x"));
        assert_eq!(page.items[2].reactions.len(), 1);
    }

    #[test]
    fn test_only_unreadable_entries_are_skipped() {
        let page = normalize_envelope(json!({
            "data": [{"id": 1}, "garbage", 42, null, {"_id": "b", "id": 2}]
        }))
        .unwrap();

        let ids: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.record_id().map(ToString::to_string))
            .collect();
        assert_eq!(ids, vec!["1".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_non_list_data_is_malformed() {
        let err = normalize_envelope(json!({"data": {"id": 1}})).unwrap_err();
        assert!(matches!(err, FeedError::MalformedResponse(_)));

        let err = normalize_envelope(json!({"status": 500})).unwrap_err();
        assert!(matches!(err, FeedError::MalformedResponse(_)));

        let err = normalize_envelope(json!("nope")).unwrap_err();
        assert!(matches!(err, FeedError::MalformedResponse(_)));
    }

    #[test]
    fn test_feed_url_per_flavor() {
        let config = Config {
            base_url: "https://example.test/api".to_string(),
            backend: BackendFlavor::Generic,
            ..Config::default()
        };
        let query = PageQuery {
            page: 2,
            page_size: 10,
            search: Some("hello world".to_string()),
            user_id: None,
        };
        assert_eq!(
            feed_url(&config, &query),
            "https://example.test/api/newsfeed?page=2&pageSize=10&search=hello%20world"
        );

        let config = Config {
            backend: BackendFlavor::Buddyboss,
            ..config
        };
        let query = PageQuery {
            search: Some(String::new()),
            user_id: Some("42".to_string()),
            ..query
        };
        assert_eq!(
            feed_url(&config, &query),
            "https://example.test/api/newsfeed?page=2&per_page=10&user_id=42"
        );
    }
}
