//! Activity → Post mapping
//!
//! [`map_to_post`] never fails: every missing or malformed field degrades
//! to a default so one odd record cannot break a page.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex_lite::Regex;

use crate::models::{Author, Post, RawActivity, RawReaction, Reaction, ReactionKind};

static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Remove markup, decode entities and collapse whitespace
pub fn strip_html(markup: &str) -> String {
    let spaced = markup
        .replace("<br>", " ")
        .replace("<br/>", " ")
        .replace("<br />", " ")
        .replace("</p>", "</p> ");

    let text = match TAG_RE.as_ref() {
        Some(re) => re.replace_all(&spaced, "").to_string(),
        None => spaced,
    };

    collapse_whitespace(&html_escape::decode_html_entities(&text))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Convert a raw activity record into the post shape the feed renders
pub fn map_to_post(raw: &RawActivity) -> Post {
    let id = raw.record_id().map(ToString::to_string).unwrap_or_default();

    let body = match raw.stripped_body() {
        Some(stripped) => stripped.trim().to_string(),
        None => raw
            .content
            .as_ref()
            .and_then(|c| c.markup())
            .map(strip_html)
            .unwrap_or_default(),
    };

    Post {
        author: map_author(raw),
        body,
        media: media_urls(raw),
        link: non_empty(raw.link.as_deref()),
        created_at: raw.created().and_then(parse_date),
        likes_count: likes_count(raw),
        comments_count: raw.comment_total().unwrap_or(0),
        reactions: raw
            .reactions
            .iter()
            .filter_map(|r| map_reaction(r, &id))
            .collect(),
        id,
    }
}

fn map_author(raw: &RawActivity) -> Author {
    let detail = raw.userdetail.as_ref();

    let user_id = raw
        .user_id
        .as_ref()
        .or_else(|| detail.and_then(|d| d.user_id.as_ref()))
        .map(ToString::to_string)
        .unwrap_or_default();

    let mut display_name = non_empty(raw.name.as_deref())
        .or_else(|| non_empty(raw.title.as_deref().map(strip_html).as_deref()))
        .unwrap_or_default();
    if display_name.is_empty() {
        if let Some(detail) = detail {
            let joined = format!(
                "{} {}",
                detail.first_name.as_deref().unwrap_or_default(),
                detail.last_name.as_deref().unwrap_or_default()
            );
            display_name = collapse_whitespace(&joined);
        }
    }

    let mut words = display_name.split_whitespace();
    let first_name = words.next().unwrap_or("User").to_string();
    let last_name = words.collect::<Vec<_>>().join(" ");

    let user_name = non_empty(detail.and_then(|d| d.user_name.as_deref()))
        .or_else(|| {
            let slug = display_name
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-");
            (!slug.is_empty()).then_some(slug)
        })
        .unwrap_or_else(|| {
            let id = if user_id.is_empty() { "0" } else { &user_id };
            format!("user-{id}")
        });

    let avatar_url = raw
        .user_avatar
        .as_ref()
        .and_then(|a| non_empty(a.full.as_deref()).or_else(|| non_empty(a.thumb.as_deref())))
        .or_else(|| non_empty(detail.and_then(|d| d.profile_image.as_deref())));

    Author {
        user_id,
        first_name,
        last_name,
        user_name,
        avatar_url,
    }
}

fn media_urls(raw: &RawActivity) -> Vec<String> {
    let attachments = raw.bp_media_ids.iter().filter_map(|m| {
        let data = m.attachment_data.as_ref()?;
        non_empty(data.full.as_deref()).or_else(|| non_empty(data.thumb.as_deref()))
    });
    let images = raw.images.iter().filter_map(|url| non_empty(Some(url)));
    attachments.chain(images).collect()
}

fn likes_count(raw: &RawActivity) -> u64 {
    raw.like_count().unwrap_or_else(|| {
        raw.reacted_counts
            .iter()
            .map(|c| c.count.unwrap_or(0))
            .sum()
    })
}

fn map_reaction(raw: &RawReaction, post_id: &str) -> Option<Reaction> {
    let label = raw.reaction.as_deref().unwrap_or_default();
    // Kept even when unrecognized: it still marks who already reacted
    let kind = ReactionKind::from_str(label).unwrap_or_else(|| {
        tracing::debug!("Unknown reaction kind {label:?}");
        ReactionKind::Unknown
    });
    let post_id = raw
        .feed_post_id
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| (!post_id.is_empty()).then(|| post_id.to_string()));

    Some(Reaction {
        id: raw.record_id()?.to_string(),
        post_id,
        user_id: raw.reacting_user()?,
        kind,
    })
}

/// Parse RFC 3339, or the zone-less `YYYY-MM-DDTHH:MM:SS` WordPress sends (as UTC)
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactions::{ReactionAction, ReactionState, plan_reaction};
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawActivity {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_rendered_content_and_favorite_count() {
        let post = map_to_post(&raw(json!({
            "id": 7,
            "content": { "rendered": "<p>Hi</p>" },
            "favorite_count": 3
        })));

        assert_eq!(post.id, "7");
        assert_eq!(post.body, "Hi");
        assert_eq!(post.likes_count, 3);
    }

    #[test]
    fn test_prefers_stripped_content() {
        let post = map_to_post(&raw(json!({
            "id": 1,
            "content": { "rendered": "<p>from markup</p>" },
            "content_stripped": "from server"
        })));
        assert_eq!(post.body, "from server");
    }

    #[test]
    fn test_strip_html_decodes_and_collapses() {
        assert_eq!(
            strip_html("<p>Fish &amp; chips</p><p>line<br/>two</p>\n\n  "),
            "Fish & chips line two"
        );
        assert_eq!(strip_html("<b>He</b>llo"), "Hello");
    }

    #[test]
    fn test_name_split_and_slug() {
        let post = map_to_post(&raw(json!({
            "id": 2,
            "user_id": 44,
            "name": "Ana  Maria Kovač"
        })));

        assert_eq!(post.author.user_id, "44");
        assert_eq!(post.author.first_name, "Ana");
        assert_eq!(post.author.last_name, "Maria Kovač");
        assert_eq!(post.author.user_name, "ana-maria-kovač");
    }

    #[test]
    fn test_empty_name_falls_back_to_placeholder() {
        let post = map_to_post(&raw(json!({ "id": 3, "user_id": 12, "name": "" })));
        assert_eq!(post.author.first_name, "User");
        assert_eq!(post.author.last_name, "");
        assert_eq!(post.author.user_name, "user-12");

        let anonymous = map_to_post(&raw(json!({})));
        assert_eq!(anonymous.author.user_name, "user-0");
        assert_eq!(anonymous.id, "");
    }

    #[test]
    fn test_title_used_when_name_missing() {
        let post = map_to_post(&raw(json!({
            "id": 4,
            "title": "<a href=\"/m/x\">Jo Doe</a> posted an update"
        })));
        assert_eq!(post.author.first_name, "Jo");
    }

    #[test]
    fn test_media_prefers_full_then_thumb() {
        let post = map_to_post(&raw(json!({
            "id": 5,
            "bp_media_ids": [
                { "attachment_data": { "full": "https://cdn/full.jpg", "thumb": "https://cdn/t.jpg" } },
                { "attachment_data": { "thumb": "https://cdn/only-thumb.jpg" } },
                { "attachment_data": { "media_album_cover": "https://cdn/cover.jpg" } },
                {}
            ]
        })));

        assert_eq!(
            post.media,
            vec!["https://cdn/full.jpg".to_string(), "https://cdn/only-thumb.jpg".to_string()]
        );
    }

    #[test]
    fn test_likes_fall_back_to_breakdown() {
        let post = map_to_post(&raw(json!({
            "id": 6,
            "reacted_counts": [{ "id": 1, "count": 2 }, { "id": 2, "count": 5 }, { "id": 3 }]
        })));
        assert_eq!(post.likes_count, 7);

        let none = map_to_post(&raw(json!({ "id": 8 })));
        assert_eq!(none.likes_count, 0);
        assert_eq!(none.comments_count, 0);
    }

    #[test]
    fn test_generic_backend_shape() {
        let post = map_to_post(&raw(json!({
            "_id": "65aa",
            "description": "hello there",
            "createdAt": "2024-03-01T10:00:00Z",
            "likesCount": 2,
            "commentsCount": 1,
            "images": ["https://cdn/a.png", ""],
            "userdetail": {
                "userId": "u1",
                "firstName": "Edin",
                "lastName": "Hodžić",
                "userName": "edin",
                "profileImage": "uploads/e.png"
            },
            "reactions": [
                { "_id": "r1", "reaction": "Love", "userdetail": { "userId": "u2" } },
                { "_id": "r2", "reaction": "Meh", "userdetail": { "userId": "u3" } }
            ]
        })));

        assert_eq!(post.id, "65aa");
        assert_eq!(post.body, "hello there");
        assert_eq!(post.author.user_id, "u1");
        assert_eq!(post.author.first_name, "Edin");
        assert_eq!(post.author.user_name, "edin");
        assert_eq!(post.author.avatar_url.as_deref(), Some("uploads/e.png"));
        assert_eq!(post.media, vec!["https://cdn/a.png".to_string()]);
        assert_eq!(post.likes_count, 2);
        assert_eq!(post.comments_count, 1);
        assert_eq!(post.reactions.len(), 2);
        assert_eq!(post.reactions[0].kind, ReactionKind::Love);
        assert_eq!(post.reactions[0].post_id.as_deref(), Some("65aa"));
        assert_eq!(post.reactions[1].kind, ReactionKind::Unknown);
        assert_eq!(post.reactions[1].user_id, "u3");
    }

    #[test]
    fn test_mixed_shape_record_keeps_its_reactions() {
        let post = map_to_post(&raw(json!({
            "_id": "p3",
            "id": 3,
            "content_stripped": "stripped",
            "description": "described",
            "likesCount": 5,
            "reactions": [{
                "_id": "r1",
                "id": "r1",
                "reaction": "Like",
                "userdetail": { "userId": "me" }
            }]
        })));

        assert_eq!(post.id, "p3");
        assert_eq!(post.body, "stripped");
        assert_eq!(post.likes_count, 5);
        assert_eq!(post.reactions.len(), 1);
        assert_eq!(post.reactions[0].id, "r1");
        assert_eq!(post.reactions[0].user_id, "me");

        // Asking for the held kind again removes it
        assert_eq!(
            plan_reaction(&post.id, "me", &post.reactions, Some(ReactionKind::Like)),
            ReactionAction::Delete {
                reaction_id: "r1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_kind_still_counts_as_viewers_reaction() {
        let post = map_to_post(&raw(json!({
            "_id": "p4",
            "reactions": [{ "_id": "r7", "reaction": "Celebrate", "userdetail": { "userId": "me" } }]
        })));

        assert_eq!(
            ReactionState::of("me", &post.reactions),
            ReactionState::Reacting(ReactionKind::Unknown)
        );
        assert_eq!(
            plan_reaction(&post.id, "me", &post.reactions, Some(ReactionKind::Love)),
            ReactionAction::Update {
                reaction_id: "r7".to_string(),
                kind: ReactionKind::Love
            }
        );
    }

    #[test]
    fn test_wordpress_date_without_zone() {
        let post = map_to_post(&raw(json!({ "id": 9, "date": "2024-05-06T07:08:09" })));
        let created = post.created_at.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (2024, 5, 6));
        assert_eq!(created.hour(), 7);

        let garbage = map_to_post(&raw(json!({ "id": 9, "date": "yesterday" })));
        assert!(garbage.created_at.is_none());
    }
}
