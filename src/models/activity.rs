//! Raw activity-stream records as the backend sends them
//!
//! Every field is optional and parsed leniently: a value of the wrong type
//! degrades to "absent" instead of failing the whole record. The mapper
//! turns these into [`Post`](super::Post)s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier that may arrive as a JSON number or a string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Numeric id (`"id": 42`)
    Number(i64),
    /// Textual id (`"_id": "65f0..."`)
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// `content` is either `{ "rendered": "<p>..</p>" }` or a bare string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentField {
    /// WordPress style rendered field
    Rendered {
        /// HTML markup
        #[serde(default)]
        rendered: Option<String>,
    },
    /// Plain string content
    Plain(String),
}

impl ContentField {
    /// The markup carried by this field, if any
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Rendered { rendered } => rendered.as_deref(),
            Self::Plain(s) => Some(s),
        }
    }
}

/// Avatar / attachment sizes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSizes {
    /// Full resolution URL
    #[serde(default, deserialize_with = "lenient")]
    pub full: Option<String>,
    /// Thumbnail URL
    #[serde(default, deserialize_with = "lenient")]
    pub thumb: Option<String>,
}

/// One entry of `bp_media_ids`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Attachment URLs
    #[serde(default, deserialize_with = "lenient")]
    pub attachment_data: Option<ImageSizes>,
}

/// Per-kind reaction counter (`reacted_counts`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactedCount {
    /// Reaction kind id on the backend
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    /// How many users reacted with this kind
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: Option<u64>,
}

/// Author block used by the generic backend (`userdetail`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserDetail {
    /// Author id
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<RawId>,
    /// Given name
    #[serde(default, deserialize_with = "lenient")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default, deserialize_with = "lenient")]
    pub last_name: Option<String>,
    /// Handle
    #[serde(default, deserialize_with = "lenient")]
    pub user_name: Option<String>,
    /// Avatar URL
    #[serde(default, deserialize_with = "lenient")]
    pub profile_image: Option<String>,
}

/// Reaction record attached to a post
///
/// Both backends may spell the same field differently, sometimes in the
/// same record, so each spelling is kept as its own field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReaction {
    /// Reaction id (generic backend)
    #[serde(default, rename = "_id", deserialize_with = "lenient")]
    pub underscore_id: Option<RawId>,
    /// Reaction id
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    /// Reaction kind as text (`Like`, `Love`, ...)
    #[serde(default, deserialize_with = "lenient")]
    pub reaction: Option<String>,
    /// Post the reaction belongs to
    #[serde(default, rename = "feedPostId", deserialize_with = "lenient")]
    pub feed_post_id: Option<RawId>,
    /// Reacting user (generic backend)
    #[serde(default, deserialize_with = "lenient")]
    pub userdetail: Option<RawUserDetail>,
    /// Reacting user (flat form)
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<RawId>,
    /// Reacting user (flat camelCase form)
    #[serde(default, rename = "userId", deserialize_with = "lenient")]
    pub user_id_camel: Option<RawId>,
}

impl RawReaction {
    /// Reaction id, `_id` first
    pub fn record_id(&self) -> Option<&RawId> {
        self.underscore_id.as_ref().or(self.id.as_ref())
    }

    /// Id of the reacting user, whichever form carried it
    pub fn reacting_user(&self) -> Option<String> {
        self.userdetail
            .as_ref()
            .and_then(|u| u.user_id.as_ref())
            .or(self.user_id.as_ref())
            .or(self.user_id_camel.as_ref())
            .map(ToString::to_string)
    }
}

/// An activity-stream record (BuddyBoss activity, or a generic feed post)
///
/// Fields the two backends name differently are kept apart; the accessors
/// below pick the BuddyBoss spelling first, except for the id where `_id`
/// wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawActivity {
    /// Record id (generic backend)
    #[serde(default, rename = "_id", deserialize_with = "lenient")]
    pub underscore_id: Option<RawId>,
    /// Activity id
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    /// Author id
    #[serde(default, deserialize_with = "lenient")]
    pub user_id: Option<RawId>,
    /// Author display name
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Activity title (HTML, usually anchor tags)
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Activity body (HTML)
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<ContentField>,
    /// Body with markup already removed by the server
    #[serde(default, deserialize_with = "lenient")]
    pub content_stripped: Option<String>,
    /// Plain body (generic backend)
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    /// Creation timestamp
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,
    /// Creation timestamp (generic backend)
    #[serde(default, rename = "createdAt", deserialize_with = "lenient")]
    pub created_at: Option<String>,
    /// Permalink
    #[serde(default, deserialize_with = "lenient")]
    pub link: Option<String>,
    /// Author avatar
    #[serde(default, deserialize_with = "lenient")]
    pub user_avatar: Option<ImageSizes>,
    /// Explicit like counter
    #[serde(default, deserialize_with = "lenient_count")]
    pub favorite_count: Option<u64>,
    /// Like counter (generic backend)
    #[serde(default, rename = "likesCount", deserialize_with = "lenient_count")]
    pub likes_count: Option<u64>,
    /// Reaction breakdown by kind
    #[serde(default, deserialize_with = "lenient_list")]
    pub reacted_counts: Vec<ReactedCount>,
    /// Comment counter
    #[serde(default, deserialize_with = "lenient_count")]
    pub comment_count: Option<u64>,
    /// Comment counter (generic backend)
    #[serde(default, rename = "commentsCount", deserialize_with = "lenient_count")]
    pub comments_count: Option<u64>,
    /// Media attachments
    #[serde(default, deserialize_with = "lenient_list")]
    pub bp_media_ids: Vec<MediaItem>,
    /// Plain image URLs (generic backend)
    #[serde(default, deserialize_with = "lenient_list")]
    pub images: Vec<String>,
    /// Author block (generic backend)
    #[serde(default, deserialize_with = "lenient")]
    pub userdetail: Option<RawUserDetail>,
    /// Reactions attached to the post
    #[serde(default, deserialize_with = "lenient_list")]
    pub reactions: Vec<RawReaction>,
}

impl RawActivity {
    /// Record id, `_id` first
    pub fn record_id(&self) -> Option<&RawId> {
        self.underscore_id.as_ref().or(self.id.as_ref())
    }

    /// Server-stripped body text
    pub fn stripped_body(&self) -> Option<&str> {
        self.content_stripped.as_deref().or(self.description.as_deref())
    }

    /// Creation timestamp as sent
    pub fn created(&self) -> Option<&str> {
        self.date.as_deref().or(self.created_at.as_deref())
    }

    /// Explicit like counter
    pub fn like_count(&self) -> Option<u64> {
        self.favorite_count.or(self.likes_count)
    }

    /// Comment counter
    pub fn comment_total(&self) -> Option<u64> {
        self.comment_count.or(self.comments_count)
    }
}

/// One normalized page of the feed endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    /// Raw records in server order
    pub items: Vec<RawActivity>,
    /// Total number of pages (never below 1)
    pub total_pages: u32,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

/// Read a non-negative counter from a number or numeric string
pub(crate) fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
