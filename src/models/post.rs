//! Post model (the shape the feed renders)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reaction;

/// Post author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Backend user id
    pub user_id: String,
    /// First word of the display name
    pub first_name: String,
    /// Rest of the display name
    pub last_name: String,
    /// Slug-style handle (`jane-doe`, or `user-<id>` when unnamed)
    pub user_name: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

/// A feed post, an immutable snapshot of what the backend returned
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post identity (merge key)
    pub id: String,
    /// Who wrote it
    pub author: Author,
    /// Body text, markup stripped
    pub body: String,
    /// Media URLs in attachment order
    pub media: Vec<String>,
    /// Permalink
    pub link: Option<String>,
    /// When the post was created, if the backend sent a parseable date
    pub created_at: Option<DateTime<Utc>>,
    /// Aggregate reactions
    pub likes_count: u64,
    /// Number of comments
    pub comments_count: u64,
    /// Individual reactions attached to the post
    pub reactions: Vec<Reaction>,
}

impl Post {
    /// Create an empty post with the given id
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Author name as it should be displayed
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.author.first_name, self.author.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.author.user_name.clone()
        } else {
            name.to_string()
        }
    }

    /// Get a short preview of the body (for list display)
    pub fn preview(&self, max_chars: usize) -> String {
        let body = self.body.replace('\n', " ");
        if body.chars().count() <= max_chars {
            body
        } else {
            let cut: String = body.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }

    /// Get relative time string (e.g., "5m", "2h", "3d")
    pub fn relative_time(&self) -> String {
        let Some(created_at) = self.created_at else {
            return String::new();
        };
        let duration = Utc::now().signed_duration_since(created_at);

        if duration.num_seconds() < 60 {
            format!("{}s", duration.num_seconds().max(0))
        } else if duration.num_minutes() < 60 {
            format!("{}m", duration.num_minutes())
        } else if duration.num_hours() < 24 {
            format!("{}h", duration.num_hours())
        } else if duration.num_days() < 7 {
            format!("{}d", duration.num_days())
        } else {
            created_at.format("%b %d").to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut post = Post::new("1");
        post.body = "čćžšđ čćžšđ čćžšđ".to_string();
        let preview = post.preview(8);
        assert_eq!(preview, "čćžšđ...");
    }

    #[test]
    fn test_relative_time() {
        let mut post = Post::new("1");
        assert_eq!(post.relative_time(), "");

        post.created_at = Some(Utc::now() - Duration::minutes(5));
        assert_eq!(post.relative_time(), "5m");

        post.created_at = Some(Utc::now() - Duration::hours(3));
        assert_eq!(post.relative_time(), "3h");
    }

    #[test]
    fn test_display_name_falls_back_to_handle() {
        let mut post = Post::new("1");
        post.author.user_name = "user-9".to_string();
        assert_eq!(post.display_name(), "user-9");

        post.author.first_name = "Amra".to_string();
        assert_eq!(post.display_name(), "Amra");
    }
}
