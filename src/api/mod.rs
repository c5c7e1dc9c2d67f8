//! Backend API: feed pages, reactions and posts

pub mod client;
mod envelope;

use std::sync::Arc;

use crate::error::FeedResult;
use crate::models::{FeedPage, ReactionKind};

pub use client::{AuthPolicy, FeedClient, auth_headers};
pub use envelope::{feed_url, normalize_envelope};

/// Parameters of one feed page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number
    pub page: u32,
    /// Posts per page
    pub page_size: u32,
    /// Free-text search, omitted when `None`
    pub search: Option<String>,
    /// Only posts of this author, omitted when `None`
    pub user_id: Option<String>,
}

impl PageQuery {
    /// First page with no filters
    pub fn first(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            search: None,
            user_id: None,
        }
    }

    /// Same filters, different page
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }
}

/// A post to publish
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    /// Post text
    pub description: String,
    /// Already uploaded media URLs
    pub media: Vec<String>,
    /// Group to post into; a plain feed post when `None`
    pub group: Option<String>,
}

impl NewPost {
    /// Text-only feed post
    pub fn text(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::default()
        }
    }

    /// `postType` sent to the backend
    pub const fn post_type(&self) -> &'static str {
        if self.group.is_some() { "Group" } else { "Feed" }
    }
}

/// Source of feed pages
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    /// Fetch one page and normalize its envelope
    async fn fetch_page(&self, query: &PageQuery) -> FeedResult<FeedPage>;
}

/// Remote reactions endpoint
#[allow(async_fn_in_trait)]
pub trait ReactionsApi {
    /// Add a reaction of `kind` to a post
    async fn create_reaction(&self, post_id: &str, kind: ReactionKind) -> FeedResult<()>;

    /// Change the kind of an existing reaction
    async fn update_reaction(&self, reaction_id: &str, kind: ReactionKind) -> FeedResult<()>;

    /// Remove a reaction
    async fn delete_reaction(&self, reaction_id: &str) -> FeedResult<()>;
}

/// Remote posts endpoint
#[allow(async_fn_in_trait)]
pub trait PostsApi {
    /// Publish a post
    async fn create_post(&self, post: &NewPost) -> FeedResult<()>;

    /// Delete a post; returns the server's message, if any
    async fn delete_post(&self, post_id: &str) -> FeedResult<Option<String>>;
}

impl<T: FeedSource> FeedSource for Arc<T> {
    async fn fetch_page(&self, query: &PageQuery) -> FeedResult<FeedPage> {
        self.as_ref().fetch_page(query).await
    }
}

impl<T: ReactionsApi> ReactionsApi for Arc<T> {
    async fn create_reaction(&self, post_id: &str, kind: ReactionKind) -> FeedResult<()> {
        self.as_ref().create_reaction(post_id, kind).await
    }

    async fn update_reaction(&self, reaction_id: &str, kind: ReactionKind) -> FeedResult<()> {
        self.as_ref().update_reaction(reaction_id, kind).await
    }

    async fn delete_reaction(&self, reaction_id: &str) -> FeedResult<()> {
        self.as_ref().delete_reaction(reaction_id).await
    }
}

impl<T: PostsApi> PostsApi for Arc<T> {
    async fn create_post(&self, post: &NewPost) -> FeedResult<()> {
        self.as_ref().create_post(post).await
    }

    async fn delete_post(&self, post_id: &str) -> FeedResult<Option<String>> {
        self.as_ref().delete_post(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_helpers() {
        let first = PageQuery::first(0);
        assert_eq!(first.page, 1);
        assert_eq!(first.page_size, 1);

        let query = PageQuery {
            search: Some("cats".to_string()),
            ..PageQuery::first(10)
        };
        let third = query.with_page(3);
        assert_eq!(third.page, 3);
        assert_eq!(third.search.as_deref(), Some("cats"));
    }

    #[test]
    fn test_post_type() {
        assert_eq!(NewPost::text("hi").post_type(), "Feed");
        let grouped = NewPost {
            group: Some("12".to_string()),
            ..NewPost::text("hi")
        };
        assert_eq!(grouped.post_type(), "Group");
    }
}
