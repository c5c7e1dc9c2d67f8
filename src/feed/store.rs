//! Accumulated feed state: pages, loading flags, merge-by-id
//!
//! The store never lets a fetch error escape. Failures go to the
//! [`ErrorReporter`] and are kept as `last_error`; the loading flags are
//! cleared on every path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{FeedSource, PageQuery};
use crate::error::{ErrorReporter, FeedError, TracingReporter};
use crate::models::{FeedPage, Post};

use super::colors::{ColorMap, UserColors};
use super::mapper::map_to_post;

/// What a store operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched; `count` posts came back
    Loaded {
        /// Posts on the fetched page
        count: usize,
    },
    /// Nothing to do (already fetching, last page reached, unchanged query)
    Skipped,
    /// The fetch failed and was reported
    Failed,
}

/// Read-only copy of the store state for rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Posts in display order
    pub posts: Vec<Post>,
    /// Last page loaded (1-based)
    pub current_page: u32,
    /// Pages the backend reports
    pub total_pages: u32,
    /// Initial load in flight
    pub is_loading: bool,
    /// Pull-to-refresh in flight
    pub is_refreshing: bool,
    /// "Load more" in flight
    pub is_fetching_more: bool,
    /// Message of the last failed fetch, cleared by the next success
    pub last_error: Option<String>,
    /// Author id → color
    pub colors: ColorMap,
}

impl FeedSnapshot {
    /// Whether another page can be requested
    pub const fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug)]
struct FeedState {
    items: Vec<Post>,
    current_page: u32,
    total_pages: u32,
    is_loading: bool,
    is_refreshing: bool,
    is_fetching_more: bool,
    last_error: Option<String>,
    query: PageQuery,
}

/// Merge `incoming` into `existing` keyed by post id.
///
/// An id already present keeps its position and takes the incoming
/// content; ids seen for the first time are appended in arrival order.
/// Duplicates inside `existing` collapse onto their first position.
pub fn merge_by_id(existing: Vec<Post>, incoming: Vec<Post>) -> Vec<Post> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    let mut merged: Vec<Post> = Vec::with_capacity(existing.len() + incoming.len());

    for post in existing.into_iter().chain(incoming) {
        if let Some(&at) = index.get(&post.id) {
            merged[at] = post;
        } else {
            index.insert(post.id.clone(), merged.len());
            merged.push(post);
        }
    }

    merged
}

/// Clears loading flags when dropped, whatever the fetch outcome
struct FlagReset<'a> {
    state: &'a Mutex<FeedState>,
    reset: fn(&mut FeedState),
}

impl Drop for FlagReset<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (self.reset)(&mut state);
    }
}

/// Paginated feed backed by a [`FeedSource`]
pub struct FeedStore<S> {
    source: S,
    state: Mutex<FeedState>,
    reporter: Arc<dyn ErrorReporter>,
    colors: Arc<UserColors>,
}

impl<S: FeedSource> FeedStore<S> {
    /// Empty store fetching `page_size` posts per page
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            state: Mutex::new(FeedState {
                items: Vec::new(),
                current_page: 1,
                total_pages: 1,
                is_loading: false,
                is_refreshing: false,
                is_fetching_more: false,
                last_error: None,
                query: PageQuery::first(page_size),
            }),
            reporter: Arc::new(TracingReporter),
            colors: Arc::new(UserColors::new()),
        }
    }

    /// Use a different error reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Share a color service with other components
    #[must_use]
    pub fn with_colors(mut self, colors: Arc<UserColors>) -> Self {
        self.colors = colors;
        self
    }

    /// Only show posts of one author
    #[must_use]
    pub fn with_user_filter(self, user_id: Option<String>) -> Self {
        self.lock().query.user_id = user_id.filter(|u| !u.is_empty());
        self
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset_on_drop(&self, reset: fn(&mut FeedState)) -> FlagReset<'_> {
        FlagReset {
            state: &self.state,
            reset,
        }
    }

    /// Map a fetched page and assign colors to its authors
    fn accept(&self, page: FeedPage) -> (Vec<Post>, u32) {
        let posts: Vec<Post> = page.items.iter().map(map_to_post).collect();
        self.colors
            .assign_missing(posts.iter().map(|p| p.author.user_id.as_str()));
        (posts, page.total_pages.max(1))
    }

    fn fail(&self, context: &str, error: &FeedError) -> LoadOutcome {
        self.reporter.report(context, error);
        self.lock().last_error = Some(error.to_string());
        LoadOutcome::Failed
    }

    /// Fetch page 1 and replace everything held so far
    pub async fn load_first_page(&self) -> LoadOutcome {
        let query = {
            let mut state = self.lock();
            state.is_loading = true;
            state.query.with_page(1)
        };
        let _reset = self.reset_on_drop(|s| {
            s.is_loading = false;
            s.is_refreshing = false;
        });

        match self.source.fetch_page(&query).await {
            Ok(page) => {
                let (posts, total_pages) = self.accept(page);
                let count = posts.len();
                let mut state = self.lock();
                state.items = posts;
                state.current_page = 1;
                state.total_pages = total_pages;
                state.last_error = None;
                tracing::info!("Loaded first page: {count} posts of {total_pages} pages");
                LoadOutcome::Loaded { count }
            }
            Err(e) => self.fail("Loading the feed", &e),
        }
    }

    /// Fetch the page after `current_page` and append it.
    ///
    /// Ignored while another "load more" is in flight and once the last
    /// page has been loaded. Appended posts are not de-duplicated.
    pub async fn load_next_page(&self) -> LoadOutcome {
        let query = {
            let mut state = self.lock();
            if state.is_fetching_more || state.current_page >= state.total_pages {
                tracing::debug!(
                    "Skipping load more (page {}/{}, fetching: {})",
                    state.current_page,
                    state.total_pages,
                    state.is_fetching_more
                );
                return LoadOutcome::Skipped;
            }
            state.is_fetching_more = true;
            state.query.with_page(state.current_page + 1)
        };
        let _reset = self.reset_on_drop(|s| s.is_fetching_more = false);

        match self.source.fetch_page(&query).await {
            Ok(page) => {
                let (posts, total_pages) = self.accept(page);
                let count = posts.len();
                let mut state = self.lock();
                state.items.extend(posts);
                state.current_page = query.page;
                state.total_pages = total_pages;
                state.last_error = None;
                tracing::info!("Loaded page {}: {count} posts", query.page);
                LoadOutcome::Loaded { count }
            }
            Err(e) => self.fail("Loading more posts", &e),
        }
    }

    /// Re-fetch `current_page` and merge it into the held posts by id
    pub async fn refresh_current_page(&self) -> LoadOutcome {
        let query = {
            let state = self.lock();
            state.query.with_page(state.current_page)
        };

        match self.source.fetch_page(&query).await {
            Ok(page) => {
                let (posts, total_pages) = self.accept(page);
                let count = posts.len();
                let mut state = self.lock();
                let existing = std::mem::take(&mut state.items);
                state.items = merge_by_id(existing, posts);
                state.total_pages = total_pages;
                state.last_error = None;
                tracing::info!("Refreshed page {}: {count} posts", query.page);
                LoadOutcome::Loaded { count }
            }
            Err(e) => self.fail("Refreshing the feed", &e),
        }
    }

    /// User-initiated refresh: start over from page 1
    pub async fn pull_to_refresh(&self) -> LoadOutcome {
        self.lock().is_refreshing = true;
        self.load_first_page().await
    }

    /// Change the search text. Returns whether the query changed.
    pub fn set_search(&self, text: &str) -> bool {
        let search = Some(text.trim().to_string()).filter(|s| !s.is_empty());
        let mut state = self.lock();
        if state.query.search == search {
            return false;
        }
        state.query.search = search;
        true
    }

    /// Apply new search text and reload from page 1 if it changed
    pub async fn search(&self, text: &str) -> LoadOutcome {
        if !self.set_search(text) {
            return LoadOutcome::Skipped;
        }
        self.load_first_page().await
    }

    /// Drop a post from the held list. Returns whether it was present.
    pub fn remove_post(&self, post_id: &str) -> bool {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|p| p.id != post_id);
        before != state.items.len()
    }

    /// Copy of a held post
    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.lock().items.iter().find(|p| p.id == post_id).cloned()
    }

    /// Held posts in display order
    pub fn posts(&self) -> Vec<Post> {
        self.lock().items.clone()
    }

    /// Last page loaded
    pub fn current_page(&self) -> u32 {
        self.lock().current_page
    }

    /// Pages the backend reports
    pub fn total_pages(&self) -> u32 {
        self.lock().total_pages
    }

    /// Current search text
    pub fn search_text(&self) -> Option<String> {
        self.lock().query.search.clone()
    }

    /// Message of the last failed fetch
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Shared color service
    pub fn colors(&self) -> Arc<UserColors> {
        Arc::clone(&self.colors)
    }

    /// Read-only copy of everything a renderer needs
    pub fn snapshot(&self) -> FeedSnapshot {
        let colors = self.colors.snapshot();
        let state = self.lock();
        FeedSnapshot {
            posts: state.items.clone(),
            current_page: state.current_page,
            total_pages: state.total_pages,
            is_loading: state.is_loading,
            is_refreshing: state.is_refreshing,
            is_fetching_more: state.is_fetching_more,
            last_error: state.last_error.clone(),
            colors,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{CollectingReporter, FeedResult};
    use crate::models::{RawActivity, RawId};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub(crate) fn raw(id: &str, user: &str) -> RawActivity {
        RawActivity {
            id: Some(RawId::Text(id.to_string())),
            user_id: Some(RawId::Text(user.to_string())),
            content_stripped: Some(format!("post {id}")),
            ..RawActivity::default()
        }
    }

    /// In-memory feed: `pages[n]` is page n+1
    #[derive(Default)]
    pub(crate) struct FakeFeed {
        pub pages: Mutex<Vec<Vec<RawActivity>>>,
        pub total_pages: Mutex<Option<u32>>,
        pub fail: AtomicBool,
        pub calls: AtomicUsize,
        pub queries: Mutex<Vec<PageQuery>>,
    }

    impl FakeFeed {
        pub(crate) fn with_pages(pages: Vec<Vec<RawActivity>>) -> Self {
            let total = u32::try_from(pages.len()).unwrap();
            Self {
                pages: Mutex::new(pages),
                total_pages: Mutex::new(Some(total)),
                ..Self::default()
            }
        }
    }

    impl FeedSource for FakeFeed {
        async fn fetch_page(&self, query: &PageQuery) -> FeedResult<FeedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.clone());
            tokio::task::yield_now().await;

            if self.fail.load(Ordering::SeqCst) {
                return Err(FeedError::Http {
                    status: 500,
                    body: "boom".to_string(),
                });
            }

            let items = self
                .pages
                .lock()
                .unwrap()
                .get(query.page as usize - 1)
                .cloned()
                .unwrap_or_default();
            let total_pages = self.total_pages.lock().unwrap().unwrap_or(1);
            Ok(FeedPage { items, total_pages })
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    fn three_pages() -> FakeFeed {
        FakeFeed::with_pages(vec![
            vec![raw("1", "a"), raw("2", "b")],
            vec![raw("3", "a"), raw("4", "c")],
            vec![raw("5", "d")],
        ])
    }

    #[test]
    fn test_merge_keeps_positions_and_appends_new() {
        let existing = vec![Post::new("a"), Post::new("b"), Post::new("c")];
        let mut updated_b = Post::new("b");
        updated_b.body = "edited".to_string();
        let incoming = vec![Post::new("d"), updated_b];

        let merged = merge_by_id(existing, incoming);
        assert_eq!(ids(&merged), vec!["a", "b", "c", "d"]);
        assert_eq!(merged[1].body, "edited");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![Post::new("1"), Post::new("2")];
        let incoming = vec![Post::new("2"), Post::new("3")];

        let once = merge_by_id(existing, incoming.clone());
        let twice = merge_by_id(once.clone(), incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_collapses_duplicates() {
        let merged = merge_by_id(vec![Post::new("x"), Post::new("x")], vec![]);
        assert_eq!(ids(&merged), vec!["x"]);
    }

    #[tokio::test]
    async fn test_next_pages_accumulate() {
        let store = FeedStore::new(three_pages(), 2);

        assert_eq!(store.load_first_page().await, LoadOutcome::Loaded { count: 2 });
        assert_eq!(store.load_next_page().await, LoadOutcome::Loaded { count: 2 });
        assert_eq!(store.posts().len(), 4);
        assert_eq!(store.load_next_page().await, LoadOutcome::Loaded { count: 1 });
        assert_eq!(ids(&store.posts()), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(store.current_page(), 3);

        // Last page reached
        assert_eq!(store.load_next_page().await, LoadOutcome::Skipped);
        assert_eq!(store.posts().len(), 5);
    }

    #[tokio::test]
    async fn test_first_page_replaces() {
        let store = FeedStore::new(three_pages(), 2);
        store.load_first_page().await;
        store.load_next_page().await;
        assert_eq!(store.posts().len(), 4);

        store.load_first_page().await;
        assert_eq!(ids(&store.posts()), vec!["1", "2"]);
        assert_eq!(store.current_page(), 1);
    }

    #[tokio::test]
    async fn test_missing_meta_makes_load_more_a_noop() {
        let feed = FakeFeed::with_pages(vec![vec![raw("1", "a")], vec![raw("2", "a")]]);
        *feed.total_pages.lock().unwrap() = None;
        let store = FeedStore::new(feed, 10);

        store.load_first_page().await;
        assert_eq!(store.total_pages(), 1);
        assert_eq!(store.load_next_page().await, LoadOutcome::Skipped);
        assert_eq!(store.posts().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_load_more_is_ignored() {
        let feed = Arc::new(three_pages());
        let store = FeedStore::new(Arc::clone(&feed), 2);
        store.load_first_page().await;

        let (first, second) = tokio::join!(store.load_next_page(), store.load_next_page());
        assert_eq!(first, LoadOutcome::Loaded { count: 2 });
        assert_eq!(second, LoadOutcome::Skipped);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
        assert!(!store.snapshot().is_fetching_more);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_flags_reset() {
        let feed = Arc::new(three_pages());
        let reporter = Arc::new(CollectingReporter::new());
        let store = FeedStore::new(Arc::clone(&feed), 2).with_reporter(reporter.clone());
        store.load_first_page().await;

        feed.fail.store(true, Ordering::SeqCst);
        assert_eq!(store.load_next_page().await, LoadOutcome::Failed);
        assert_eq!(store.pull_to_refresh().await, LoadOutcome::Failed);

        let snapshot = store.snapshot();
        assert!(!snapshot.is_loading);
        assert!(!snapshot.is_refreshing);
        assert!(!snapshot.is_fetching_more);
        assert_eq!(snapshot.current_page, 1);
        // Previously shown content stays
        assert_eq!(snapshot.posts.len(), 2);
        assert!(snapshot.last_error.unwrap().contains("500"));
        assert_eq!(reporter.len(), 2);

        feed.fail.store(false, Ordering::SeqCst);
        store.load_next_page().await;
        assert_eq!(store.last_error(), None);
    }

    #[tokio::test]
    async fn test_refresh_merges_current_page() {
        let feed = Arc::new(three_pages());
        let store = FeedStore::new(Arc::clone(&feed), 2);
        store.load_first_page().await;
        store.load_next_page().await;

        // Page 2 now has an edited post and a new one
        let mut edited = raw("3", "a");
        edited.content_stripped = Some("edited".to_string());
        feed.pages.lock().unwrap()[1] = vec![raw("9", "e"), edited];

        assert_eq!(store.refresh_current_page().await, LoadOutcome::Loaded { count: 2 });
        let posts = store.posts();
        assert_eq!(ids(&posts), vec!["1", "2", "3", "4", "9"]);
        assert_eq!(posts[2].body, "edited");

        store.refresh_current_page().await;
        assert_eq!(store.posts(), posts);
    }

    #[tokio::test]
    async fn test_search_resets_to_first_page() {
        let feed = Arc::new(three_pages());
        let store = FeedStore::new(Arc::clone(&feed), 2);
        store.load_first_page().await;
        store.load_next_page().await;

        assert_eq!(store.search("  cats ").await, LoadOutcome::Loaded { count: 2 });
        assert_eq!(store.current_page(), 1);
        assert_eq!(store.search_text().as_deref(), Some("cats"));
        assert_eq!(store.search("cats").await, LoadOutcome::Skipped);

        let last = feed.queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.page, 1);
        assert_eq!(last.search.as_deref(), Some("cats"));

        assert!(store.set_search(""));
        assert_eq!(store.search_text(), None);
    }

    #[tokio::test]
    async fn test_colors_assigned_per_author() {
        let store = FeedStore::new(three_pages(), 2);
        let mut colors = store.colors().subscribe();

        store.load_first_page().await;
        assert!(colors.has_changed().unwrap());
        let map = colors.borrow_and_update().clone();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);

        store.load_next_page().await;
        assert_eq!(store.snapshot().colors.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_post() {
        let store = FeedStore::new(three_pages(), 2);
        store.load_first_page().await;

        assert!(store.remove_post("1"));
        assert!(!store.remove_post("1"));
        assert_eq!(ids(&store.posts()), vec!["2"]);
        assert!(store.post("2").is_some());
    }

    #[tokio::test]
    async fn test_user_filter_is_sent() {
        let feed = Arc::new(three_pages());
        let store = FeedStore::new(Arc::clone(&feed), 2).with_user_filter(Some("42".to_string()));
        store.load_first_page().await;

        let query = feed.queries.lock().unwrap()[0].clone();
        assert_eq!(query.user_id.as_deref(), Some("42"));
        assert_eq!(query.page_size, 2);
    }
}
