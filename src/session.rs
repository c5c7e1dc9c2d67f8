//! Feed session: the event loop behind a feed screen
//!
//! A [`FeedSession`] owns one [`FeedStore`] and one [`ReactionReconciler`]
//! sharing a backend. It reacts to three sources on a single task:
//! commands from the front end, the refetch signal (re-read the current
//! page) and settled search text (start over from page 1). After each
//! state change it sends a [`FeedSnapshot`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{FeedSource, NewPost, PostsApi, ReactionsApi};
use crate::config::Config;
use crate::error::{ErrorReporter, TracingReporter};
use crate::feed::{Debouncer, FeedSnapshot, FeedStore};
use crate::models::ReactionKind;
use crate::reactions::{ReactionOutcome, ReactionReconciler, RefetchSignal};

/// Requests from the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Load (or reload) page 1
    LoadFirstPage,
    /// Pull to refresh
    Refresh,
    /// Load the next page
    LoadMore,
    /// One keystroke's worth of search text; debounced
    SearchInput(String),
    /// React to a held post (`None` means like)
    React {
        /// Post to react to
        post_id: String,
        /// Requested kind
        kind: Option<ReactionKind>,
    },
    /// Delete one of the viewer's posts
    Delete {
        /// Post to delete
        post_id: String,
    },
    /// Publish a new post
    Publish(NewPost),
    /// Stop the loop
    Shutdown,
}

/// Updates for the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// Current feed state
    Snapshot(FeedSnapshot),
    /// One-line message for the user
    Notice(String),
}

/// Event loop for one feed screen
pub struct FeedSession<B> {
    backend: Arc<B>,
    store: FeedStore<Arc<B>>,
    reconciler: ReactionReconciler<Arc<B>>,
    signal: RefetchSignal,
    reporter: Arc<dyn ErrorReporter>,
    viewer_id: String,
    search_window: Duration,
}

impl<B> FeedSession<B>
where
    B: FeedSource + ReactionsApi + PostsApi,
{
    /// Session for `viewer_id` using the page size and debounce window of
    /// `config`
    pub fn new(backend: Arc<B>, viewer_id: &str, config: &Config) -> Self {
        let signal = RefetchSignal::new();
        Self {
            store: FeedStore::new(Arc::clone(&backend), config.page_size()),
            reconciler: ReactionReconciler::new(Arc::clone(&backend), signal.clone()),
            backend,
            signal,
            reporter: Arc::new(TracingReporter),
            viewer_id: viewer_id.to_string(),
            search_window: config.search_debounce(),
        }
    }

    /// Report failures somewhere else than the log
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.store = self.store.with_reporter(Arc::clone(&reporter));
        self.reconciler = self.reconciler.with_reporter(Arc::clone(&reporter));
        self.reporter = reporter;
        self
    }

    /// Only show posts of one author
    #[must_use]
    pub fn with_user_filter(mut self, user_id: Option<String>) -> Self {
        self.store = self.store.with_user_filter(user_id);
        self
    }

    /// The underlying store
    pub const fn store(&self) -> &FeedStore<Arc<B>> {
        &self.store
    }

    /// Signal flipped after reactions and new posts
    pub const fn refetch_signal(&self) -> &RefetchSignal {
        &self.signal
    }

    /// Run until [`FeedCommand::Shutdown`], until `commands` closes or
    /// until nobody listens to `events` any more.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<FeedCommand>,
        events: mpsc::Sender<FeedEvent>,
    ) {
        let mut refetch = self.signal.subscribe();
        let (mut debouncer, mut settled) = Debouncer::new(self.search_window);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        None | Some(FeedCommand::Shutdown) => break,
                        Some(FeedCommand::SearchInput(text)) => {
                            debouncer.push(text);
                            continue;
                        }
                        Some(command) => self.handle(command, &events).await,
                    }
                }
                Ok(()) = refetch.changed() => {
                    tracing::debug!("Refetch signalled");
                    self.store.refresh_current_page().await;
                }
                Some(text) = settled.recv() => {
                    tracing::debug!("Search settled: {text:?}");
                    self.store.search(&text).await;
                }
            }

            if events
                .send(FeedEvent::Snapshot(self.store.snapshot()))
                .await
                .is_err()
            {
                break;
            }
        }

        debouncer.cancel();
        tracing::debug!("Feed session stopped");
    }

    async fn handle(&self, command: FeedCommand, events: &mpsc::Sender<FeedEvent>) {
        let notice = match command {
            FeedCommand::LoadFirstPage => {
                self.store.load_first_page().await;
                None
            }
            FeedCommand::Refresh => {
                self.store.pull_to_refresh().await;
                None
            }
            FeedCommand::LoadMore => {
                self.store.load_next_page().await;
                None
            }
            FeedCommand::React { post_id, kind } => Some(self.react(&post_id, kind).await),
            FeedCommand::Delete { post_id } => Some(self.delete(&post_id).await),
            FeedCommand::Publish(post) => Some(self.publish(&post).await),
            FeedCommand::SearchInput(_) | FeedCommand::Shutdown => None,
        };

        if let Some(notice) = notice {
            let _ = events.send(FeedEvent::Notice(notice)).await;
        }
    }

    async fn react(&self, post_id: &str, kind: Option<ReactionKind>) -> String {
        let Some(post) = self.store.post(post_id) else {
            return format!("No post {post_id} in the feed");
        };
        if self.reconciler.is_submitting() {
            return "A reaction is already being sent".to_string();
        }

        match self
            .reconciler
            .apply_reaction(&post.id, &self.viewer_id, &post.reactions, kind)
            .await
        {
            ReactionOutcome::Applied(action) => action.to_string(),
            ReactionOutcome::Failed(_) => "Could not update the reaction".to_string(),
        }
    }

    async fn delete(&self, post_id: &str) -> String {
        match self.backend.delete_post(post_id).await {
            Ok(message) => {
                self.store.remove_post(post_id);
                message.unwrap_or_else(|| "Post deleted".to_string())
            }
            Err(e) => {
                self.reporter.report("Deleting the post", &e);
                format!("Could not delete the post: {e}")
            }
        }
    }

    async fn publish(&self, post: &NewPost) -> String {
        match self.backend.create_post(post).await {
            Ok(()) => {
                self.signal.toggle();
                "Post published".to_string()
            }
            Err(e) => {
                self.reporter.report("Publishing the post", &e);
                format!("Could not publish the post: {e}")
            }
        }
    }
}
