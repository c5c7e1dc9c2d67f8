//! Per-post reaction reconciliation
//!
//! A viewer holds at most one reaction per post. Given the reactions the
//! backend returned for a post, [`plan_reaction`] picks the single remote
//! call (create, update or delete) that moves the viewer to the requested
//! state. Nothing is predicted locally: after a successful call the
//! [`RefetchSignal`] flips and the feed re-reads the post from the server.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::api::ReactionsApi;
use crate::error::{ErrorReporter, FeedResult, TracingReporter};
use crate::models::{Reaction, ReactionKind};

/// The viewer's reaction to one post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactionState {
    /// The viewer has not reacted
    #[default]
    NoReaction,
    /// The viewer reacted with this kind
    Reacting(ReactionKind),
}

impl ReactionState {
    /// Derive the viewer's state from a post's reactions
    pub fn of(viewer_id: &str, reactions: &[Reaction]) -> Self {
        reactions
            .iter()
            .find(|r| r.user_id == viewer_id)
            .map_or(Self::NoReaction, |r| Self::Reacting(r.kind))
    }
}

/// The one remote call a reaction request turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionAction {
    /// `POST` a new reaction
    Create {
        /// Post reacted to
        post_id: String,
        /// Requested kind
        kind: ReactionKind,
    },
    /// `PUT` a new kind onto the viewer's reaction
    Update {
        /// Viewer's reaction
        reaction_id: String,
        /// Requested kind
        kind: ReactionKind,
    },
    /// `DELETE` the viewer's reaction (toggle off)
    Delete {
        /// Viewer's reaction
        reaction_id: String,
    },
}

impl fmt::Display for ReactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { kind, .. } => write!(f, "Reacted {} {kind}", kind.emoji()),
            Self::Update { kind, .. } => write!(f, "Changed reaction to {} {kind}", kind.emoji()),
            Self::Delete { .. } => write!(f, "Reaction removed"),
        }
    }
}

/// Choose the remote call for a reaction request.
///
/// - the requested kind is already present on the post and the viewer has
///   a reaction: delete the viewer's reaction
/// - the viewer has a reaction: update it to the requested kind
/// - otherwise: create one
///
/// The first rule looks at reactions from anyone, not just the viewer.
/// No requested kind means [`ReactionKind::Like`].
pub fn plan_reaction(
    post_id: &str,
    viewer_id: &str,
    existing: &[Reaction],
    requested: Option<ReactionKind>,
) -> ReactionAction {
    let kind = requested.unwrap_or_default();
    let own = existing.iter().find(|r| r.user_id == viewer_id);
    let kind_present = existing.iter().any(|r| r.kind == kind);

    match own {
        Some(own) if kind_present => ReactionAction::Delete {
            reaction_id: own.id.clone(),
        },
        Some(own) => ReactionAction::Update {
            reaction_id: own.id.clone(),
            kind,
        },
        None => ReactionAction::Create {
            post_id: post_id.to_string(),
            kind,
        },
    }
}

/// Boolean toggle telling the feed that posts should be re-fetched
#[derive(Debug, Clone)]
pub struct RefetchSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for RefetchSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RefetchSignal {
    /// New signal, initially `false`
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Flip the flag, waking every subscriber
    pub fn toggle(&self) {
        self.tx.send_modify(|flag| *flag = !*flag);
    }

    /// Current flag value
    pub fn value(&self) -> bool {
        *self.tx.borrow()
    }

    /// Observe flips
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Result of [`ReactionReconciler::apply_reaction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The call succeeded and a refetch was signalled
    Applied(ReactionAction),
    /// The call failed and was reported; nothing changed locally
    Failed(ReactionAction),
}

struct SubmittingGuard<'a>(&'a AtomicBool);

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Submits reaction changes and signals refetches
pub struct ReactionReconciler<R> {
    api: R,
    signal: RefetchSignal,
    reporter: Arc<dyn ErrorReporter>,
    submitting: AtomicBool,
}

impl<R: ReactionsApi> ReactionReconciler<R> {
    /// Reconciler flipping `signal` after every successful call
    pub fn new(api: R, signal: RefetchSignal) -> Self {
        Self {
            api,
            signal,
            reporter: Arc::new(TracingReporter),
            submitting: AtomicBool::new(false),
        }
    }

    /// Use a different error reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Whether a call is in flight. Controls that trigger reactions should
    /// be disabled while this is set; the reconciler itself does not lock.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    /// The signal flipped on success
    pub const fn signal(&self) -> &RefetchSignal {
        &self.signal
    }

    /// Submit exactly one create, update or delete for the viewer
    pub async fn apply_reaction(
        &self,
        post_id: &str,
        viewer_id: &str,
        existing: &[Reaction],
        requested: Option<ReactionKind>,
    ) -> ReactionOutcome {
        let action = plan_reaction(post_id, viewer_id, existing, requested);

        self.submitting.store(true, Ordering::SeqCst);
        let _guard = SubmittingGuard(&self.submitting);

        match self.submit(&action).await {
            Ok(()) => {
                tracing::info!("Reaction on post {post_id}: {action:?}");
                self.signal.toggle();
                ReactionOutcome::Applied(action)
            }
            Err(e) => {
                self.reporter.report("Updating the reaction", &e);
                ReactionOutcome::Failed(action)
            }
        }
    }

    async fn submit(&self, action: &ReactionAction) -> FeedResult<()> {
        match action {
            ReactionAction::Create { post_id, kind } => {
                self.api.create_reaction(post_id, *kind).await
            }
            ReactionAction::Update { reaction_id, kind } => {
                self.api.update_reaction(reaction_id, *kind).await
            }
            ReactionAction::Delete { reaction_id } => self.api.delete_reaction(reaction_id).await,
        }
    }
}
