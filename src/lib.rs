//! # feedkit
//!
//! News feed, reactions and posting for BuddyBoss-style social backends.
//!
//! ## Overview
//!
//! feedkit pages through a remote news feed, normalizes the activity-stream
//! records it returns into plain posts, keeps the accumulated feed state
//! (pages, loading flags, merge-by-id on refresh) and reconciles the
//! viewer's reaction to a post against the reactions endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  FeedClient  │──▶│  map_to_post │──▶│  FeedStore   │──▶ snapshots
//! │ (FeedSource) │   │   (mapper)   │   │ pages, merge │
//! └──────────────┘   └──────────────┘   └──────────────┘
//!         ▲                                    ▲
//!         │                                    │ refetch signal
//! ┌──────────────┐                     ┌──────────────┐
//! │ ReactionsApi │◀────────────────────│  Reaction    │
//! │  PostsApi    │                     │  Reconciler  │
//! └──────────────┘                     └──────────────┘
//! ```
//!
//! [`session::FeedSession`] wires these together into one event loop.
//!
//! ## Modules
//!
//! - [`api`]: Backend traits and the HTTP client
//! - [`auth`]: Encrypted token storage
//! - [`config`]: Configuration management
//! - [`error`]: Error taxonomy and the error reporter
//! - [`feed`]: Mapper, feed store, author colors, search debouncing
//! - [`models`]: Data models (Post, Reaction, raw activity records)
//! - [`reactions`]: Reaction planning and submission
//! - [`session`]: Feed screen event loop
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use feedkit::api::FeedClient;
//! use feedkit::auth::CredentialStore;
//! use feedkit::feed::FeedStore;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = feedkit::Config::load()?;
//! let tokens = Arc::new(CredentialStore::open_default()?);
//! let client = FeedClient::new(config.clone(), tokens)?;
//!
//! let store = FeedStore::new(client, config.page_size());
//! store.load_first_page().await;
//! for post in store.posts() {
//!     println!("{}: {}", post.display_name(), post.preview(80));
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::future_not_send)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod paths;
pub mod reactions;
pub mod session;

// Re-export main types for convenience
pub use config::{BackendFlavor, Config};
pub use error::{ErrorReporter, FeedError, FeedResult};
pub use models::{Author, Post, Reaction, ReactionKind};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
