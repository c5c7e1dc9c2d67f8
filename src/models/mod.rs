//! Data models for feedkit

mod activity;
mod post;
mod reaction;

pub use activity::{
    ContentField, FeedPage, ImageSizes, MediaItem, RawActivity, RawId, RawReaction,
    RawUserDetail, ReactedCount,
};
pub(crate) use activity::count_from_value;
pub use post::{Author, Post};
pub use reaction::{Reaction, ReactionKind};
