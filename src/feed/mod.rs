//! News feed: mapping, accumulated state, author colors, debounced search

pub mod colors;
pub mod debounce;
pub mod mapper;
pub mod store;

pub use colors::{ColorMap, UserColors, color_for_user};
pub use debounce::{Debouncer, SEARCH_DEBOUNCE};
pub use mapper::{map_to_post, strip_html};
pub use store::{FeedSnapshot, FeedStore, LoadOutcome, merge_by_id};
