//! Per-author display colors
//!
//! Authors without an avatar are drawn as a colored circle with initials.
//! The color of a user id never changes, and the full id → color mapping
//! is published to subscribers whenever new authors show up.

use std::collections::BTreeMap;

use tokio::sync::watch;

/// Mapping from author id to hex color
pub type ColorMap = BTreeMap<String, String>;

const PALETTE: &[&str] = &[
    "#E57373", "#F06292", "#BA68C8", "#9575CD", "#7986CB", "#64B5F6", "#4FC3F7", "#4DD0E1",
    "#4DB6AC", "#81C784", "#AED581", "#FF8A65", "#D4E157", "#FFD54F", "#FFB74D", "#A1887F",
];

/// Deterministic color for a user id
pub fn color_for_user(user_id: &str) -> String {
    let hash = user_id.chars().fold(0_i32, |hash, c| {
        (c as i32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    });
    PALETTE[hash.unsigned_abs() as usize % PALETTE.len()].to_string()
}

/// Shared color assignment service
pub struct UserColors {
    assign: fn(&str) -> String,
    map: watch::Sender<ColorMap>,
}

impl Default for UserColors {
    fn default() -> Self {
        Self::new()
    }
}

impl UserColors {
    /// Create an empty mapping using [`color_for_user`]
    pub fn new() -> Self {
        Self::with_assigner(color_for_user)
    }

    /// Create an empty mapping with a custom assignment function
    pub fn with_assigner(assign: fn(&str) -> String) -> Self {
        let (map, _) = watch::channel(ColorMap::new());
        Self { assign, map }
    }

    /// Assign colors to every id that has none yet.
    ///
    /// Returns how many ids were added; subscribers are only notified when
    /// that is non-zero.
    pub fn assign_missing<'a>(&self, user_ids: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        self.map.send_if_modified(|map| {
            for id in user_ids {
                if id.is_empty() || map.contains_key(id) {
                    continue;
                }
                map.insert(id.to_string(), (self.assign)(id));
                added += 1;
            }
            added > 0
        });
        if added > 0 {
            tracing::debug!("Assigned colors to {added} new authors");
        }
        added
    }

    /// Color for a user, if assigned
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.map.borrow().get(user_id).cloned()
    }

    /// Current mapping
    pub fn snapshot(&self) -> ColorMap {
        self.map.borrow().clone()
    }

    /// Receive the mapping every time it grows
    pub fn subscribe(&self) -> watch::Receiver<ColorMap> {
        self.map.subscribe()
    }
}
