//! Reaction model

use serde::{Deserialize, Serialize};

/// The fixed set of reactions a user can leave on a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ReactionKind {
    /// Thumbs up
    #[default]
    Like,
    /// Heart
    Love,
    /// Sad face
    Sad,
    /// Surprised face
    Shock,
    /// Laughing face
    Laugh,
    /// Angry face
    Angry,
    /// A label this client does not know; never sent
    Unknown,
}

impl ReactionKind {
    /// Get all reaction kinds, in picker order
    pub const fn all() -> &'static [Self] {
        &[
            Self::Like,
            Self::Love,
            Self::Sad,
            Self::Shock,
            Self::Laugh,
            Self::Angry,
        ]
    }

    /// Wire name sent to the reactions endpoint
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "Like",
            Self::Love => "Love",
            Self::Sad => "Sad",
            Self::Shock => "Shock",
            Self::Laugh => "Laugh",
            Self::Angry => "Angry",
            Self::Unknown => "Unknown",
        }
    }

    /// Get the emoji icon
    pub const fn emoji(&self) -> &'static str {
        match self {
            Self::Like => "👍",
            Self::Love => "❤️",
            Self::Sad => "😢",
            Self::Shock => "😮",
            Self::Laugh => "😂",
            Self::Angry => "😠",
            Self::Unknown => "❔",
        }
    }

    /// Parse from string. Accepts the past-tense labels the apps display
    /// ("Liked", "Loved", ...) as well as the wire names.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "like" | "liked" => Some(Self::Like),
            "love" | "loved" => Some(Self::Love),
            "sad" | "sadness" => Some(Self::Sad),
            "shock" | "shocked" => Some(Self::Shock),
            "laugh" | "laughed" => Some(Self::Laugh),
            "angry" | "angered" => Some(Self::Angry),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's reaction to one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Reaction id (used for update/delete)
    pub id: String,
    /// Post the reaction is attached to
    pub post_id: Option<String>,
    /// Reacting user
    pub user_id: String,
    /// Which reaction
    pub kind: ReactionKind,
}

impl Reaction {
    /// Create a reaction record
    pub fn new(id: &str, user_id: &str, kind: ReactionKind) -> Self {
        Self {
            id: id.to_string(),
            post_id: None,
            user_id: user_id.to_string(),
            kind,
        }
    }
}
