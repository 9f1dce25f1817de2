//! Story domain model.
//!
//! # Responsibility
//! - Define the record shown in the sidebar and edited in the editor pane.
//! - Provide edit helpers that keep `last_edited` monotonic.
//!
//! # Invariants
//! - `id` is generated once and never reassigned.
//! - Every title/content edit bumps `last_edited` strictly forward.
//! - Serialized field names are `id`, `title`, `content`, `lastEdited`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

/// Placeholder title used for freshly created stories.
pub const DEFAULT_STORY_TITLE: &str = "Untitled Story";

/// Stable identifier of a story.
pub type StoryId = Uuid;

/// Persisted unit of user content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Generated at creation, immutable afterwards.
    pub id: StoryId,
    /// Display title. Defaults to [`DEFAULT_STORY_TITLE`].
    pub title: String,
    /// Free text body.
    pub content: String,
    /// Last edit time, RFC 3339 on the wire.
    pub last_edited: DateTime<Utc>,
}

impl Story {
    /// Creates an untitled, empty story with a generated ID.
    pub fn new() -> Self {
        Self::with_title(DEFAULT_STORY_TITLE)
    }

    /// Creates an empty story with the given title.
    pub fn with_title(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title, String::new())
    }

    /// Creates a story with a caller-provided ID, stamped with the current time.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: StoryId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: content.into(),
            last_edited: Utc::now(),
        }
    }

    /// Replaces the title and bumps `last_edited`.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Replaces the content and bumps `last_edited`.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    /// Moves `last_edited` forward to now.
    ///
    /// If the clock has not advanced past the stored value (coarse clock,
    /// clock skew, or a timestamp imported from the future) the value is
    /// advanced by one microsecond instead, so the result is always strictly
    /// newer than before.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.last_edited = if now > self.last_edited {
            now
        } else {
            self.last_edited + Duration::microseconds(1)
        };
    }
}

impl Default for Story {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders stories newest-first by `last_edited`.
pub fn newest_first(a: &Story, b: &Story) -> Ordering {
    b.last_edited.cmp(&a.last_edited)
}
