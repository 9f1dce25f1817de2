//! Story editing use-case service.
//!
//! # Responsibility
//! - Provide the sidebar/editor commands: create, rename, edit, save,
//!   delete and select.
//! - Derive plain-text previews for sidebar rows.
//!
//! # Invariants
//! - Edits are applied to a copy of the stored record and written back via
//!   `StoryRepository::update`, never mutated in place.
//! - Selection holds only an id; the record is always read from the
//!   repository.
//! - A blank title falls back to the placeholder title.

use crate::kv::KeyValueStore;
use crate::model::story::{Story, StoryId, DEFAULT_STORY_TITLE};
use crate::repo::story_repo::StoryRepository;
use chrono::{DateTime, Utc};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PREVIEW_MAX_CHARS: usize = 100;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for story use cases.
#[derive(Debug)]
pub enum StoryServiceError {
    /// Target story does not exist.
    StoryNotFound(StoryId),
    /// Write-back succeeded but the record could not be read back.
    InconsistentState(&'static str),
}

impl Display for StoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoryNotFound(story_id) => write!(f, "story not found: {story_id}"),
            Self::InconsistentState(details) => write!(f, "inconsistent story state: {details}"),
        }
    }
}

impl Error for StoryServiceError {}

pub type ServiceResult<T> = Result<T, StoryServiceError>;

/// Sidebar projection of one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRow {
    pub id: StoryId,
    pub title: String,
    pub last_edited: DateTime<Utc>,
    /// Plain-text content summary, `None` for empty content.
    pub preview: Option<String>,
}

/// Story service facade over a repository.
pub struct StoryService<S: KeyValueStore> {
    repo: StoryRepository<S>,
    selected: Option<StoryId>,
}

impl<S: KeyValueStore> StoryService<S> {
    /// Creates a service over `repo`, loading persisted stories.
    pub fn new(mut repo: StoryRepository<S>) -> Self {
        let count = repo.load().len();
        info!("event=story_service_init module=service status=ok count={count}");
        Self {
            repo,
            selected: None,
        }
    }

    /// Creates an untitled story at the head of the list and selects it.
    pub fn create_story(&mut self) -> Story {
        let story = Story::new();
        self.repo.add(story.clone());
        self.selected = Some(story.id);
        story
    }

    /// Replaces the title of one story.
    pub fn rename_story(&mut self, story_id: StoryId, title: &str) -> ServiceResult<Story> {
        let title = normalize_title(title);
        self.edit(story_id, |story| story.set_title(title))
    }

    /// Replaces the content of one story.
    pub fn edit_content(
        &mut self,
        story_id: StoryId,
        content: impl Into<String>,
    ) -> ServiceResult<Story> {
        let content = content.into();
        self.edit(story_id, |story| story.set_content(content))
    }

    /// Explicit save: bumps `last_edited` and writes the story back.
    pub fn save_story(&mut self, story_id: StoryId) -> ServiceResult<Story> {
        self.edit(story_id, Story::touch)
    }

    /// Deletes one story, clearing the selection when it pointed at it.
    pub fn delete_story(&mut self, story_id: StoryId) -> ServiceResult<()> {
        if self.repo.get(story_id).is_none() {
            return Err(StoryServiceError::StoryNotFound(story_id));
        }
        self.repo.delete_by_id(story_id);
        if self.selected == Some(story_id) {
            self.selected = None;
        }
        Ok(())
    }

    /// Selects a story for editing.
    pub fn select(&mut self, story_id: StoryId) -> ServiceResult<&Story> {
        let story = self
            .repo
            .get(story_id)
            .ok_or(StoryServiceError::StoryNotFound(story_id))?;
        self.selected = Some(story_id);
        Ok(story)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Currently selected story, if it still exists.
    pub fn selected(&self) -> Option<&Story> {
        self.selected.and_then(|story_id| self.repo.get(story_id))
    }

    /// Current stories in display order.
    pub fn stories(&self) -> &[Story] {
        self.repo.stories()
    }

    /// Sidebar rows in display order.
    pub fn sidebar_rows(&self) -> Vec<StoryRow> {
        self.repo
            .stories()
            .iter()
            .map(|story| StoryRow {
                id: story.id,
                title: story.title.clone(),
                last_edited: story.last_edited,
                preview: derive_preview(&story.content),
            })
            .collect()
    }

    pub fn repository(&self) -> &StoryRepository<S> {
        &self.repo
    }

    /// Mutable access, e.g. for subscribing to changes.
    pub fn repository_mut(&mut self) -> &mut StoryRepository<S> {
        &mut self.repo
    }

    fn edit(
        &mut self,
        story_id: StoryId,
        apply: impl FnOnce(&mut Story),
    ) -> ServiceResult<Story> {
        let mut story = self
            .repo
            .get(story_id)
            .cloned()
            .ok_or(StoryServiceError::StoryNotFound(story_id))?;
        apply(&mut story);
        self.repo.update(story);
        self.repo
            .get(story_id)
            .cloned()
            .ok_or(StoryServiceError::InconsistentState(
                "edited story missing after write-back",
            ))
    }
}

fn normalize_title(title: &str) -> String {
    if title.trim().is_empty() {
        DEFAULT_STORY_TITLE.to_string()
    } else {
        title.to_string()
    }
}

/// Derives a plain-text preview from story content.
///
/// Rules:
/// - images are dropped, links keep their label;
/// - markdown symbols are removed and whitespace collapsed;
/// - at most 100 chars are retained.
pub fn derive_preview(content: &str) -> Option<String> {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_MAX_CHARS).collect())
    }
}
