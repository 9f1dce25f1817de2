//! Story repository over a key-value store.
//!
//! # Responsibility
//! - Own the ordered story collection shown in the sidebar.
//! - Mirror the full collection to one key-value entry on every mutation.
//! - Notify subscribers after every mutation.
//!
//! # Invariants
//! - `add` puts the new story at index 0 without sorting.
//! - `update` and `load` leave the collection sorted by `last_edited` desc.
//! - Permissive operations (`load`, `persist`, `add`, `update`, `delete`)
//!   never surface errors: failures are logged and degrade to "no
//!   observable change". `try_load` / `try_persist` surface them.
//!
//! # Threading
//! - Single-threaded by construction. Mutations take `&mut self` and
//!   listeners are not `Send`; no locking is performed.

use crate::kv::{KeyValueStore, KvError};
use crate::model::story::{newest_first, Story, StoryId};
use log::{debug, error, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key used when no other key is configured.
pub const DEFAULT_STORAGE_KEY: &str = "SavedStories";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error surfaced by the strict repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Key-value backend failure.
    Storage(KvError),
    /// Collection could not be serialized.
    Encode(serde_json::Error),
    /// Persisted blob could not be deserialized.
    Decode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode stories: {err}"),
            Self::Decode(err) => write!(f, "failed to decode persisted stories: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<KvError> for RepoError {
    fn from(value: KvError) -> Self {
        Self::Storage(value)
    }
}

/// Handle returned by [`StoryRepository::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Change listener receiving the refreshed collection.
pub type StoryListener = Box<dyn FnMut(&[Story])>;

/// Owner of the canonical story collection.
pub struct StoryRepository<S: KeyValueStore> {
    store: S,
    storage_key: String,
    stories: Vec<Story>,
    listeners: Vec<(SubscriptionId, StoryListener)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> StoryRepository<S> {
    /// Creates an empty repository persisting under [`DEFAULT_STORAGE_KEY`].
    ///
    /// Nothing is read from `store` until [`load`](Self::load) is called.
    pub fn new(store: S) -> Self {
        Self::with_storage_key(store, DEFAULT_STORAGE_KEY)
    }

    /// Creates an empty repository persisting under `storage_key`.
    pub fn with_storage_key(store: S, storage_key: impl Into<String>) -> Self {
        Self {
            store,
            storage_key: storage_key.into(),
            stories: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Restores the collection from storage.
    ///
    /// Absent or undecodable data leaves the collection empty. Safe to call
    /// repeatedly; each call replaces the in-memory collection.
    pub fn load(&mut self) -> &[Story] {
        if let Err(err) = self.reload() {
            warn!(
                "event=stories_load module=repo status=fallback key={} error={}",
                self.storage_key, err
            );
            self.stories.clear();
        }
        &self.stories
    }

    /// Strict variant of [`load`](Self::load).
    ///
    /// On error the in-memory collection is left as it was.
    pub fn try_load(&mut self) -> RepoResult<&[Story]> {
        self.reload()?;
        Ok(&self.stories)
    }

    /// Inserts `story` at the head of the collection and persists.
    ///
    /// A story whose id is already present replaces the existing record,
    /// which keeps ids unique.
    pub fn add(&mut self, story: Story) -> &[Story] {
        let story_id = story.id;
        let before = self.stories.len();
        self.stories.retain(|existing| existing.id != story_id);
        if self.stories.len() != before {
            warn!("event=story_add module=repo status=replaced story_id={story_id}");
        }
        self.stories.insert(0, story);
        debug!(
            "event=story_add module=repo status=ok story_id={} count={}",
            story_id,
            self.stories.len()
        );
        self.commit()
    }

    /// Replaces the stored record with the same id, re-sorts and persists.
    ///
    /// Unknown ids are ignored. A write-back carrying an older `last_edited`
    /// than the stored record (stale copy) keeps the stored timestamp.
    pub fn update(&mut self, mut story: Story) -> &[Story] {
        let story_id = story.id;
        let Some(index) = self
            .stories
            .iter()
            .position(|existing| existing.id == story_id)
        else {
            debug!(
                "event=story_update module=repo status=skipped reason=not_found story_id={story_id}"
            );
            return &self.stories;
        };
        let stored_edit = self.stories[index].last_edited;
        if story.last_edited < stored_edit {
            debug!("event=story_update module=repo status=clamped story_id={story_id}");
            story.last_edited = stored_edit;
        }
        self.stories[index] = story;
        self.stories.sort_by(newest_first);
        debug!("event=story_update module=repo status=ok story_id={story_id}");
        self.commit()
    }

    /// Removes every record with the story's id and persists.
    ///
    /// Unknown ids leave the collection unchanged.
    pub fn delete(&mut self, story: &Story) -> &[Story] {
        self.delete_by_id(story.id)
    }

    /// Id-based form of [`delete`](Self::delete).
    pub fn delete_by_id(&mut self, story_id: StoryId) -> &[Story] {
        let before = self.stories.len();
        self.stories.retain(|existing| existing.id != story_id);
        let removed = before - self.stories.len();
        debug!("event=story_delete module=repo status=ok story_id={story_id} removed={removed}");
        self.commit()
    }

    /// Writes the whole collection to storage, swallowing failures.
    pub fn persist(&mut self) {
        if let Err(err) = self.try_persist() {
            error!(
                "event=stories_persist module=repo status=error key={} count={} error={}",
                self.storage_key,
                self.stories.len(),
                err
            );
        }
    }

    /// Strict variant of [`persist`](Self::persist).
    ///
    /// Serialization happens before any storage call, so an encode failure
    /// never reaches the store.
    pub fn try_persist(&mut self) -> RepoResult<()> {
        let encoded = serde_json::to_vec(&self.stories).map_err(RepoError::Encode)?;
        self.store.set(&self.storage_key, &encoded)?;
        Ok(())
    }

    /// Current collection, in display order.
    pub fn stories(&self) -> &[Story] {
        &self.stories
    }

    /// Looks up one story by id.
    pub fn get(&self, story_id: StoryId) -> Option<&Story> {
        self.stories.iter().find(|story| story.id == story_id)
    }

    /// Number of stories in the collection.
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    /// Whether the collection holds no stories.
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Storage key the collection is persisted under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Registers a listener called with the collection after each mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&[Story]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(current, _)| *current != id);
        self.listeners.len() != before
    }

    /// Backing store, e.g. for inspecting the persisted blob.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the repository and returns its backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn reload(&mut self) -> RepoResult<()> {
        let loaded = match self.store.get(&self.storage_key)? {
            Some(bytes) => decode_stories(&bytes)?,
            None => Vec::new(),
        };
        self.stories = loaded;
        debug!(
            "event=stories_load module=repo status=ok key={} count={}",
            self.storage_key,
            self.stories.len()
        );
        Ok(())
    }

    fn commit(&mut self) -> &[Story] {
        self.persist();
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.stories);
        }
        &self.stories
    }
}

/// Decodes a persisted blob into a newest-first, id-unique collection.
///
/// When ids repeat, the most recently edited record wins.
fn decode_stories(bytes: &[u8]) -> RepoResult<Vec<Story>> {
    let mut stories: Vec<Story> = serde_json::from_slice(bytes).map_err(RepoError::Decode)?;
    stories.sort_by(newest_first);
    let mut seen = HashSet::with_capacity(stories.len());
    stories.retain(|story| seen.insert(story.id));
    Ok(stories)
}
