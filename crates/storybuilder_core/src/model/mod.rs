//! Domain model for the story list.
//!
//! # Responsibility
//! - Define the canonical story record persisted by the repository.
//!
//! # Invariants
//! - Every story is identified by a stable `StoryId`.
//! - `last_edited` never moves backwards for a given story.

pub mod story;
