//! Repository layer owning the canonical story collection.
//!
//! # Responsibility
//! - Keep the in-memory collection and its persisted mirror consistent.
//! - Isolate serialization and storage details from service orchestration.
//!
//! # Invariants
//! - Every mutating call persists the whole collection before returning.
//! - Story ids are unique within the collection.

pub mod story_repo;
