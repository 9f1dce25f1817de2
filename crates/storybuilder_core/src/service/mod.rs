//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into editor/sidebar use cases.
//! - Keep UI layers decoupled from storage details.

pub mod story_service;
