//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep CLI/front-end layers decoupled from storage details.

pub mod habit_locks;
pub mod habit_service;
pub mod stats_service;
pub mod streak_service;
