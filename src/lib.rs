//! League Ratings - skill rating engine for multi-season leagues
//!
//! This crate replays a league's completed games in chronological order
//! through a TrueSkill-style (or legacy Elo-style) rating update, keeps
//! weekly snapshots and calculated-round tracking for resumable incremental
//! runs, persists tie-aware rankings in bounded batches and computes Swiss
//! standings for in-progress seasons.

pub mod config;
pub mod error;
pub mod metrics;
pub mod processing;
pub mod ranking;
pub mod rating;
pub mod repository;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{EngineError, Result};
pub use types::*;

// Re-export key components
pub use processing::{ChronologicalProcessor, Repositories, RunRequest, RunSummary};
pub use ranking::{calculate_swiss_rankings, SwissRanking};
pub use rating::{RatingAlgorithm, RatingStrategy};
pub use repository::InMemoryStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
