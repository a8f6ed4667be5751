//! Rating algorithms for chronological league replay
//!
//! This module provides the Gaussian primitives, the Bayesian skill update,
//! the Elo-style legacy path, inactivity decay and team strength, all
//! operating on the shared player table.

pub mod decay;
pub mod elo;
pub mod gaussian;
pub mod state;
pub mod strategy;
pub mod team_strength;
pub mod trueskill;

// Re-export commonly used types
pub use decay::{apply_season_transition, decayed_rating, DecaySummary};
pub use elo::EloCalculator;
pub use state::{PlayerRatingState, PlayerTable};
pub use strategy::{RatingAlgorithm, RatingStrategy, RoundGame};
pub use team_strength::{team_strength, TeamStrength};
pub use trueskill::{MatchOutcome, TrueSkillCalculator};
