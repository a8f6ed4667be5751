//! Legacy expected-score rating path
//!
//! Kept for comparison runs. Every function here is pure: the strategy layer
//! reads team strengths from the player table and writes the returned
//! delta back to each roster member.

use crate::config::EloConfig;
use crate::error::Result;
use crate::types::{MatchType, Rating};
use skillratings::elo::{expected_score as elo_expected_score, EloRating};

/// Logistic expected score of side A against side B
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    let (expected_a, _) =
        elo_expected_score(&EloRating { rating: rating_a }, &EloRating { rating: rating_b });
    expected_a
}

/// Compress blowout margins logarithmically beyond `threshold`
pub fn compress_differential(differential: f64, threshold: f64) -> f64 {
    let magnitude = differential.abs();
    if magnitude <= threshold {
        return differential;
    }
    let compressed = threshold + (1.0 + magnitude - threshold).ln();
    compressed.copysign(differential)
}

/// Actual score of the home side derived from the point differential
pub fn actual_score(point_differential: i64, config: &EloConfig) -> f64 {
    let compressed = compress_differential(point_differential as f64, config.blowout_threshold);
    (0.5 + compressed / config.score_denominator).clamp(0.0, 1.0)
}

/// Weight of a game by the age of its season, 0 = most recent
pub fn season_weight(season_order: u32, config: &EloConfig) -> f64 {
    config.season_decay.powi(season_order as i32)
}

pub fn playoff_multiplier(match_type: MatchType, config: &EloConfig) -> f64 {
    match match_type {
        MatchType::Regular => 1.0,
        MatchType::Playoff => config.playoff_multiplier,
    }
}

/// Rating change for the home side; the away side moves by the negation
pub fn rating_delta(
    home_rating: f64,
    away_rating: f64,
    point_differential: i64,
    season_order: u32,
    match_type: MatchType,
    config: &EloConfig,
) -> f64 {
    let expected = expected_score(home_rating, away_rating);
    let actual = actual_score(point_differential, config);

    config.k_factor
        * season_weight(season_order, config)
        * playoff_multiplier(match_type, config)
        * (actual - expected)
}

/// Legacy calculator wrapping a validated configuration
#[derive(Debug, Clone)]
pub struct EloCalculator {
    config: EloConfig,
    /// Sigma carried unchanged on every rating this path produces
    sigma: f64,
}

impl EloCalculator {
    pub fn new(config: EloConfig, sigma: f64) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, sigma })
    }

    pub fn config(&self) -> &EloConfig {
        &self.config
    }

    pub fn initial_rating(&self) -> Rating {
        Rating::new(self.config.initial_rating, self.sigma)
    }
}
