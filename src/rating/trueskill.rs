//! Bayesian two-team skill update
//!
//! Team strength is the sum of member mu; team uncertainty is
//! `sqrt(Σσ² + n·β²)`. A game combines both teams with the dynamics term
//! τ added once per team, then moves every participant along the truncated
//! Gaussian corrections `v` and `w`.

use crate::config::TrueSkillConfig;
use crate::error::Result;
use crate::rating::gaussian;
use crate::types::{MatchType, Rating};

/// Sum of member skill estimates
pub fn team_mu(team: &[Rating]) -> f64 {
    team.iter().map(|r| r.mu).sum()
}

/// Combined uncertainty of a team including performance variance
pub fn team_sigma(team: &[Rating], beta: f64) -> f64 {
    let variance: f64 = team.iter().map(|r| r.sigma * r.sigma).sum();
    (variance + team.len() as f64 * beta * beta).sqrt()
}

/// Total sigma of a game between two teams
pub fn total_sigma(winners: &[Rating], losers: &[Rating], config: &TrueSkillConfig) -> f64 {
    let winner_sigma = team_sigma(winners, config.beta);
    let loser_sigma = team_sigma(losers, config.beta);
    (winner_sigma * winner_sigma + loser_sigma * loser_sigma + 2.0 * config.tau * config.tau).sqrt()
}

/// Ratings after a decided game, in the same order as the inputs
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub winners: Vec<Rating>,
    pub losers: Vec<Rating>,
}

/// Rate one decided game between two teams
///
/// `multiplier` scales the mean shift only; uncertainty shrinks the same way
/// for every game and never drops below `min_sigma` (or grows past its
/// pre-update value).
pub fn rate_match(
    winners: &[Rating],
    losers: &[Rating],
    multiplier: f64,
    config: &TrueSkillConfig,
) -> MatchOutcome {
    let c = total_sigma(winners, losers, config);
    let c_squared = c * c;

    let t = (team_mu(winners) - team_mu(losers)) / c;
    let epsilon = config.draw_margin / c;
    let v = gaussian::v(t, epsilon);
    let w = gaussian::w(t, epsilon);

    let update = |rating: &Rating, direction: f64| -> Rating {
        let share = rating.sigma * rating.sigma / c_squared;
        let mu = rating.mu + direction * share * v * c * multiplier;

        let shrink = (1.0 - w * share).max(0.0).sqrt();
        let sigma = (rating.sigma * shrink)
            .max(config.min_sigma)
            .min(rating.sigma);

        Rating { mu, sigma }
    };

    MatchOutcome {
        winners: winners.iter().map(|r| update(r, 1.0)).collect(),
        losers: losers.iter().map(|r| update(r, -1.0)).collect(),
    }
}

/// Skill calculator wrapping a validated configuration
#[derive(Debug, Clone)]
pub struct TrueSkillCalculator {
    config: TrueSkillConfig,
}

impl TrueSkillCalculator {
    pub fn new(config: TrueSkillConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrueSkillConfig {
        &self.config
    }

    /// Starting estimate for players seen for the first time
    pub fn initial_rating(&self) -> Rating {
        Rating::new(self.config.initial_mu, self.config.initial_sigma)
    }

    pub fn multiplier(&self, match_type: MatchType) -> f64 {
        match match_type {
            MatchType::Regular => 1.0,
            MatchType::Playoff => self.config.playoff_multiplier,
        }
    }

    pub fn rate(
        &self,
        winners: &[Rating],
        losers: &[Rating],
        match_type: MatchType,
    ) -> MatchOutcome {
        rate_match(winners, losers, self.multiplier(match_type), &self.config)
    }

    /// Probability that team `a` beats team `b`
    pub fn win_probability(&self, a: &[Rating], b: &[Rating]) -> f64 {
        let c = total_sigma(a, b, &self.config);
        gaussian::norm_cdf((team_mu(a) - team_mu(b)) / c)
    }
}

impl Default for TrueSkillCalculator {
    fn default() -> Self {
        Self {
            config: TrueSkillConfig::default(),
        }
    }
}
