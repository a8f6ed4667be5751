//! Rating system configuration

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Which rating algorithm drives a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RatingAlgorithmKind {
    #[default]
    TrueSkill,
    Elo,
}

impl std::str::FromStr for RatingAlgorithmKind {
    type Err = EngineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trueskill" => Ok(RatingAlgorithmKind::TrueSkill),
            "elo" => Ok(RatingAlgorithmKind::Elo),
            other => Err(EngineError::ConfigurationError {
                message: format!("Unknown rating algorithm: {}", other),
            }),
        }
    }
}

/// Parameters of the Bayesian skill update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueSkillConfig {
    pub initial_mu: f64,
    pub initial_sigma: f64,
    /// Per-player performance variance
    pub beta: f64,
    /// Dynamics term added once per team to the total variance
    pub tau: f64,
    /// Draw margin in skill units, divided by the total sigma of a game
    pub draw_margin: f64,
    pub min_sigma: f64,
    pub playoff_multiplier: f64,
}

impl Default for TrueSkillConfig {
    fn default() -> Self {
        let initial_mu = 25.0;
        let initial_sigma = initial_mu / 3.0;
        Self {
            initial_mu,
            initial_sigma,
            beta: initial_sigma / 2.0,
            tau: initial_sigma / 100.0,
            draw_margin: 0.1,
            min_sigma: 0.5,
            playoff_multiplier: 2.0,
        }
    }
}

impl TrueSkillConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.initial_sigma <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Initial sigma must be positive".to_string(),
            }
            .into());
        }
        if self.beta <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Beta must be positive".to_string(),
            }
            .into());
        }
        if self.tau < 0.0 || self.draw_margin < 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Tau and draw margin must be non-negative".to_string(),
            }
            .into());
        }
        if self.min_sigma <= 0.0 || self.min_sigma > self.initial_sigma {
            return Err(EngineError::ConfigurationError {
                message: "Minimum sigma must be positive and not above the initial sigma"
                    .to_string(),
            }
            .into());
        }
        if self.playoff_multiplier <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Playoff multiplier must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Parameters of the legacy expected-score path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloConfig {
    pub initial_rating: f64,
    pub k_factor: f64,
    /// Point differential that maps to a full win (actual score 1.0) is half of this
    pub score_denominator: f64,
    /// Differentials beyond this are compressed logarithmically
    pub blowout_threshold: f64,
    /// Weight multiplier per season of age, applied as `season_decay^season_order`
    pub season_decay: f64,
    pub playoff_multiplier: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            initial_rating: 1500.0,
            k_factor: 32.0,
            score_denominator: 30.0,
            blowout_threshold: 10.0,
            season_decay: 0.85,
            playoff_multiplier: 1.5,
        }
    }
}

impl EloConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.k_factor <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }
        if self.score_denominator <= 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Score denominator must be positive".to_string(),
            }
            .into());
        }
        if self.blowout_threshold < 0.0 {
            return Err(EngineError::ConfigurationError {
                message: "Blowout threshold must be non-negative".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.season_decay) {
            return Err(EngineError::ConfigurationError {
                message: "Season decay must be within [0, 1]".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Inactivity decay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    pub enabled: bool,
    /// Fraction of the distance from the starting value kept per skipped season
    pub factor: f64,
    /// Players who skipped more than this many seasons are marked inactive
    pub inactive_after_seasons: u32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: 0.9,
            inactive_after_seasons: 2,
        }
    }
}

impl DecayConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.factor) {
            return Err(EngineError::ConfigurationError {
                message: "Decay factor must be within [0, 1]".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Rating section of the application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RatingSettings {
    pub algorithm: RatingAlgorithmKind,
    pub trueskill: TrueSkillConfig,
    pub elo: EloConfig,
    pub decay: DecayConfig,
}

impl RatingSettings {
    pub fn validate(&self) -> Result<()> {
        self.trueskill.validate()?;
        self.elo.validate()?;
        self.decay.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trueskill_defaults() {
        let config = TrueSkillConfig::default();
        assert_eq!(config.initial_mu, 25.0);
        assert!((config.initial_sigma - 25.0 / 3.0).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_trueskill_validation() {
        let mut config = TrueSkillConfig::default();
        config.beta = 0.0;
        assert!(config.validate().is_err());

        config = TrueSkillConfig::default();
        config.min_sigma = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_elo_validation() {
        let mut config = EloConfig::default();
        assert!(config.validate().is_ok());

        config.season_decay = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!(
            "TrueSkill".parse::<RatingAlgorithmKind>().unwrap(),
            RatingAlgorithmKind::TrueSkill
        );
        assert_eq!(
            "elo".parse::<RatingAlgorithmKind>().unwrap(),
            RatingAlgorithmKind::Elo
        );
        assert!("glicko".parse::<RatingAlgorithmKind>().is_err());
    }
}
