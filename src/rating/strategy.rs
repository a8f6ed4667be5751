//! Selectable rating strategy
//!
//! Only one algorithm is live during a run, but both stay independently
//! usable. Each exposes a single `apply_round` capability over the shared
//! player table.

use crate::config::{RatingAlgorithmKind, RatingSettings};
use crate::error::{EngineError, Result};
use crate::rating::elo::{self, EloCalculator};
use crate::rating::state::PlayerTable;
use crate::rating::team_strength::team_strength;
use crate::rating::trueskill::TrueSkillCalculator;
use crate::types::{GameId, MatchType, PlayerId, Rating, Side};

/// A decided game with resolved rosters, ready to be rated
#[derive(Debug, Clone, PartialEq)]
pub struct RoundGame {
    pub game_id: GameId,
    pub home: Vec<PlayerId>,
    pub away: Vec<PlayerId>,
    pub winner: Side,
    /// Home score minus away score
    pub point_differential: i64,
    pub match_type: MatchType,
    pub season_order: u32,
}

impl RoundGame {
    pub fn winners(&self) -> &[PlayerId] {
        match self.winner {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn losers(&self) -> &[PlayerId] {
        match self.winner {
            Side::Home => &self.away,
            Side::Away => &self.home,
        }
    }
}

/// Trait for folding one round of games into the player table
pub trait RatingAlgorithm: Send + Sync {
    /// Short name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Rating given to players on first appearance
    fn initial_rating(&self) -> Rating;

    /// Apply every game of a round, in the given order
    fn apply_round(&self, table: &mut PlayerTable, games: &[RoundGame]) -> Result<()>;
}

fn collect_ratings(
    table: &PlayerTable,
    game_id: &str,
    players: &[PlayerId],
) -> Result<Vec<Rating>> {
    players
        .iter()
        .map(|id| {
            table.rating(id).ok_or_else(|| {
                EngineError::InternalError {
                    message: format!("Player {} of game {} missing from rating table", id, game_id),
                }
                .into()
            })
        })
        .collect()
}

impl RatingAlgorithm for TrueSkillCalculator {
    fn name(&self) -> &'static str {
        "trueskill"
    }

    fn initial_rating(&self) -> Rating {
        TrueSkillCalculator::initial_rating(self)
    }

    fn apply_round(&self, table: &mut PlayerTable, games: &[RoundGame]) -> Result<()> {
        for game in games {
            let winners = collect_ratings(table, &game.game_id, game.winners())?;
            let losers = collect_ratings(table, &game.game_id, game.losers())?;

            let outcome = self.rate(&winners, &losers, game.match_type);

            for (id, rating) in game.winners().iter().zip(outcome.winners) {
                table.set_rating(id, rating);
            }
            for (id, rating) in game.losers().iter().zip(outcome.losers) {
                table.set_rating(id, rating);
            }
        }
        Ok(())
    }
}

impl RatingAlgorithm for EloCalculator {
    fn name(&self) -> &'static str {
        "elo"
    }

    fn initial_rating(&self) -> Rating {
        EloCalculator::initial_rating(self)
    }

    fn apply_round(&self, table: &mut PlayerTable, games: &[RoundGame]) -> Result<()> {
        let default_rating = self.config().initial_rating;

        for game in games {
            let home = team_strength(&game.home, table, default_rating);
            let away = team_strength(&game.away, table, default_rating);

            let delta = elo::rating_delta(
                home.rating,
                away.rating,
                game.point_differential,
                game.season_order,
                game.match_type,
                self.config(),
            );

            for (roster, direction) in [(&game.home, 1.0), (&game.away, -1.0)] {
                for id in roster {
                    let mut rating = table.rating(id).ok_or_else(|| EngineError::InternalError {
                        message: format!(
                            "Player {} of game {} missing from rating table",
                            id, game.game_id
                        ),
                    })?;
                    rating.mu += direction * delta;
                    table.set_rating(id, rating);
                }
            }
        }
        Ok(())
    }
}

/// The live rating algorithm of a run
#[derive(Debug, Clone)]
pub enum RatingStrategy {
    TrueSkill(TrueSkillCalculator),
    Elo(EloCalculator),
}

impl RatingStrategy {
    /// Build the configured strategy
    pub fn from_settings(settings: &RatingSettings) -> Result<Self> {
        match settings.algorithm {
            RatingAlgorithmKind::TrueSkill => Ok(RatingStrategy::TrueSkill(
                TrueSkillCalculator::new(settings.trueskill.clone())?,
            )),
            RatingAlgorithmKind::Elo => Ok(RatingStrategy::Elo(EloCalculator::new(
                settings.elo.clone(),
                settings.trueskill.initial_sigma,
            )?)),
        }
    }

    fn algorithm(&self) -> &dyn RatingAlgorithm {
        match self {
            RatingStrategy::TrueSkill(calculator) => calculator,
            RatingStrategy::Elo(calculator) => calculator,
        }
    }
}

impl Default for RatingStrategy {
    fn default() -> Self {
        RatingStrategy::TrueSkill(TrueSkillCalculator::default())
    }
}

impl RatingAlgorithm for RatingStrategy {
    fn name(&self) -> &'static str {
        self.algorithm().name()
    }

    fn initial_rating(&self) -> Rating {
        self.algorithm().initial_rating()
    }

    fn apply_round(&self, table: &mut PlayerTable, games: &[RoundGame]) -> Result<()> {
        self.algorithm().apply_round(table, games)
    }
}
