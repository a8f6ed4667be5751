//! Chronological game loading across seasons

use crate::error::{EngineError, Result};
use crate::repository::GameRepository;
use crate::types::{Game, GameId, Season, SeasonId};
use std::collections::HashSet;
use tracing::debug;

/// Seasons ordered earliest first
///
/// The position of a season in this list is its chronological index, used
/// for decay and for the configurable starting point of a run.
#[derive(Debug, Clone, Default)]
pub struct SeasonTimeline {
    seasons: Vec<Season>,
}

impl SeasonTimeline {
    pub fn new(mut seasons: Vec<Season>) -> Self {
        // order 0 is the most recent season
        seasons.sort_by(|a, b| b.order.cmp(&a.order).then_with(|| a.id.cmp(&b.id)));
        Self { seasons }
    }

    /// Seasons a run covers: everything from `start_index` on, narrowed to
    /// `requested` when it is non-empty
    pub fn scope(&self, requested: &[SeasonId], start_index: usize) -> Vec<(usize, Season)> {
        self.seasons
            .iter()
            .enumerate()
            .skip(start_index)
            .filter(|(_, s)| requested.is_empty() || requested.contains(&s.id))
            .map(|(index, s)| (index, s.clone()))
            .collect()
    }
}

/// A completed game tagged with its season's chronological index
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedGame {
    pub game: Game,
    pub season_index: usize,
}

/// Games ready for replay plus the ones the completeness filter dropped
#[derive(Debug, Clone, Default)]
pub struct LoadedGames {
    pub games: Vec<LoadedGame>,
    pub incomplete: Vec<Game>,
}

/// Check that every explicitly requested season exists
pub async fn verify_seasons(repo: &dyn GameRepository, requested: &[SeasonId]) -> Result<()> {
    for season_id in requested {
        if repo.season(season_id).await?.is_none() {
            return Err(EngineError::SeasonNotFound {
                season_id: season_id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Load the games of the scoped seasons in replay order
///
/// Seasons are read earliest first and the result is stably sorted by start
/// time, so games sharing a timestamp keep season order, then document order.
pub async fn load_games(
    repo: &dyn GameRepository,
    scope: &[(usize, Season)],
) -> Result<LoadedGames> {
    let mut loaded = LoadedGames::default();
    let mut seen: HashSet<GameId> = HashSet::new();

    for (season_index, season) in scope {
        let games = repo.games(&season.id).await?;
        debug!("Loaded {} games for season {}", games.len(), season.id);

        for game in games {
            if !seen.insert(game.id.clone()) {
                continue;
            }
            if game.is_complete() {
                loaded.games.push(LoadedGame {
                    game,
                    season_index: *season_index,
                });
            } else {
                loaded.incomplete.push(game);
            }
        }
    }

    loaded.games.sort_by_key(|g| g.game.start_time);
    Ok(loaded)
}
