//! Round grouping
//!
//! A round is every game of one season sharing an exact start time. It is
//! the unit of chronological progress and of calculated-round tracking.

use crate::processing::loader::LoadedGame;
use crate::types::{GameId, RoundId, SeasonId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Shared start time in epoch milliseconds
    pub id: RoundId,
    pub season_id: SeasonId,
    pub season_index: usize,
    pub week: u32,
    pub start_time: DateTime<Utc>,
    /// Games in load order
    pub games: Vec<LoadedGame>,
}

impl Round {
    fn open(first: LoadedGame) -> Self {
        Self {
            id: first.game.round_id(),
            season_id: first.game.season_id.clone(),
            season_index: first.season_index,
            week: first.game.week,
            start_time: first.game.start_time,
            games: vec![first],
        }
    }

    fn accepts(&self, game: &LoadedGame) -> bool {
        self.start_time == game.game.start_time && self.season_id == game.game.season_id
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.iter().map(|g| g.game.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

/// Group pre-sorted games into rounds of consecutive equal start times
pub fn group_rounds(games: Vec<LoadedGame>) -> Vec<Round> {
    let mut rounds: Vec<Round> = Vec::new();

    for game in games {
        match rounds.last_mut() {
            Some(round) if round.accepts(&game) => round.games.push(game),
            _ => rounds.push(Round::open(game)),
        }
    }

    rounds
}
