//! Live per-player rating state for one calculation run
//!
//! The processor owns a single `PlayerTable` for the duration of a run and
//! passes it by reference through the round loop. Entries are created the
//! first time a player shows up on a roster.

use crate::types::{PlayerId, PlayerRef, PlayerSnapshot, Rating, SeasonId, WeeklySnapshot};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// In-memory rating state of one player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRatingState {
    pub player_id: PlayerId,
    pub name: String,
    pub rating: Rating,
    pub total_games: u32,
    pub total_seasons: u32,
    /// Seasons seen during this run, never persisted
    pub seasons_played: BTreeSet<SeasonId>,
    pub last_season_id: Option<SeasonId>,
    pub last_season_index: Option<usize>,
    pub last_game_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl PlayerRatingState {
    /// Create state for a player seen for the first time
    pub fn new(player: &PlayerRef, initial_rating: Rating) -> Self {
        Self {
            player_id: player.id.clone(),
            name: player.name.clone(),
            rating: initial_rating,
            total_games: 0,
            total_seasons: 0,
            seasons_played: BTreeSet::new(),
            last_season_id: None,
            last_season_index: None,
            last_game_at: None,
            is_active: true,
        }
    }

    /// Whether the player has ever taken part in a processed game
    pub fn is_rated(&self) -> bool {
        self.last_game_at.is_some()
    }

    /// Record participation in a processed game
    ///
    /// Lifetime totals only move when `count_totals` is set. A season is
    /// counted once, on the first counted game in it. Recency and activity
    /// only move forward, so a late-reported game cannot rewind them.
    pub fn record_game(
        &mut self,
        season_id: &SeasonId,
        season_index: usize,
        played_at: DateTime<Utc>,
        count_totals: bool,
    ) {
        if count_totals {
            self.total_games += 1;
            let new_season = !self.seasons_played.contains(season_id)
                && self.last_season_id.as_ref() != Some(season_id);
            if new_season {
                self.total_seasons += 1;
            }
        }

        self.seasons_played.insert(season_id.clone());
        if self.last_game_at.map_or(true, |last| played_at >= last) {
            self.last_season_id = Some(season_id.clone());
            self.last_season_index = Some(season_index);
            self.last_game_at = Some(played_at);
            self.is_active = true;
        }
    }

    pub fn to_snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: self.player_id.clone(),
            name: self.name.clone(),
            rating: self.rating,
            total_games: self.total_games,
            total_seasons: self.total_seasons,
            last_season_id: self.last_season_id.clone(),
            last_season_index: self.last_season_index,
            last_game_at: self.last_game_at,
            is_active: self.is_active,
        }
    }
}

impl From<&PlayerSnapshot> for PlayerRatingState {
    /// Durable totals and the last rating carry over; the per-run season set starts empty
    fn from(snapshot: &PlayerSnapshot) -> Self {
        Self {
            player_id: snapshot.player_id.clone(),
            name: snapshot.name.clone(),
            rating: snapshot.rating,
            total_games: snapshot.total_games,
            total_seasons: snapshot.total_seasons,
            seasons_played: BTreeSet::new(),
            last_season_id: snapshot.last_season_id.clone(),
            last_season_index: snapshot.last_season_index,
            last_game_at: snapshot.last_game_at,
            is_active: snapshot.is_active,
        }
    }
}

/// Arena of player states keyed by player id
#[derive(Debug, Clone, Default)]
pub struct PlayerTable {
    players: BTreeMap<PlayerId, PlayerRatingState>,
}

impl PlayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild live state from a persisted weekly snapshot
    pub fn from_snapshot(snapshot: &WeeklySnapshot) -> Self {
        let players = snapshot
            .players
            .iter()
            .map(|p| (p.player_id.clone(), PlayerRatingState::from(p)))
            .collect();
        Self { players }
    }

    /// Get the state for a player, creating it on first appearance
    pub fn ensure(&mut self, player: &PlayerRef, initial_rating: Rating) -> &mut PlayerRatingState {
        let state = self
            .players
            .entry(player.id.clone())
            .or_insert_with(|| PlayerRatingState::new(player, initial_rating));
        if !player.name.is_empty() && state.name != player.name {
            state.name = player.name.clone();
        }
        state
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerRatingState> {
        self.players.get(player_id)
    }

    pub fn get_mut(&mut self, player_id: &str) -> Option<&mut PlayerRatingState> {
        self.players.get_mut(player_id)
    }

    pub fn rating(&self, player_id: &str) -> Option<Rating> {
        self.players.get(player_id).map(|p| p.rating)
    }

    /// Overwrite a known player's rating; unknown ids are ignored
    pub fn set_rating(&mut self, player_id: &str, rating: Rating) -> bool {
        match self.players.get_mut(player_id) {
            Some(state) => {
                state.rating = rating;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRatingState> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PlayerRatingState> {
        self.players.values_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Current ratings of every known player
    pub fn ratings(&self) -> BTreeMap<PlayerId, Rating> {
        self.players
            .iter()
            .map(|(id, state)| (id.clone(), state.rating))
            .collect()
    }

    pub fn snapshot_entries(&self) -> Vec<PlayerSnapshot> {
        self.players.values().map(|p| p.to_snapshot()).collect()
    }
}
