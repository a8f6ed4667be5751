//! Common types used throughout the rating engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for teams
pub type TeamId = String;

/// Unique identifier for seasons
pub type SeasonId = String;

/// Unique identifier for games
pub type GameId = String;

/// Identifier of one calculation run
pub type RunId = Uuid;

/// Round identity: the shared start time of its games, in epoch milliseconds
pub type RoundId = i64;

/// Kind of scheduled game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Regular,
    Playoff,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Regular => write!(f, "regular"),
            MatchType::Playoff => write!(f, "playoff"),
        }
    }
}

/// Side of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

/// A league season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    /// Season-relative order, 0 = most recent season
    pub order: u32,
}

/// Reference to a player as listed on a roster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
}

impl PlayerRef {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Team document with its roster references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub season_id: SeasonId,
    #[serde(default)]
    pub roster: Vec<PlayerRef>,
}

/// Historical game record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub season_id: SeasonId,
    pub home_team: Option<TeamId>,
    pub away_team: Option<TeamId>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    #[serde(default)]
    pub match_type: MatchType,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub week: u32,
    /// Order index of the game's season, 0 = most recent season
    #[serde(default)]
    pub season_order: u32,
}

impl Game {
    /// Both scores are recorded
    pub fn is_complete(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    /// Winning side by score, `None` for incomplete or tied games
    pub fn winner(&self) -> Option<Side> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) if home > away => Some(Side::Home),
            (Some(home), Some(away)) if away > home => Some(Side::Away),
            _ => None,
        }
    }

    /// Home score minus away score, if complete
    pub fn point_differential(&self) -> Option<i64> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Some(home as i64 - away as i64),
            _ => None,
        }
    }

    pub fn round_id(&self) -> RoundId {
        self.start_time.timestamp_millis()
    }
}

/// Gaussian skill estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }
}

/// Durable per-player record stored inside weekly snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub name: String,
    pub rating: Rating,
    pub total_games: u32,
    pub total_seasons: u32,
    pub last_season_id: Option<SeasonId>,
    pub last_season_index: Option<usize>,
    pub last_game_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Persisted ranking document, keyed by player id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingDocument {
    pub player_id: PlayerId,
    pub name: String,
    pub mu: f64,
    pub sigma: f64,
    pub rank: u32,
    pub total_games: u32,
    pub total_seasons: u32,
    pub last_season_id: Option<SeasonId>,
    pub last_game_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Change in mu since the previously persisted ranking
    pub rating_change: f64,
    /// Latest weekly snapshot the ranking reflects
    #[serde(default)]
    pub snapshot_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only historical checkpoint at the end of a season week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    pub id: Uuid,
    pub run_id: RunId,
    pub season_id: SeasonId,
    /// Chronological index of the season, 0 = earliest known season
    pub season_index: usize,
    pub week: u32,
    /// Latest round start covered so far; never moves backwards
    pub cutoff: DateTime<Utc>,
    pub game_ids: Vec<GameId>,
    /// Rounds folded into the week, late-reported ones included
    #[serde(default)]
    pub round_ids: Vec<RoundId>,
    pub players: Vec<PlayerSnapshot>,
    /// Ratings as they stood before the week's first game
    pub start_of_week: BTreeMap<PlayerId, Rating>,
    pub created_at: DateTime<Utc>,
}

impl WeeklySnapshot {
    /// Mu change over the week for one player
    pub fn weekly_delta(&self, player_id: &str) -> Option<f64> {
        let end = self.players.iter().find(|p| p.player_id == player_id)?;
        let start = self
            .start_of_week
            .get(player_id)
            .map(|r| r.mu)
            .unwrap_or(end.rating.mu);
        Some(end.rating.mu - start)
    }
}

/// Persisted marker for a round that has been applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRoundRecord {
    pub round_id: RoundId,
    pub timestamp: DateTime<Utc>,
    pub season_id: SeasonId,
    pub run_id: RunId,
    pub game_ids: Vec<GameId>,
    pub calculated_at: DateTime<Utc>,
}

/// Progress record written to the external progress sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub step: String,
    pub percent: f64,
    pub last_completed_season: Option<SeasonId>,
    pub updated_at: DateTime<Utc>,
}

/// Trigger mode of a calculation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Full,
    Incremental,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Full => write!(f, "full"),
            RunMode::Incremental => write!(f, "incremental"),
        }
    }
}
