//! Run requests, run summaries and cancellation

use crate::error::{EngineError, Result};
use crate::types::{Game, GameId, RunId, RunMode, SeasonId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn default_apply_decay() -> bool {
    true
}

/// What a caller asks the processor to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub mode: RunMode,
    /// Seasons in scope, empty for every season
    #[serde(default)]
    pub seasons: Vec<SeasonId>,
    /// Turn inactivity decay off for this run even if configured on
    #[serde(default = "default_apply_decay")]
    pub apply_decay: bool,
    /// Overrides the configured first season index
    #[serde(default)]
    pub start_index: Option<usize>,
    /// Games that count toward totals but not toward ratings
    #[serde(default)]
    pub rating_excluded: BTreeSet<GameId>,
}

impl RunRequest {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            seasons: Vec::new(),
            apply_decay: true,
            start_index: None,
            rating_excluded: BTreeSet::new(),
        }
    }

    pub fn full() -> Self {
        Self::new(RunMode::Full)
    }

    pub fn incremental() -> Self {
        Self::new(RunMode::Incremental)
    }

    pub fn with_seasons(mut self, seasons: Vec<SeasonId>) -> Self {
        self.seasons = seasons;
        self
    }

    pub fn without_decay(mut self) -> Self {
        self.apply_decay = false;
        self
    }

    pub fn starting_at(mut self, index: usize) -> Self {
        self.start_index = Some(index);
        self
    }

    pub fn excluding_from_rating(mut self, game_ids: impl IntoIterator<Item = GameId>) -> Self {
        self.rating_excluded.extend(game_ids);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.seasons.iter().any(|s| s.trim().is_empty()) {
            return Err(EngineError::InvalidRequest {
                reason: "Season ids cannot be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// States of the chronological processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    AwaitingRound,
    ProcessingRound,
    SnapshotPending,
    Done,
    Failed,
}

impl ProcessorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorState::AwaitingRound => "awaiting_round",
            ProcessorState::ProcessingRound => "processing_round",
            ProcessorState::SnapshotPending => "snapshot_pending",
            ProcessorState::Done => "done",
            ProcessorState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a game did not feed the rating update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A score is missing
    Incomplete,
    /// The game has no home or away team reference
    MissingTeamReference,
    /// A referenced team document does not exist
    MissingTeam,
    EmptyRoster,
    TiedScore,
    /// The same player is listed on both rosters
    SharedPlayer,
    /// Excluded by the caller; totals still count
    RatingExcluded,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Incomplete => "incomplete",
            SkipReason::MissingTeamReference => "missing_team_reference",
            SkipReason::MissingTeam => "missing_team",
            SkipReason::EmptyRoster => "empty_roster",
            SkipReason::TiedScore => "tied_score",
            SkipReason::SharedPlayer => "shared_player",
            SkipReason::RatingExcluded => "rating_excluded",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedGame {
    pub game_id: GameId,
    pub season_id: SeasonId,
    pub reason: SkipReason,
}

impl SkippedGame {
    pub fn new(game: &Game, reason: SkipReason) -> Self {
        Self {
            game_id: game.id.clone(),
            season_id: game.season_id.clone(),
            reason,
        }
    }
}

/// Structured result of a calculation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub mode: RunMode,
    pub seasons: Vec<SeasonId>,
    pub final_state: ProcessorState,
    pub rounds_processed: usize,
    /// Rounds filtered out as already calculated
    pub rounds_skipped: usize,
    pub games_processed: usize,
    pub games_skipped: Vec<SkippedGame>,
    pub snapshots_written: usize,
    pub players_ranked: usize,
    pub ranking_batches: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(run_id: RunId, mode: RunMode, seasons: Vec<SeasonId>) -> Self {
        Self {
            run_id,
            mode,
            seasons,
            final_state: ProcessorState::AwaitingRound,
            rounds_processed: 0,
            rounds_skipped: 0,
            games_processed: 0,
            games_skipped: Vec::new(),
            snapshots_written: 0,
            players_ranked: 0,
            ranking_batches: 0,
            cancelled: false,
        }
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.games_skipped
            .iter()
            .filter(|s| s.reason == reason)
            .count()
    }
}

/// Cloneable flag checked by the processor between rounds
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
