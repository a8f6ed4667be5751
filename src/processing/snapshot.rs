//! Weekly snapshot accumulation and snapshot-to-live conversion
//!
//! The latest appended snapshot is the resume point of the next incremental
//! run. Rounds reported late, before that point, are folded into the resumed
//! week so the resume point only ever moves forward.

use crate::processing::rounds::Round;
use crate::rating::state::PlayerTable;
use crate::types::{GameId, PlayerId, Rating, RoundId, RunId, SeasonId, WeeklySnapshot};
use crate::utils::{current_timestamp, generate_snapshot_id};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Open season week collecting rounds until the next boundary
#[derive(Debug, Clone)]
pub struct WeekAccumulator {
    season_id: SeasonId,
    season_index: usize,
    week: u32,
    start_of_week: BTreeMap<PlayerId, Rating>,
    game_ids: Vec<GameId>,
    round_ids: Vec<RoundId>,
    cutoff: DateTime<Utc>,
}

impl WeekAccumulator {
    /// Open a week at `round`, capturing ratings before its first game
    pub fn begin(round: &Round, table: &PlayerTable) -> Self {
        Self {
            season_id: round.season_id.clone(),
            season_index: round.season_index,
            week: round.week,
            start_of_week: table.ratings(),
            game_ids: Vec::new(),
            round_ids: Vec::new(),
            cutoff: round.start_time,
        }
    }

    /// Reopen the week a persisted snapshot closed
    pub fn continue_from(snapshot: &WeeklySnapshot) -> Self {
        Self {
            season_id: snapshot.season_id.clone(),
            season_index: snapshot.season_index,
            week: snapshot.week,
            start_of_week: snapshot.start_of_week.clone(),
            game_ids: snapshot.game_ids.clone(),
            round_ids: snapshot.round_ids.clone(),
            cutoff: snapshot.cutoff,
        }
    }

    /// Same season and week as the accumulator
    pub fn belongs(&self, round: &Round) -> bool {
        self.season_id == round.season_id && self.week == round.week
    }

    /// Remember the pre-week rating of a player first seen mid-week
    pub fn note_player(&mut self, player_id: &str, rating: Rating) {
        if !self.start_of_week.contains_key(player_id) {
            self.start_of_week.insert(player_id.to_string(), rating);
        }
    }

    pub fn add_round(&mut self, round: &Round, applied: impl IntoIterator<Item = GameId>) {
        self.game_ids.extend(applied);
        self.round_ids.push(round.id);
        if round.start_time > self.cutoff {
            self.cutoff = round.start_time;
        }
    }

    /// Close the week into an append-only snapshot of every known player
    pub fn finish(self, run_id: RunId, table: &PlayerTable) -> WeeklySnapshot {
        WeeklySnapshot {
            id: generate_snapshot_id(),
            run_id,
            season_id: self.season_id,
            season_index: self.season_index,
            week: self.week,
            cutoff: self.cutoff,
            game_ids: self.game_ids,
            round_ids: self.round_ids,
            players: table.snapshot_entries(),
            start_of_week: self.start_of_week,
            created_at: current_timestamp(),
        }
    }
}

/// Where an incremental run picks up, taken from the latest snapshot
#[derive(Debug, Clone)]
pub struct ResumePoint {
    /// Games at or after this instant count toward lifetime totals
    pub cutoff: DateTime<Utc>,
    pub season_index: usize,
    pub snapshot: WeeklySnapshot,
}

impl ResumePoint {
    pub fn from_snapshot(snapshot: WeeklySnapshot) -> Self {
        Self {
            cutoff: snapshot.cutoff,
            season_index: snapshot.season_index,
            snapshot,
        }
    }

    /// Live table; durable totals and ratings carry over, per-run season sets start empty
    pub fn table(&self) -> PlayerTable {
        PlayerTable::from_snapshot(&self.snapshot)
    }

    /// Whether `round` falls in the week the snapshot closed
    pub fn continues_week(&self, round: &Round) -> bool {
        self.snapshot.season_id == round.season_id && self.snapshot.week == round.week
    }

    /// Whether `round` starts before the resume point
    pub fn is_late(&self, round: &Round) -> bool {
        round.start_time < self.cutoff
    }

    /// Whether the snapshot already holds the effect of `round`
    pub fn covers(&self, round: &Round) -> bool {
        self.snapshot.round_ids.contains(&round.id)
    }

    /// Whether the week opened at `round` should reopen the snapshot's week
    pub fn reopens_week(&self, round: &Round) -> bool {
        self.is_late(round) || self.continues_week(round)
    }
}
