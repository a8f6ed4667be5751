//! Injected collaborators of the rating engine
//!
//! The processor never talks to a database directly. Everything it reads or
//! writes goes through these traits, so the algorithms can be exercised
//! against the in-memory store or a mock.

pub mod memory;

pub use memory::{Dataset, InMemoryStore};

use crate::error::Result;
use crate::types::{
    CalculatedRoundRecord, Game, PlayerId, PlayerRef, ProgressRecord, RankingDocument, RoundId,
    RunId, Season, SeasonId, Team, WeeklySnapshot,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

#[cfg(test)]
use mockall::automock;

/// Read access to seasons, teams and the game log
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// All known seasons, in any order
    async fn seasons(&self) -> Result<Vec<Season>>;

    /// A single season document
    async fn season(&self, season_id: &str) -> Result<Option<Season>>;

    /// Games of one season in document order
    async fn games(&self, season_id: &str) -> Result<Vec<Game>>;

    /// Teams registered for one season
    async fn teams(&self, season_id: &str) -> Result<Vec<Team>>;
}

/// Roster lookups by team
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// Player references of a team, `None` when the team document is missing
    async fn roster(&self, team_id: &str) -> Result<Option<Vec<PlayerRef>>>;
}

/// Writes of ranking documents and weekly snapshots
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RankingWriter: Send + Sync {
    /// Overwrite a batch of ranking documents keyed by player id, atomically
    async fn commit_batch(&self, batch: Vec<RankingDocument>) -> Result<()>;

    /// Append a weekly snapshot
    async fn append_snapshot(&self, snapshot: WeeklySnapshot) -> Result<()>;
}

/// Reads of previously persisted output
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RankingReader: Send + Sync {
    async fn current_rankings(&self) -> Result<HashMap<PlayerId, RankingDocument>>;

    /// Most recently appended weekly snapshot
    async fn latest_snapshot(&self) -> Result<Option<WeeklySnapshot>>;
}

/// Calculated-round tracking and the per-season run lock
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Identifiers of rounds already calculated within the given seasons
    async fn calculated_rounds(&self, season_ids: &[SeasonId]) -> Result<HashSet<RoundId>>;

    async fn mark_calculated(&self, records: Vec<CalculatedRoundRecord>) -> Result<()>;

    /// Drop tracking records of the given seasons
    async fn reset(&self, season_ids: &[SeasonId]) -> Result<()>;

    /// Claim the seasons for one run, failing with `RunInProgress` if any is held
    async fn acquire_lock(&self, season_ids: &[SeasonId], run_id: RunId) -> Result<()>;

    async fn release_lock(&self, run_id: RunId) -> Result<()>;
}

/// Best-effort progress reporting
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, record: ProgressRecord) -> Result<()>;
}
