//! In-memory document store
//!
//! Implements every repository trait over a single `Dataset`, which is also
//! the on-disk JSON layout used by the command line runner.

use crate::error::{EngineError, Result};
use crate::repository::{
    GameRepository, ProgressSink, RankingReader, RankingWriter, RosterRepository, RoundStore,
};
use crate::types::{
    CalculatedRoundRecord, Game, PlayerId, PlayerRef, ProgressRecord, RankingDocument, RoundId,
    RunId, Season, SeasonId, Team, WeeklySnapshot,
};
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tracing::debug;

/// Every collection the engine reads or writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub seasons: Vec<Season>,
    pub teams: Vec<Team>,
    /// Game log in document order
    pub games: Vec<Game>,
    pub rankings: BTreeMap<PlayerId, RankingDocument>,
    /// Append-only, oldest first
    pub snapshots: Vec<WeeklySnapshot>,
    pub calculated_rounds: Vec<CalculatedRoundRecord>,
    pub progress: Option<ProgressRecord>,
}

impl Dataset {
    /// Read a dataset from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read data file {}", path.display()))?;
        let dataset = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse data file {}", path.display()))?;
        Ok(dataset)
    }

    /// Write the dataset as pretty JSON
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write data file {}", path.display()))?;
        Ok(())
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Dataset>,
    /// Season id -> run currently holding it
    locks: RwLock<HashMap<SeasonId, RunId>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Copy of the current contents
    pub fn dataset(&self) -> Result<Dataset> {
        Ok(self.read()?.clone())
    }

    pub fn insert_season(&self, season: Season) -> Result<()> {
        self.write()?.seasons.push(season);
        Ok(())
    }

    pub fn insert_team(&self, team: Team) -> Result<()> {
        self.write()?.teams.push(team);
        Ok(())
    }

    /// Append a game to the log, after every game already present
    pub fn insert_game(&self, game: Game) -> Result<()> {
        self.write()?.games.push(game);
        Ok(())
    }

    pub fn snapshots(&self) -> Result<Vec<WeeklySnapshot>> {
        Ok(self.read()?.snapshots.clone())
    }

    pub fn calculated_records(&self) -> Result<Vec<CalculatedRoundRecord>> {
        Ok(self.read()?.calculated_rounds.clone())
    }

    pub fn progress(&self) -> Result<Option<ProgressRecord>> {
        Ok(self.read()?.progress.clone())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Dataset>> {
        self.data.read().map_err(|_| {
            EngineError::InternalError {
                message: "Failed to acquire store read lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Dataset>> {
        self.data.write().map_err(|_| {
            EngineError::InternalError {
                message: "Failed to acquire store write lock".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl GameRepository for InMemoryStore {
    async fn seasons(&self) -> Result<Vec<Season>> {
        Ok(self.read()?.seasons.clone())
    }

    async fn season(&self, season_id: &str) -> Result<Option<Season>> {
        Ok(self
            .read()?
            .seasons
            .iter()
            .find(|s| s.id == season_id)
            .cloned())
    }

    async fn games(&self, season_id: &str) -> Result<Vec<Game>> {
        Ok(self
            .read()?
            .games
            .iter()
            .filter(|g| g.season_id == season_id)
            .cloned()
            .collect())
    }

    async fn teams(&self, season_id: &str) -> Result<Vec<Team>> {
        Ok(self
            .read()?
            .teams
            .iter()
            .filter(|t| t.season_id == season_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RosterRepository for InMemoryStore {
    async fn roster(&self, team_id: &str) -> Result<Option<Vec<PlayerRef>>> {
        Ok(self
            .read()?
            .teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.roster.clone()))
    }
}

#[async_trait]
impl RankingWriter for InMemoryStore {
    async fn commit_batch(&self, batch: Vec<RankingDocument>) -> Result<()> {
        let mut data = self.write()?;
        for document in batch {
            data.rankings.insert(document.player_id.clone(), document);
        }
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: WeeklySnapshot) -> Result<()> {
        debug!(
            "Appending snapshot for season {} week {}",
            snapshot.season_id, snapshot.week
        );
        self.write()?.snapshots.push(snapshot);
        Ok(())
    }
}

#[async_trait]
impl RankingReader for InMemoryStore {
    async fn current_rankings(&self) -> Result<HashMap<PlayerId, RankingDocument>> {
        Ok(self
            .read()?
            .rankings
            .iter()
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }

    async fn latest_snapshot(&self) -> Result<Option<WeeklySnapshot>> {
        Ok(self.read()?.snapshots.last().cloned())
    }
}

#[async_trait]
impl RoundStore for InMemoryStore {
    async fn calculated_rounds(&self, season_ids: &[SeasonId]) -> Result<HashSet<RoundId>> {
        Ok(self
            .read()?
            .calculated_rounds
            .iter()
            .filter(|r| season_ids.contains(&r.season_id))
            .map(|r| r.round_id)
            .collect())
    }

    async fn mark_calculated(&self, records: Vec<CalculatedRoundRecord>) -> Result<()> {
        let mut data = self.write()?;
        for record in records {
            data.calculated_rounds
                .retain(|r| !(r.round_id == record.round_id && r.season_id == record.season_id));
            data.calculated_rounds.push(record);
        }
        Ok(())
    }

    async fn reset(&self, season_ids: &[SeasonId]) -> Result<()> {
        self.write()?
            .calculated_rounds
            .retain(|r| !season_ids.contains(&r.season_id));
        Ok(())
    }

    async fn acquire_lock(&self, season_ids: &[SeasonId], run_id: RunId) -> Result<()> {
        let mut locks = self
            .locks
            .write()
            .map_err(|_| EngineError::InternalError {
                message: "Failed to acquire run lock table".to_string(),
            })?;

        if let Some(held) = season_ids
            .iter()
            .find(|id| locks.get(*id).is_some_and(|holder| *holder != run_id))
        {
            return Err(EngineError::RunInProgress {
                season_id: held.clone(),
            }
            .into());
        }

        for season_id in season_ids {
            locks.insert(season_id.clone(), run_id);
        }
        Ok(())
    }

    async fn release_lock(&self, run_id: RunId) -> Result<()> {
        let mut locks = self
            .locks
            .write()
            .map_err(|_| EngineError::InternalError {
                message: "Failed to acquire run lock table".to_string(),
            })?;
        locks.retain(|_, holder| *holder != run_id);
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for InMemoryStore {
    async fn report(&self, record: ProgressRecord) -> Result<()> {
        self.write()?.progress = Some(record);
        Ok(())
    }
}
