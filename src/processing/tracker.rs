//! Calculated-round tracking for idempotent incremental runs
//!
//! Rounds are recorded as pending while their week is open and only written
//! to the round store once the snapshot covering them has been persisted.
//! A round dropped by cancellation or failure is therefore never marked.

use crate::error::Result;
use crate::processing::rounds::Round;
use crate::repository::RoundStore;
use crate::types::{CalculatedRoundRecord, RoundId, RunId, RunMode, SeasonId};
use crate::utils::current_timestamp;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug)]
pub struct RoundTracker {
    run_id: RunId,
    mode: RunMode,
    calculated: HashSet<RoundId>,
    pending: Vec<CalculatedRoundRecord>,
}

impl RoundTracker {
    pub fn new(run_id: RunId, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            calculated: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Prepare tracking for a run over `seasons`
    ///
    /// A full run drops the existing records of its seasons. An incremental
    /// run loads them so already calculated rounds can be filtered out.
    pub async fn prepare(&mut self, store: &dyn RoundStore, seasons: &[SeasonId]) -> Result<()> {
        self.calculated = match self.mode {
            RunMode::Full => {
                store.reset(seasons).await?;
                info!("Reset round tracking for {} seasons", seasons.len());
                HashSet::new()
            }
            RunMode::Incremental => {
                let calculated = store.calculated_rounds(seasons).await?;
                info!("{} rounds already calculated", calculated.len());
                calculated
            }
        };
        Ok(())
    }

    /// Forget loaded records so every round is replayed
    pub fn replay_all(&mut self) {
        self.calculated.clear();
    }

    pub fn should_process(&self, round: &Round) -> bool {
        match self.mode {
            RunMode::Full => true,
            RunMode::Incremental => !self.calculated.contains(&round.id),
        }
    }

    /// Record a round whose in-memory update has completed
    pub fn record(&mut self, round: &Round) {
        self.calculated.insert(round.id);
        self.pending.push(CalculatedRoundRecord {
            round_id: round.id,
            timestamp: round.start_time,
            season_id: round.season_id.clone(),
            run_id: self.run_id,
            game_ids: round.game_ids(),
            calculated_at: current_timestamp(),
        });
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Persist pending records; call only after the covering snapshot is written
    pub async fn flush(&mut self, store: &dyn RoundStore) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let records = std::mem::take(&mut self.pending);
        let count = records.len();
        store.mark_calculated(records).await?;
        debug!("Marked {} rounds calculated", count);
        Ok(count)
    }
}
