//! Batched ranking persistence
//!
//! Every save writes full overwrite documents keyed by player id, split into
//! batches of at most `batch_limit` documents. Each batch commits atomically
//! but the save as a whole does not, so a failed save is retried by simply
//! saving again.

use crate::error::{EngineError, Result};
use crate::metrics::MetricsCollector;
use crate::ranking::competition::competition_ranks;
use crate::rating::state::PlayerTable;
use crate::repository::RankingWriter;
use crate::types::{PlayerId, RankingDocument};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Build ranking documents for every player in the table, best first
///
/// `snapshot_id` is the latest weekly snapshot the table state is covered by.
pub fn build_documents(
    table: &PlayerTable,
    previous: &HashMap<PlayerId, RankingDocument>,
    precision_digits: u32,
    snapshot_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
) -> Vec<RankingDocument> {
    let players: Vec<_> = table.iter().collect();
    let mus: Vec<f64> = players.iter().map(|p| p.rating.mu).collect();
    let ranks = competition_ranks(&mus, precision_digits);

    let mut documents: Vec<RankingDocument> = players
        .into_iter()
        .zip(ranks)
        .map(|(player, rank)| {
            let rating_change = previous
                .get(&player.player_id)
                .map(|doc| player.rating.mu - doc.mu)
                .unwrap_or(0.0);

            RankingDocument {
                player_id: player.player_id.clone(),
                name: player.name.clone(),
                mu: player.rating.mu,
                sigma: player.rating.sigma,
                rank,
                total_games: player.total_games,
                total_seasons: player.total_seasons,
                last_season_id: player.last_season_id.clone(),
                last_game_at: player.last_game_at,
                is_active: player.is_active,
                rating_change,
                snapshot_id,
                updated_at,
            }
        })
        .collect();

    documents.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.player_id.cmp(&b.player_id)));
    documents
}

/// Whether every player of the table already has a ranking written from
/// `snapshot_id`
///
/// False after a save that failed part way, since the uncommitted documents
/// still point at an older snapshot.
pub fn rankings_reflect(
    table: &PlayerTable,
    persisted: &HashMap<PlayerId, RankingDocument>,
    snapshot_id: Option<Uuid>,
) -> bool {
    table.iter().all(|player| {
        persisted
            .get(&player.player_id)
            .is_some_and(|doc| doc.snapshot_id == snapshot_id)
    })
}

/// Writes ranking documents through a `RankingWriter` in bounded batches
pub struct RankingPersister {
    writer: Arc<dyn RankingWriter>,
    batch_limit: usize,
    metrics: Arc<MetricsCollector>,
}

impl RankingPersister {
    pub fn new(
        writer: Arc<dyn RankingWriter>,
        batch_limit: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        if batch_limit == 0 {
            return Err(EngineError::ConfigurationError {
                message: "Batch write limit must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(Self {
            writer,
            batch_limit,
            metrics,
        })
    }

    /// Commit all documents, returning the number of batches written
    ///
    /// On failure the error reports how many batches were already committed;
    /// those are not rolled back.
    pub async fn save(&self, documents: Vec<RankingDocument>) -> Result<usize> {
        let timer = self.metrics.start_timer();
        let total = documents.len();
        let mut committed = 0;

        let mut remaining = documents.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<RankingDocument> = remaining.by_ref().take(self.batch_limit).collect();
            let size = batch.len();

            if let Err(e) = self.writer.commit_batch(batch).await {
                self.metrics.record_ranking_batch(false);
                error!(
                    "Ranking batch {} failed after {} committed batches: {}",
                    committed + 1,
                    committed,
                    e
                );
                return Err(EngineError::PersistenceFailed {
                    message: e.to_string(),
                    batches_committed: committed,
                }
                .into());
            }

            committed += 1;
            self.metrics.record_ranking_batch(true);
            debug!("Committed ranking batch {} ({} documents)", committed, size);
        }

        self.metrics.record_ranking_save(timer.stop());
        info!("Saved {} rankings in {} batches", total, committed);
        Ok(committed)
    }
}
