//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rating engine: round and
//! game throughput, skipped games by reason, snapshot and ranking writes and
//! run durations.

use crate::types::RunMode;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating engine
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Chronological replay metrics
    run_metrics: RunMetrics,

    /// Snapshot and ranking write metrics
    persistence_metrics: PersistenceMetrics,
}

/// Chronological replay metrics
#[derive(Clone)]
pub struct RunMetrics {
    /// Runs finished by mode and final state
    pub runs_total: IntCounterVec,

    /// Rounds folded into the rating table
    pub rounds_processed_total: IntCounter,

    /// Rounds skipped because they were already calculated
    pub rounds_skipped_total: IntCounter,

    /// Games applied to ratings
    pub games_processed_total: IntCounter,

    /// Games left out of the rating update, by reason
    pub games_skipped_total: IntCounterVec,

    /// Players in the rating table at the end of the last run
    pub players_tracked: IntGauge,

    /// Wall-clock run duration by mode
    pub run_duration_seconds: HistogramVec,
}

/// Snapshot and ranking write metrics
#[derive(Clone)]
pub struct PersistenceMetrics {
    /// Weekly snapshots appended
    pub snapshots_written_total: IntCounter,

    /// Ranking batches committed
    pub ranking_batches_total: IntCounter,

    /// Ranking batch commit failures
    pub ranking_batch_failures_total: IntCounter,

    /// Time spent saving the final rankings
    pub ranking_save_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let run_metrics = RunMetrics::new(&registry)?;
        let persistence_metrics = PersistenceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            run_metrics,
            persistence_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn run(&self) -> &RunMetrics {
        &self.run_metrics
    }

    pub fn persistence(&self) -> &PersistenceMetrics {
        &self.persistence_metrics
    }

    /// Record a round folded into the rating table
    pub fn record_round(&self, games_applied: usize) {
        self.run_metrics.rounds_processed_total.inc();
        self.run_metrics
            .games_processed_total
            .inc_by(games_applied as u64);
    }

    /// Record a round filtered out by the round tracker
    pub fn record_round_skipped(&self) {
        self.run_metrics.rounds_skipped_total.inc();
    }

    /// Record a game left out of the rating update
    pub fn record_game_skipped(&self, reason: &str) {
        self.run_metrics
            .games_skipped_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_snapshot_written(&self) {
        self.persistence_metrics.snapshots_written_total.inc();
    }

    /// Record the outcome of one ranking batch commit
    pub fn record_ranking_batch(&self, success: bool) {
        if success {
            self.persistence_metrics.ranking_batches_total.inc();
        } else {
            self.persistence_metrics.ranking_batch_failures_total.inc();
        }
    }

    pub fn record_ranking_save(&self, duration: Duration) {
        self.persistence_metrics
            .ranking_save_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a finished run
    pub fn record_run(&self, mode: RunMode, final_state: &str, players: usize, duration: Duration) {
        let mode_str = mode.to_string();

        self.run_metrics
            .runs_total
            .with_label_values(&[mode_str.as_str(), final_state])
            .inc();

        self.run_metrics.players_tracked.set(players as i64);

        self.run_metrics
            .run_duration_seconds
            .with_label_values(&[mode_str.as_str()])
            .observe(duration.as_secs_f64());
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RunMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let runs_total = IntCounterVec::new(
            Opts::new("league_ratings_runs_total", "Calculation runs finished"),
            &["mode", "state"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let rounds_processed_total = IntCounter::new(
            "league_ratings_rounds_processed_total",
            "Rounds folded into the rating table",
        )?;
        registry.register(Box::new(rounds_processed_total.clone()))?;

        let rounds_skipped_total = IntCounter::new(
            "league_ratings_rounds_skipped_total",
            "Rounds skipped as already calculated",
        )?;
        registry.register(Box::new(rounds_skipped_total.clone()))?;

        let games_processed_total = IntCounter::new(
            "league_ratings_games_processed_total",
            "Games applied to ratings",
        )?;
        registry.register(Box::new(games_processed_total.clone()))?;

        let games_skipped_total = IntCounterVec::new(
            Opts::new(
                "league_ratings_games_skipped_total",
                "Games left out of the rating update",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(games_skipped_total.clone()))?;

        let players_tracked = IntGauge::new(
            "league_ratings_players_tracked",
            "Players in the rating table after the last run",
        )?;
        registry.register(Box::new(players_tracked.clone()))?;

        let run_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "league_ratings_run_duration_seconds",
                "Calculation run duration",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["mode"],
        )?;
        registry.register(Box::new(run_duration_seconds.clone()))?;

        Ok(Self {
            runs_total,
            rounds_processed_total,
            rounds_skipped_total,
            games_processed_total,
            games_skipped_total,
            players_tracked,
            run_duration_seconds,
        })
    }
}

impl PersistenceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let snapshots_written_total = IntCounter::new(
            "league_ratings_snapshots_written_total",
            "Weekly snapshots appended",
        )?;
        registry.register(Box::new(snapshots_written_total.clone()))?;

        let ranking_batches_total = IntCounter::new(
            "league_ratings_ranking_batches_total",
            "Ranking batches committed",
        )?;
        registry.register(Box::new(ranking_batches_total.clone()))?;

        let ranking_batch_failures_total = IntCounter::new(
            "league_ratings_ranking_batch_failures_total",
            "Ranking batch commit failures",
        )?;
        registry.register(Box::new(ranking_batch_failures_total.clone()))?;

        let ranking_save_duration = Histogram::with_opts(
            HistogramOpts::new(
                "league_ratings_ranking_save_duration_seconds",
                "Final ranking save time",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(ranking_save_duration.clone()))?;

        Ok(Self {
            snapshots_written_total,
            ranking_batches_total,
            ranking_batch_failures_total,
            ranking_save_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
