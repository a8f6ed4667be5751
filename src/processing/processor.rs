//! Chronological processor
//!
//! Replays rounds strictly in start-time order through the live rating
//! strategy. The processor owns the player table for the whole run, flushes a
//! weekly snapshot at every season or week boundary and marks rounds
//! calculated only once the snapshot covering them has been written.
//!
//! States move `AwaitingRound -> ProcessingRound -> SnapshotPending ->
//! AwaitingRound` until the rounds run out (`Done`) or a fatal error occurs
//! (`Failed`).

use crate::config::{AppConfig, DecayConfig, ProcessingSettings};
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::processing::loader::{self, LoadedGame, SeasonTimeline};
use crate::processing::request::{
    CancellationHandle, ProcessorState, RunRequest, RunSummary, SkipReason, SkippedGame,
};
use crate::processing::rounds::{group_rounds, Round};
use crate::processing::snapshot::{ResumePoint, WeekAccumulator};
use crate::processing::tracker::RoundTracker;
use crate::ranking::persistence::{build_documents, rankings_reflect, RankingPersister};
use crate::rating::decay::apply_season_transition;
use crate::rating::state::PlayerTable;
use crate::rating::strategy::{RatingAlgorithm, RatingStrategy, RoundGame};
use crate::repository::{
    GameRepository, ProgressSink, RankingReader, RankingWriter, RosterRepository, RoundStore,
};
use crate::types::{
    Game, GameId, PlayerRef, ProgressRecord, RunId, RunMode, Season, SeasonId, Side,
};
use crate::utils::{current_timestamp, generate_run_id};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Collaborators injected into the processor
#[derive(Clone)]
pub struct Repositories {
    pub games: Arc<dyn GameRepository>,
    pub rosters: Arc<dyn RosterRepository>,
    pub writer: Arc<dyn RankingWriter>,
    pub reader: Arc<dyn RankingReader>,
    pub rounds: Arc<dyn RoundStore>,
    pub progress: Arc<dyn ProgressSink>,
}

impl Repositories {
    /// Use one store for every collaborator
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: GameRepository
            + RosterRepository
            + RankingWriter
            + RankingReader
            + RoundStore
            + ProgressSink
            + 'static,
    {
        Self {
            games: store.clone(),
            rosters: store.clone(),
            writer: store.clone(),
            reader: store.clone(),
            rounds: store.clone(),
            progress: store,
        }
    }
}

/// Rosters resolved for a decided game
struct ResolvedGame {
    home: Vec<PlayerRef>,
    away: Vec<PlayerRef>,
    winner: Side,
    point_differential: i64,
}

enum Resolution {
    Ready(ResolvedGame),
    Skipped(SkipReason),
}

/// Mutable state of one run
struct RunContext {
    run_id: RunId,
    state: ProcessorState,
    summary: RunSummary,
    table: PlayerTable,
    tracker: RoundTracker,
    week: Option<WeekAccumulator>,
    /// Resume point of an incremental run, until the first week is opened
    resume: Option<ResumePoint>,
    /// Games before this instant do not count toward lifetime totals
    totals_from: Option<DateTime<Utc>>,
    /// Latest snapshot the table state is covered by
    ranked_snapshot: Option<Uuid>,
    season_index: Option<usize>,
    current_season: Option<SeasonId>,
    last_completed_season: Option<SeasonId>,
    decay: DecayConfig,
    rating_excluded: BTreeSet<GameId>,
    games_seen: u64,
    games_total: u64,
    next_progress_at: u64,
}

impl RunContext {
    fn new(
        run_id: RunId,
        request: &RunRequest,
        season_ids: Vec<SeasonId>,
        decay: DecayConfig,
        progress_interval: u64,
    ) -> Self {
        Self {
            run_id,
            state: ProcessorState::AwaitingRound,
            summary: RunSummary::new(run_id, request.mode, season_ids),
            table: PlayerTable::new(),
            tracker: RoundTracker::new(run_id, request.mode),
            week: None,
            resume: None,
            totals_from: None,
            ranked_snapshot: None,
            season_index: None,
            current_season: None,
            last_completed_season: None,
            decay,
            rating_excluded: request.rating_excluded.clone(),
            games_seen: 0,
            games_total: 0,
            next_progress_at: progress_interval,
        }
    }

    fn transition(&mut self, next: ProcessorState) {
        if self.state != next {
            debug!("Run {}: {} -> {}", self.run_id, self.state, next);
            self.state = next;
        }
    }

    fn counts_toward_totals(&self, start_time: DateTime<Utc>) -> bool {
        self.totals_from
            .map_or(true, |resume_point| start_time >= resume_point)
    }
}

/// Replays the game log into ratings, snapshots and rankings
pub struct ChronologicalProcessor {
    repos: Repositories,
    strategy: RatingStrategy,
    decay: DecayConfig,
    processing: ProcessingSettings,
    persister: RankingPersister,
    metrics: Arc<MetricsCollector>,
}

impl ChronologicalProcessor {
    pub fn new(
        repos: Repositories,
        config: &AppConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let strategy = RatingStrategy::from_settings(&config.rating)?;
        let persister = RankingPersister::new(
            repos.writer.clone(),
            config.processing.batch_write_limit,
            metrics.clone(),
        )?;

        Ok(Self {
            repos,
            strategy,
            decay: config.rating.decay.clone(),
            processing: config.processing.clone(),
            persister,
            metrics,
        })
    }

    /// Run to completion
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary> {
        self.run_with_cancellation(request, CancellationHandle::new())
            .await
    }

    /// Run, stopping at the next round boundary once `cancel` fires
    pub async fn run_with_cancellation(
        &self,
        request: RunRequest,
        cancel: CancellationHandle,
    ) -> Result<RunSummary> {
        let timer = self.metrics.start_timer();
        request.validate()?;

        let timeline = SeasonTimeline::new(self.repos.games.seasons().await?);
        loader::verify_seasons(self.repos.games.as_ref(), &request.seasons).await?;

        let start_index = request
            .start_index
            .unwrap_or(self.processing.start_index);
        let scope = timeline.scope(&request.seasons, start_index);
        let season_ids: Vec<SeasonId> = scope.iter().map(|(_, s)| s.id.clone()).collect();

        let run_id = generate_run_id();
        info!(
            "Starting {} run {} over {} seasons with {} rating",
            request.mode,
            run_id,
            season_ids.len(),
            self.strategy.name()
        );

        self.repos.rounds.acquire_lock(&season_ids, run_id).await?;

        let (summary, outcome) = self
            .execute(run_id, &request, &scope, season_ids, &cancel)
            .await;

        if let Err(e) = self.repos.rounds.release_lock(run_id).await {
            warn!("Failed to release run lock for {}: {}", run_id, e);
        }

        self.metrics.record_run(
            request.mode,
            summary.final_state.as_str(),
            summary.players_ranked,
            timer.stop(),
        );

        match outcome {
            Ok(()) => {
                info!(
                    "Run {} finished: {} rounds, {} games, {} skipped, {} snapshots",
                    run_id,
                    summary.rounds_processed,
                    summary.games_processed,
                    summary.games_skipped.len(),
                    summary.snapshots_written
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Run {} entered state {}: {}", run_id, summary.final_state, e);
                Err(e)
            }
        }
    }

    /// Drive one run, returning the summary together with its outcome
    ///
    /// The summary's final state is `Done` on success and `Failed` otherwise.
    async fn execute(
        &self,
        run_id: RunId,
        request: &RunRequest,
        scope: &[(usize, Season)],
        season_ids: Vec<SeasonId>,
        cancel: &CancellationHandle,
    ) -> (RunSummary, Result<()>) {
        let mut decay = self.decay.clone();
        decay.enabled = decay.enabled && request.apply_decay;

        let mut ctx = RunContext::new(
            run_id,
            request,
            season_ids,
            decay,
            self.processing.progress_interval,
        );

        let outcome = self.drive(&mut ctx, request, scope, cancel).await;
        if outcome.is_ok() {
            ctx.transition(ProcessorState::Done);
        } else {
            ctx.transition(ProcessorState::Failed);
        }
        ctx.summary.final_state = ctx.state;
        (ctx.summary, outcome)
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        request: &RunRequest,
        scope: &[(usize, Season)],
        cancel: &CancellationHandle,
    ) -> Result<()> {
        ctx.tracker
            .prepare(self.repos.rounds.as_ref(), &ctx.summary.seasons)
            .await?;

        let loaded = loader::load_games(self.repos.games.as_ref(), scope).await?;
        for game in &loaded.incomplete {
            self.skip(&mut ctx.summary, game, SkipReason::Incomplete);
        }
        let rounds = group_rounds(loaded.games);

        if request.mode == RunMode::Incremental {
            match self.repos.reader.latest_snapshot().await? {
                Some(snapshot) => {
                    info!(
                        "Resuming from snapshot of season {} week {} ({} players)",
                        snapshot.season_id,
                        snapshot.week,
                        snapshot.players.len()
                    );
                    let resume = ResumePoint::from_snapshot(snapshot);
                    ctx.table = resume.table();
                    ctx.totals_from = Some(resume.cutoff);
                    ctx.season_index = Some(resume.season_index);
                    ctx.ranked_snapshot = Some(resume.snapshot.id);
                    self.restore_covered_rounds(ctx, &rounds, &resume).await?;
                    ctx.resume = Some(resume);
                }
                None => {
                    warn!("No snapshot to resume from, replaying every round");
                    ctx.tracker.replay_all();
                }
            }
        }

        ctx.games_total = rounds
            .iter()
            .filter(|r| ctx.tracker.should_process(r))
            .map(|r| r.len() as u64)
            .sum();

        for round in &rounds {
            if cancel.is_cancelled() {
                info!(
                    "Run {} cancelled before round {}; {} rounds left unmarked",
                    ctx.run_id,
                    round.id,
                    ctx.tracker.pending()
                );
                ctx.summary.cancelled = true;
                break;
            }

            if !ctx.tracker.should_process(round) {
                ctx.summary.rounds_skipped += 1;
                self.metrics.record_round_skipped();
                continue;
            }

            // late rounds fold into the resumed week
            let late = !ctx.counts_toward_totals(round.start_time);
            if !late && ctx.week.as_ref().is_some_and(|week| !week.belongs(round)) {
                self.flush_week(ctx).await?;
            }

            self.enter_season(ctx, round).await;

            if ctx.week.is_none() {
                ctx.week = Some(match ctx.resume.take() {
                    Some(resume) if resume.reopens_week(round) => {
                        WeekAccumulator::continue_from(&resume.snapshot)
                    }
                    _ => WeekAccumulator::begin(round, &ctx.table),
                });
            }

            ctx.transition(ProcessorState::ProcessingRound);
            let applied = self.process_round(ctx, round).await?;
            let applied_count = applied.len();

            ctx.tracker.record(round);
            if let Some(week) = ctx.week.as_mut() {
                week.add_round(round, applied);
            }

            ctx.summary.rounds_processed += 1;
            ctx.summary.games_processed += applied_count;
            self.metrics.record_round(applied_count);
            debug!(
                "Round {} of season {} applied {} of {} games",
                round.id,
                round.season_id,
                applied_count,
                round.len()
            );

            ctx.games_seen += round.len() as u64;
            if ctx.games_seen >= ctx.next_progress_at {
                while ctx.next_progress_at <= ctx.games_seen {
                    ctx.next_progress_at += self.processing.progress_interval;
                }
                let step = format!("Processed {} of {} games", ctx.games_seen, ctx.games_total);
                self.report_progress(ctx, step).await;
            }

            ctx.transition(ProcessorState::AwaitingRound);
        }

        if ctx.summary.cancelled {
            return Ok(());
        }

        self.flush_week(ctx).await?;
        self.save_rankings(ctx, request).await?;

        if let Some(season) = ctx.current_season.take() {
            ctx.last_completed_season = Some(season);
        }
        self.report_progress(ctx, "Calculation complete".to_string())
            .await;
        Ok(())
    }

    /// Mark rounds the resume snapshot already holds but tracking missed
    ///
    /// A run that fails between appending a snapshot and marking its rounds
    /// leaves exactly this gap; replaying those rounds would apply them twice.
    async fn restore_covered_rounds(
        &self,
        ctx: &mut RunContext,
        rounds: &[Round],
        resume: &ResumePoint,
    ) -> Result<()> {
        let covered: Vec<&Round> = rounds
            .iter()
            .filter(|r| ctx.tracker.should_process(r) && resume.covers(r))
            .collect();
        if covered.is_empty() {
            return Ok(());
        }

        warn!(
            "Snapshot {} covers {} unmarked rounds, marking them calculated",
            resume.snapshot.id,
            covered.len()
        );
        for round in covered {
            ctx.tracker.record(round);
        }
        ctx.tracker.flush(self.repos.rounds.as_ref()).await?;
        Ok(())
    }

    /// Write rankings unless they already reflect the table
    ///
    /// An incremental run with nothing new still saves when the previous run
    /// wrote its snapshots but failed before committing every ranking batch.
    async fn save_rankings(&self, ctx: &mut RunContext, request: &RunRequest) -> Result<()> {
        let persisted = self.repos.reader.current_rankings().await?;

        if request.mode == RunMode::Incremental
            && ctx.summary.rounds_processed == 0
            && rankings_reflect(&ctx.table, &persisted, ctx.ranked_snapshot)
        {
            info!(
                "No new rounds for run {}, rankings left unchanged",
                ctx.run_id
            );
            return Ok(());
        }

        let documents = build_documents(
            &ctx.table,
            &persisted,
            self.processing.rank_precision_digits,
            ctx.ranked_snapshot,
            current_timestamp(),
        );
        ctx.summary.players_ranked = documents.len();
        ctx.summary.ranking_batches = self.persister.save(documents).await?;
        Ok(())
    }

    /// Apply decay and progress bookkeeping when the run moves into a later season
    async fn enter_season(&self, ctx: &mut RunContext, round: &Round) {
        let later = ctx
            .season_index
            .map_or(true, |index| round.season_index > index);
        if !later {
            return;
        }

        let summary = apply_season_transition(
            &mut ctx.table,
            ctx.season_index,
            round.season_index,
            self.strategy.initial_rating().mu,
            &ctx.decay,
        );
        if summary.decayed > 0 || summary.deactivated > 0 {
            info!(
                "Entering season {}: {} players decayed, {} marked inactive",
                round.season_id, summary.decayed, summary.deactivated
            );
        }
        ctx.season_index = Some(round.season_index);

        if let Some(previous) = ctx.current_season.replace(round.season_id.clone()) {
            ctx.last_completed_season = Some(previous);
            let step = format!("Processing season {}", round.season_id);
            self.report_progress(ctx, step).await;
        }
    }

    /// Persist the open week's snapshot, then mark its rounds calculated
    async fn flush_week(&self, ctx: &mut RunContext) -> Result<()> {
        let Some(week) = ctx.week.take() else {
            return Ok(());
        };

        ctx.transition(ProcessorState::SnapshotPending);
        let snapshot = week.finish(ctx.run_id, &ctx.table);
        debug!(
            "Writing snapshot for season {} week {} ({} games)",
            snapshot.season_id,
            snapshot.week,
            snapshot.game_ids.len()
        );

        let snapshot_id = snapshot.id;
        self.repos.writer.append_snapshot(snapshot).await?;
        ctx.ranked_snapshot = Some(snapshot_id);
        ctx.summary.snapshots_written += 1;
        self.metrics.record_snapshot_written();

        ctx.tracker.flush(self.repos.rounds.as_ref()).await?;
        ctx.transition(ProcessorState::AwaitingRound);
        Ok(())
    }

    /// Fold one round into the table, returning the ids of the rated games
    async fn process_round(&self, ctx: &mut RunContext, round: &Round) -> Result<Vec<GameId>> {
        let mut ready: Vec<(&LoadedGame, ResolvedGame)> = Vec::with_capacity(round.len());
        for loaded in &round.games {
            match self.resolve(&loaded.game).await? {
                Resolution::Ready(resolved) => ready.push((loaded, resolved)),
                Resolution::Skipped(reason) => {
                    self.skip(&mut ctx.summary, &loaded.game, reason)
                }
            }
        }

        let initial = self.strategy.initial_rating();
        let mut round_games = Vec::with_capacity(ready.len());

        for (loaded, resolved) in &ready {
            for player in resolved.home.iter().chain(resolved.away.iter()) {
                let rating = ctx.table.ensure(player, initial).rating;
                if let Some(week) = ctx.week.as_mut() {
                    week.note_player(&player.id, rating);
                }
            }

            if ctx.rating_excluded.contains(&loaded.game.id) {
                self.skip(&mut ctx.summary, &loaded.game, SkipReason::RatingExcluded);
                continue;
            }

            round_games.push(RoundGame {
                game_id: loaded.game.id.clone(),
                home: resolved.home.iter().map(|p| p.id.clone()).collect(),
                away: resolved.away.iter().map(|p| p.id.clone()).collect(),
                winner: resolved.winner,
                point_differential: resolved.point_differential,
                match_type: loaded.game.match_type,
                season_order: loaded.game.season_order,
            });
        }

        self.strategy.apply_round(&mut ctx.table, &round_games)?;

        for (loaded, resolved) in &ready {
            let game = &loaded.game;
            let count_totals = ctx.counts_toward_totals(game.start_time);
            for player in resolved.home.iter().chain(resolved.away.iter()) {
                if let Some(state) = ctx.table.get_mut(&player.id) {
                    state.record_game(
                        &game.season_id,
                        loaded.season_index,
                        game.start_time,
                        count_totals,
                    );
                }
            }
        }

        Ok(round_games.into_iter().map(|g| g.game_id).collect())
    }

    /// Check a game and fetch both rosters
    ///
    /// Data problems come back as `Resolution::Skipped`; only repository
    /// failures are errors.
    async fn resolve(&self, game: &Game) -> Result<Resolution> {
        let (Some(home_id), Some(away_id)) = (game.home_team.as_deref(), game.away_team.as_deref())
        else {
            return Ok(Resolution::Skipped(SkipReason::MissingTeamReference));
        };

        let (Some(winner), Some(point_differential)) = (game.winner(), game.point_differential())
        else {
            let reason = if game.is_complete() {
                SkipReason::TiedScore
            } else {
                SkipReason::Incomplete
            };
            return Ok(Resolution::Skipped(reason));
        };

        let (home, away) = tokio::try_join!(
            self.repos.rosters.roster(home_id),
            self.repos.rosters.roster(away_id)
        )?;

        let (Some(home), Some(away)) = (home, away) else {
            return Ok(Resolution::Skipped(SkipReason::MissingTeam));
        };

        let home = dedup_roster(home);
        let away = dedup_roster(away);
        if home.is_empty() || away.is_empty() {
            return Ok(Resolution::Skipped(SkipReason::EmptyRoster));
        }

        let home_ids: HashSet<&str> = home.iter().map(|p| p.id.as_str()).collect();
        if away.iter().any(|p| home_ids.contains(p.id.as_str())) {
            return Ok(Resolution::Skipped(SkipReason::SharedPlayer));
        }

        Ok(Resolution::Ready(ResolvedGame {
            home,
            away,
            winner,
            point_differential,
        }))
    }

    fn skip(&self, summary: &mut RunSummary, game: &Game, reason: SkipReason) {
        match reason {
            SkipReason::Incomplete | SkipReason::RatingExcluded => {
                debug!("Game {} not rated: {}", game.id, reason)
            }
            _ => warn!("Skipping game {} in season {}: {}", game.id, game.season_id, reason),
        }
        self.metrics.record_game_skipped(reason.as_str());
        summary.games_skipped.push(SkippedGame::new(game, reason));
    }

    /// Best-effort progress update
    async fn report_progress(&self, ctx: &RunContext, step: String) {
        let percent = if ctx.games_total == 0 {
            100.0
        } else {
            (ctx.games_seen as f64 / ctx.games_total as f64 * 100.0).min(100.0)
        };

        let record = ProgressRecord {
            step,
            percent,
            last_completed_season: ctx.last_completed_season.clone(),
            updated_at: current_timestamp(),
        };

        if let Err(e) = self.repos.progress.report(record).await {
            warn!("Progress update failed: {}", e);
        }
    }
}

/// Drop repeated roster entries, keeping the first
fn dedup_roster(roster: Vec<PlayerRef>) -> Vec<PlayerRef> {
    let mut seen = HashSet::new();
    roster
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}
