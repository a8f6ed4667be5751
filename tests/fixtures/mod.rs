//! Test fixtures and collaborator doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use league_ratings::config::AppConfig;
use league_ratings::error::Result;
use league_ratings::metrics::MetricsCollector;
use league_ratings::processing::{CancellationHandle, ChronologicalProcessor, Repositories};
use league_ratings::repository::{InMemoryStore, ProgressSink, RankingWriter, RoundStore};
use league_ratings::types::{
    CalculatedRoundRecord, Game, MatchType, PlayerRef, ProgressRecord, RankingDocument, RoundId,
    RunId, Season, SeasonId, Team, WeeklySnapshot,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SEASONS: [&str; 3] = ["2023-spring", "2023-fall", "2024-spring"];
pub const WEEKS_PER_SEASON: u32 = 3;

pub fn kickoff(season_index: usize, week: u32, slot: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 3, 4, 18, 0, 0).unwrap()
        + Duration::days(120 * season_index as i64)
        + Duration::weeks(week as i64 - 1)
        + Duration::hours(2 * slot as i64)
}

/// Rosters of the four teams in a season; player `h` sits out the fall season
pub fn rosters(season_index: usize) -> Vec<(String, Vec<&'static str>)> {
    let fill_in = if season_index == 1 { "i" } else { "h" };
    let players = ["a", "b", "c", "d", "e", "f", "g", fill_in];
    (0..4)
        .map(|t| {
            // rotate partners between seasons
            let first = players[(t + season_index) % 4];
            let second = players[4 + t];
            (format!("{}-t{}", SEASONS[season_index], t), vec![first, second])
        })
        .collect()
}

pub fn season(index: usize) -> Season {
    Season {
        id: SEASONS[index].to_string(),
        name: SEASONS[index].replace('-', " "),
        order: (SEASONS.len() - 1 - index) as u32,
    }
}

pub fn team(season_index: usize, id: &str, players: &[&str]) -> Team {
    Team {
        id: id.to_string(),
        name: id.to_string(),
        season_id: SEASONS[season_index].to_string(),
        roster: players
            .iter()
            .map(|p| PlayerRef::new(*p, p.to_uppercase()))
            .collect(),
    }
}

pub fn game(
    id: &str,
    season_index: usize,
    home: &str,
    away: &str,
    score: (u32, u32),
    week: u32,
    start_time: DateTime<Utc>,
) -> Game {
    Game {
        id: id.to_string(),
        season_id: SEASONS[season_index].to_string(),
        home_team: Some(home.to_string()),
        away_team: Some(away.to_string()),
        home_score: Some(score.0),
        away_score: Some(score.1),
        match_type: if week == WEEKS_PER_SEASON && season_index == 2 {
            MatchType::Playoff
        } else {
            MatchType::Regular
        },
        start_time,
        week,
        season_order: (SEASONS.len() - 1 - season_index) as u32,
    }
}

/// Every game of the league in chronological order
///
/// Each week has two time slots with two simultaneous games, so every round
/// holds two games.
pub fn league_games() -> Vec<Game> {
    let mut games = Vec::new();
    for season_index in 0..SEASONS.len() {
        let teams: Vec<String> = rosters(season_index).into_iter().map(|(id, _)| id).collect();
        for week in 1..=WEEKS_PER_SEASON {
            let pairings = match week % 3 {
                1 => [[(0, 1), (2, 3)], [(0, 2), (1, 3)]],
                2 => [[(0, 3), (1, 2)], [(1, 0), (3, 2)]],
                _ => [[(2, 0), (3, 1)], [(3, 0), (2, 1)]],
            };
            for (slot, slot_pairings) in pairings.iter().enumerate() {
                for (g, (home, away)) in slot_pairings.iter().enumerate() {
                    let seed = season_index * 31 + week as usize * 7 + slot * 5 + g * 3;
                    let home_score = 8 + (seed % 9) as u32;
                    let mut away_score = 6 + ((seed * 5) % 11) as u32;
                    if away_score == home_score {
                        away_score += 2;
                    }
                    games.push(game(
                        &format!("{}-w{}-s{}-g{}", SEASONS[season_index], week, slot, g),
                        season_index,
                        &teams[*home],
                        &teams[*away],
                        (home_score, away_score),
                        week,
                        kickoff(season_index, week, slot as u32),
                    ));
                }
            }
        }
    }
    games
}

/// A store holding seasons and teams but no games
pub fn empty_league() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for season_index in 0..SEASONS.len() {
        store.insert_season(season(season_index)).unwrap();
        for (id, players) in rosters(season_index) {
            store.insert_team(team(season_index, &id, &players)).unwrap();
        }
    }
    Arc::new(store)
}

/// A store holding the games selected by `keep`
pub fn league_with(keep: impl Fn(&Game) -> bool) -> Arc<InMemoryStore> {
    let store = empty_league();
    for game in league_games().into_iter().filter(|g| keep(g)) {
        store.insert_game(game).unwrap();
    }
    store
}

pub fn full_league() -> Arc<InMemoryStore> {
    league_with(|_| true)
}

pub fn processor(store: Arc<InMemoryStore>) -> ChronologicalProcessor {
    processor_with(Repositories::from_store(store), &AppConfig::default())
}

pub fn processor_with(repos: Repositories, config: &AppConfig) -> ChronologicalProcessor {
    ChronologicalProcessor::new(repos, config, Arc::new(MetricsCollector::new().unwrap())).unwrap()
}

/// Assert two ranking sets agree on everything derived from the game log
pub fn assert_rankings_match(
    left: &std::collections::BTreeMap<String, RankingDocument>,
    right: &std::collections::BTreeMap<String, RankingDocument>,
) {
    assert_eq!(
        left.keys().collect::<Vec<_>>(),
        right.keys().collect::<Vec<_>>()
    );
    for (id, l) in left {
        let r = &right[id];
        assert!((l.mu - r.mu).abs() < 1e-9, "mu differs for {}: {} vs {}", id, l.mu, r.mu);
        assert!(
            (l.sigma - r.sigma).abs() < 1e-9,
            "sigma differs for {}: {} vs {}",
            id,
            l.sigma,
            r.sigma
        );
        assert_eq!(l.rank, r.rank, "rank differs for {}", id);
        assert_eq!(l.total_games, r.total_games, "total games differ for {}", id);
        assert_eq!(l.total_seasons, r.total_seasons, "total seasons differ for {}", id);
        assert_eq!(l.is_active, r.is_active, "activity differs for {}", id);
    }
}

/// Progress sink that cancels the run on its first report
pub struct CancelOnProgress {
    handle: CancellationHandle,
}

impl CancelOnProgress {
    pub fn new(handle: CancellationHandle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl ProgressSink for CancelOnProgress {
    async fn report(&self, _record: ProgressRecord) -> Result<()> {
        self.handle.cancel();
        Ok(())
    }
}

/// Ranking writer that fails one chosen batch, once
pub struct FlakyRankingWriter {
    inner: Arc<InMemoryStore>,
    fail_on_call: usize,
    calls: AtomicUsize,
    failed: Mutex<bool>,
}

impl FlakyRankingWriter {
    pub fn new(inner: Arc<InMemoryStore>, fail_on_call: usize) -> Self {
        Self {
            inner,
            fail_on_call,
            calls: AtomicUsize::new(0),
            failed: Mutex::new(false),
        }
    }
}

#[async_trait]
impl RankingWriter for FlakyRankingWriter {
    async fn commit_batch(&self, batch: Vec<RankingDocument>) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut failed = self.failed.lock().unwrap();
            if call == self.fail_on_call && !*failed {
                *failed = true;
                return Err(anyhow::anyhow!("simulated commit failure"));
            }
        }
        self.inner.commit_batch(batch).await
    }

    async fn append_snapshot(&self, snapshot: WeeklySnapshot) -> Result<()> {
        self.inner.append_snapshot(snapshot).await
    }
}

/// Round store that yields to the executor inside tracking calls, so two
/// runs joined on one task interleave after taking their locks
pub struct YieldingRoundStore {
    inner: Arc<InMemoryStore>,
}

impl YieldingRoundStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RoundStore for YieldingRoundStore {
    async fn calculated_rounds(&self, season_ids: &[SeasonId]) -> Result<HashSet<RoundId>> {
        tokio::task::yield_now().await;
        self.inner.calculated_rounds(season_ids).await
    }

    async fn mark_calculated(&self, records: Vec<CalculatedRoundRecord>) -> Result<()> {
        self.inner.mark_calculated(records).await
    }

    async fn reset(&self, season_ids: &[SeasonId]) -> Result<()> {
        tokio::task::yield_now().await;
        self.inner.reset(season_ids).await
    }

    async fn acquire_lock(&self, season_ids: &[SeasonId], run_id: RunId) -> Result<()> {
        self.inner.acquire_lock(season_ids, run_id).await
    }

    async fn release_lock(&self, run_id: RunId) -> Result<()> {
        self.inner.release_lock(run_id).await
    }
}

/// Round store whose tracking write fails once, on a chosen call
pub struct FlakyRoundStore {
    inner: Arc<InMemoryStore>,
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FlakyRoundStore {
    pub fn new(inner: Arc<InMemoryStore>, fail_on_call: usize) -> Self {
        Self {
            inner,
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RoundStore for FlakyRoundStore {
    async fn calculated_rounds(&self, season_ids: &[SeasonId]) -> Result<HashSet<RoundId>> {
        self.inner.calculated_rounds(season_ids).await
    }

    async fn mark_calculated(&self, records: Vec<CalculatedRoundRecord>) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            return Err(anyhow::anyhow!("simulated tracking failure"));
        }
        self.inner.mark_calculated(records).await
    }

    async fn reset(&self, season_ids: &[SeasonId]) -> Result<()> {
        self.inner.reset(season_ids).await
    }

    async fn acquire_lock(&self, season_ids: &[SeasonId], run_id: RunId) -> Result<()> {
        self.inner.acquire_lock(season_ids, run_id).await
    }

    async fn release_lock(&self, run_id: RunId) -> Result<()> {
        self.inner.release_lock(run_id).await
    }
}
