//! Integration tests for the league rating engine
//!
//! These tests drive the processor end to end against the in-memory store:
//! - Full run idempotence
//! - Incremental runs converging with full runs
//! - Lifetime totals across the resume point and season transitions
//! - Run locking, cancellation and fatal errors
//! - Batched ranking persistence and retry

mod fixtures;

use fixtures::{
    assert_rankings_match, empty_league, full_league, game, kickoff, league_games, league_with,
    processor, processor_with, CancelOnProgress, FlakyRankingWriter, FlakyRoundStore,
    YieldingRoundStore, SEASONS,
};
use league_ratings::config::{AppConfig, RatingAlgorithmKind};
use league_ratings::error::EngineError;
use league_ratings::processing::{
    CancellationHandle, ProcessorState, Repositories, RunRequest, SkipReason,
};
use league_ratings::ranking::season_standings;
use league_ratings::repository::{RankingReader, RoundStore};
use league_ratings::utils::generate_run_id;
use std::sync::Arc;

#[tokio::test]
async fn test_full_run_processes_every_round() {
    let store = full_league();
    let summary = processor(store.clone()).run(RunRequest::full()).await.unwrap();

    let games = league_games().len();
    assert_eq!(summary.final_state, ProcessorState::Done);
    assert_eq!(summary.games_processed, games);
    assert_eq!(summary.rounds_processed, games / 2);
    assert!(summary.games_skipped.is_empty());
    assert_eq!(summary.snapshots_written, SEASONS.len() * 3);
    assert_eq!(summary.players_ranked, 9);
    assert_eq!(summary.ranking_batches, 1);

    let rankings = store.dataset().unwrap().rankings;
    assert_eq!(rankings.len(), 9);
    assert!(rankings.values().any(|r| r.rank == 1));
    assert_eq!(store.calculated_records().unwrap().len(), games / 2);
}

#[tokio::test]
async fn test_full_run_is_idempotent() {
    let store = full_league();
    let engine = processor(store.clone());

    engine.run(RunRequest::full()).await.unwrap();
    let first = store.dataset().unwrap().rankings;

    engine.run(RunRequest::full()).await.unwrap();
    let second = store.dataset().unwrap().rankings;

    assert_rankings_match(&first, &second);
    assert!(second.values().all(|r| r.rating_change.abs() < 1e-9));
    assert_eq!(
        store.calculated_records().unwrap().len(),
        league_games().len() / 2
    );
}

#[tokio::test]
async fn test_incremental_converges_with_full_run_mid_week() {
    // split inside the second week of the fall season
    let split = kickoff(1, 2, 0);

    let incremental = league_with(|g| g.start_time <= split);
    processor(incremental.clone())
        .run(RunRequest::full())
        .await
        .unwrap();

    for game in league_games().into_iter().filter(|g| g.start_time > split) {
        incremental.insert_game(game).unwrap();
    }
    let summary = processor(incremental.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();

    let expected_new_games = league_games()
        .iter()
        .filter(|g| g.start_time > split)
        .count();
    assert_eq!(summary.games_processed, expected_new_games);
    assert_eq!(summary.rounds_skipped * 2, league_games().len() - expected_new_games);

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();

    assert_rankings_match(
        &incremental.dataset().unwrap().rankings,
        &full.dataset().unwrap().rankings,
    );

    // the superseding snapshot of the split week reports from the true week start
    let snapshots = incremental.snapshots().unwrap();
    let reopened = snapshots
        .iter()
        .rev()
        .find(|s| s.season_id == SEASONS[1] && s.week == 2)
        .unwrap();
    assert_eq!(reopened.game_ids.len(), 4);
    let full_week = full
        .snapshots()
        .unwrap()
        .into_iter()
        .find(|s| s.season_id == SEASONS[1] && s.week == 2)
        .unwrap();
    assert_eq!(reopened.start_of_week, full_week.start_of_week);
}

#[tokio::test]
async fn test_incremental_across_season_transition_keeps_totals() {
    let first_season_end = kickoff(0, 3, 1);

    let incremental = league_with(|g| g.start_time <= first_season_end);
    processor(incremental.clone())
        .run(RunRequest::full())
        .await
        .unwrap();
    let after_first = incremental.dataset().unwrap().rankings;
    assert!(after_first.values().all(|r| r.total_seasons == 1));

    for game in league_games()
        .into_iter()
        .filter(|g| g.start_time > first_season_end)
    {
        incremental.insert_game(game).unwrap();
    }
    processor(incremental.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();

    let rankings = incremental.dataset().unwrap().rankings;
    assert_rankings_match(&rankings, &full.dataset().unwrap().rankings);
    assert_eq!(rankings["a"].total_seasons, 3);
    assert_eq!(rankings["h"].total_seasons, 2);
    assert_eq!(rankings["i"].total_seasons, 1);
    assert_eq!(rankings["a"].total_games, 18);
}

#[tokio::test]
async fn test_game_before_resume_point_rates_without_counting() {
    let store = full_league();
    processor(store.clone()).run(RunRequest::full()).await.unwrap();
    let before = store.dataset().unwrap().rankings;

    // a late-reported result from an earlier week, in its own time slot
    store
        .insert_game(game(
            "late-report",
            2,
            "2024-spring-t0",
            "2024-spring-t1",
            (30, 2),
            1,
            kickoff(2, 1, 5),
        ))
        .unwrap();

    let summary = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    assert_eq!(summary.rounds_processed, 1);
    assert_eq!(summary.games_processed, 1);

    let after = store.dataset().unwrap().rankings;
    for player in ["c", "e", "d", "f"] {
        assert_eq!(after[player].total_games, before[player].total_games);
        assert_ne!(after[player].mu, before[player].mu);
    }
    assert!(after["c"].rating_change > 0.0);
    assert!(after["d"].rating_change < 0.0);
}

#[tokio::test]
async fn test_incremental_without_new_rounds_changes_nothing() {
    let store = full_league();
    processor(store.clone()).run(RunRequest::full()).await.unwrap();
    let before = store.dataset().unwrap();

    let summary = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();

    assert_eq!(summary.rounds_processed, 0);
    assert_eq!(summary.rounds_skipped, league_games().len() / 2);
    assert_eq!(summary.snapshots_written, 0);
    assert_eq!(summary.ranking_batches, 0);
    assert_eq!(store.dataset().unwrap().rankings, before.rankings);
}

#[tokio::test]
async fn test_incremental_without_snapshot_replays_everything() {
    let incremental = full_league();
    let summary = processor(incremental.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    assert_eq!(summary.games_processed, league_games().len());

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();
    assert_rankings_match(
        &incremental.dataset().unwrap().rankings,
        &full.dataset().unwrap().rankings,
    );
}

#[tokio::test]
async fn test_missing_season_is_fatal() {
    let store = full_league();
    let engine = processor(store.clone());

    let err = engine
        .run(RunRequest::full().with_seasons(vec!["1999-winter".to_string()]))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::SeasonNotFound { season_id }) if season_id == "1999-winter"
    ));
    assert!(store.calculated_records().unwrap().is_empty());
    assert!(store.snapshots().unwrap().is_empty());

    // nothing was left locked
    assert!(engine.run(RunRequest::full()).await.is_ok());
}

#[tokio::test]
async fn test_missing_team_document_skips_game() {
    let store = full_league();
    store
        .insert_game(game(
            "orphan",
            0,
            "2023-spring-t0",
            "deleted-team",
            (5, 3),
            1,
            kickoff(0, 1, 4),
        ))
        .unwrap();

    let summary = processor(store.clone()).run(RunRequest::full()).await.unwrap();
    assert_eq!(summary.final_state, ProcessorState::Done);
    assert_eq!(summary.skipped(SkipReason::MissingTeam), 1);
    assert_eq!(summary.games_processed, league_games().len());
}

#[tokio::test]
async fn test_run_rejected_while_season_locked() {
    let store = full_league();
    let holder = generate_run_id();
    store
        .acquire_lock(&[SEASONS[2].to_string()], holder)
        .await
        .unwrap();

    let err = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::RunInProgress { .. })
    ));
    assert!(store.dataset().unwrap().rankings.is_empty());

    store.release_lock(holder).await.unwrap();
    assert!(processor(store).run(RunRequest::incremental()).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_runs_on_same_season_fail_fast() {
    let store = full_league();
    let mut repos = Repositories::from_store(store.clone());
    repos.rounds = Arc::new(YieldingRoundStore::new(store.clone()));

    let first = processor_with(repos.clone(), &AppConfig::default());
    let second = processor_with(repos, &AppConfig::default());

    let (a, b) = futures::join!(
        first.run(RunRequest::full()),
        second.run(RunRequest::incremental())
    );

    assert!(a.is_ok());
    let err = b.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::RunInProgress { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_run_leaves_no_partial_tracking() {
    let store = full_league();
    let cancel = CancellationHandle::new();

    let mut repos = Repositories::from_store(store.clone());
    repos.progress = Arc::new(CancelOnProgress::new(cancel.clone()));
    let mut config = AppConfig::default();
    config.processing.progress_interval = 1;

    let summary = processor_with(repos, &config)
        .run_with_cancellation(RunRequest::full(), cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.rounds_processed, 1);
    assert_eq!(summary.snapshots_written, 0);
    assert!(store.calculated_records().unwrap().is_empty());
    assert!(store.dataset().unwrap().rankings.is_empty());

    // a later incremental run replays cleanly
    processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();
    assert_rankings_match(
        &store.dataset().unwrap().rankings,
        &full.dataset().unwrap().rankings,
    );
}

#[tokio::test]
async fn test_failed_ranking_save_is_retryable() {
    let store = full_league();
    let mut repos = Repositories::from_store(store.clone());
    repos.writer = Arc::new(FlakyRankingWriter::new(store.clone(), 2));
    let mut config = AppConfig::default();
    config.processing.batch_write_limit = 4;

    let engine = processor_with(repos, &config);
    let err = engine.run(RunRequest::full()).await.unwrap_err();
    match err.downcast_ref::<EngineError>() {
        Some(EngineError::PersistenceFailed {
            batches_committed, ..
        }) => assert_eq!(*batches_committed, 1),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.dataset().unwrap().rankings.len(), 4);

    let summary = engine.run(RunRequest::full()).await.unwrap();
    assert_eq!(summary.ranking_batches, 3);
    assert_eq!(store.dataset().unwrap().rankings.len(), 9);
}

#[tokio::test]
async fn test_failed_incremental_save_is_retryable() {
    let split = kickoff(1, 2, 0);
    let store = league_with(|g| g.start_time <= split);
    processor(store.clone()).run(RunRequest::full()).await.unwrap();
    for game in league_games().into_iter().filter(|g| g.start_time > split) {
        store.insert_game(game).unwrap();
    }

    let mut repos = Repositories::from_store(store.clone());
    repos.writer = Arc::new(FlakyRankingWriter::new(store.clone(), 1));
    let err = processor_with(repos, &AppConfig::default())
        .run(RunRequest::incremental())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::PersistenceFailed { .. })
    ));

    // every round is tracked, yet the rankings still trail the snapshots
    let summary = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    assert_eq!(summary.rounds_processed, 0);
    assert!(summary.ranking_batches >= 1);

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();
    assert_rankings_match(
        &store.dataset().unwrap().rankings,
        &full.dataset().unwrap().rankings,
    );
}

#[tokio::test]
async fn test_rounds_in_snapshot_are_not_replayed_after_tracking_failure() {
    let store = full_league();
    let mut repos = Repositories::from_store(store.clone());
    repos.rounds = Arc::new(FlakyRoundStore::new(store.clone(), 3));

    // the third week's snapshot lands but its rounds are never marked
    assert!(processor_with(repos, &AppConfig::default())
        .run(RunRequest::full())
        .await
        .is_err());
    assert_eq!(store.snapshots().unwrap().len(), 3);
    assert_eq!(store.calculated_records().unwrap().len(), 4);

    let summary = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    assert_eq!(summary.rounds_skipped, 6);
    assert_eq!(summary.rounds_processed, league_games().len() / 2 - 6);
    assert_eq!(
        store.calculated_records().unwrap().len(),
        league_games().len() / 2
    );

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();
    let rankings = store.dataset().unwrap().rankings;
    assert_rankings_match(&rankings, &full.dataset().unwrap().rankings);
    assert_eq!(rankings["a"].total_games, 18);
}

#[tokio::test]
async fn test_chained_late_reports_never_count_toward_totals() {
    let store = full_league();
    processor(store.clone()).run(RunRequest::full()).await.unwrap();
    let frontier = store.snapshots().unwrap().pop().unwrap();

    store
        .insert_game(game(
            "late-week-1",
            2,
            "2024-spring-t2",
            "2024-spring-t3",
            (14, 9),
            1,
            kickoff(2, 1, 5),
        ))
        .unwrap();
    processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();

    store
        .insert_game(game(
            "late-week-2",
            2,
            "2024-spring-t0",
            "2024-spring-t1",
            (6, 11),
            2,
            kickoff(2, 2, 5),
        ))
        .unwrap();
    let summary = processor(store.clone())
        .run(RunRequest::incremental())
        .await
        .unwrap();
    assert_eq!(summary.rounds_processed, 1);
    assert_eq!(summary.games_processed, 1);

    // both reports folded into the frontier week
    let latest = store.snapshots().unwrap().pop().unwrap();
    assert_eq!(latest.season_id, SEASONS[2]);
    assert_eq!(latest.week, 3);
    assert_eq!(latest.cutoff, frontier.cutoff);
    assert_eq!(latest.round_ids.len(), frontier.round_ids.len() + 2);

    let full = full_league();
    processor(full.clone()).run(RunRequest::full()).await.unwrap();
    let baseline = full.dataset().unwrap().rankings;
    for (id, ranking) in store.dataset().unwrap().rankings {
        assert_eq!(ranking.total_games, baseline[&id].total_games, "{}", id);
    }
}

#[tokio::test]
async fn test_decay_toggle_changes_returning_player() {
    let decayed = full_league();
    processor(decayed.clone()).run(RunRequest::full()).await.unwrap();

    let plain = full_league();
    processor(plain.clone())
        .run(RunRequest::full().without_decay())
        .await
        .unwrap();

    let with_decay = decayed.dataset().unwrap().rankings;
    let without_decay = plain.dataset().unwrap().rankings;
    assert_ne!(with_decay["h"].mu, without_decay["h"].mu);
    assert_eq!(with_decay["h"].total_games, without_decay["h"].total_games);
    assert!(with_decay["h"].is_active);
}

#[tokio::test]
async fn test_scoped_run_starts_from_requested_season() {
    let store = full_league();
    let summary = processor(store.clone())
        .run(RunRequest::full().starting_at(2))
        .await
        .unwrap();

    assert_eq!(summary.seasons, vec![SEASONS[2].to_string()]);
    assert_eq!(summary.games_processed, league_games().len() / 3);
    let rankings = store.dataset().unwrap().rankings;
    assert!(!rankings.contains_key("i"));
    assert!(rankings.values().all(|r| r.total_seasons == 1));
}

#[tokio::test]
async fn test_elo_strategy_runs_end_to_end() {
    let store = full_league();
    let mut config = AppConfig::default();
    config.rating.algorithm = RatingAlgorithmKind::Elo;

    let summary = processor_with(Repositories::from_store(store.clone()), &config)
        .run(RunRequest::full())
        .await
        .unwrap();
    assert_eq!(summary.games_processed, league_games().len());

    let rankings = store.dataset().unwrap().rankings;
    let mean: f64 = rankings.values().map(|r| r.mu).sum::<f64>() / rankings.len() as f64;
    assert!((mean - 1500.0).abs() < 50.0);
    assert!(rankings
        .values()
        .all(|r| (r.sigma - config.rating.trueskill.initial_sigma).abs() < 1e-12));
}

#[tokio::test]
async fn test_latest_snapshot_matches_final_rankings() {
    let store = full_league();
    processor(store.clone()).run(RunRequest::full()).await.unwrap();

    let snapshot = store.latest_snapshot().await.unwrap().unwrap();
    let rankings = store.current_rankings().await.unwrap();
    assert_eq!(snapshot.season_id, SEASONS[2]);
    for player in &snapshot.players {
        assert_eq!(player.rating.mu, rankings[&player.player_id].mu);
    }
}

#[tokio::test]
async fn test_swiss_standings_for_season() {
    let store = full_league();
    let standings = season_standings(store.as_ref(), SEASONS[0]).await.unwrap();

    assert_eq!(standings.len(), 4);
    let total_wins: u32 = standings.iter().map(|s| s.wins).sum();
    assert_eq!(total_wins as usize, league_games().len() / 3);
    assert!(standings.windows(2).all(|w| w[0].swiss_score >= w[1].swiss_score));
    assert_eq!(standings[0].rank, 1);

    let err = season_standings(empty_league().as_ref(), "nope")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::SeasonNotFound { .. })
    ));
}
