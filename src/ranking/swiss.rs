//! Swiss-system standings for an in-progress season
//!
//! Stateless and single pass: every call recomputes the table from the
//! season's completed games. Buchholz uses final win totals, not a
//! recursive strength of schedule.

use crate::error::{EngineError, Result};
use crate::ranking::competition::ranks_for_sorted;
use crate::repository::GameRepository;
use crate::types::{Game, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standing of one team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwissRanking {
    pub team_id: TeamId,
    pub wins: u32,
    pub losses: u32,
    pub points_for: u32,
    pub points_against: u32,
    pub point_differential: i64,
    /// Opponents faced, with repeats
    pub opponents: Vec<TeamId>,
    pub buchholz: u32,
    /// `2 * wins + buchholz`
    pub swiss_score: u32,
    pub rank: u32,
}

impl SwissRanking {
    fn new(team_id: TeamId) -> Self {
        Self {
            team_id,
            wins: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            point_differential: 0,
            opponents: Vec::new(),
            buchholz: 0,
            swiss_score: 0,
            rank: 0,
        }
    }

    fn record(&mut self, opponent: &str, scored: u32, conceded: u32) {
        self.points_for += scored;
        self.points_against += conceded;
        self.opponents.push(opponent.to_string());
        if scored > conceded {
            self.wins += 1;
        } else if conceded > scored {
            self.losses += 1;
        }
    }
}

/// Compute standings from completed games
///
/// Teams without games still appear. Incomplete games and games missing a
/// team reference are ignored. A tied game counts for points and opponents
/// but neither as a win nor a loss.
pub fn calculate_swiss_rankings(games: &[Game], team_ids: &[TeamId]) -> Vec<SwissRanking> {
    let mut table: BTreeMap<TeamId, SwissRanking> = team_ids
        .iter()
        .map(|id| (id.clone(), SwissRanking::new(id.clone())))
        .collect();

    for game in games {
        let (Some(home), Some(away), Some(home_score), Some(away_score)) = (
            game.home_team.as_ref(),
            game.away_team.as_ref(),
            game.home_score,
            game.away_score,
        ) else {
            continue;
        };

        table
            .entry(home.clone())
            .or_insert_with(|| SwissRanking::new(home.clone()))
            .record(away, home_score, away_score);
        table
            .entry(away.clone())
            .or_insert_with(|| SwissRanking::new(away.clone()))
            .record(home, away_score, home_score);
    }

    let wins: BTreeMap<TeamId, u32> = table.iter().map(|(id, r)| (id.clone(), r.wins)).collect();

    let mut rankings: Vec<SwissRanking> = table
        .into_values()
        .map(|mut ranking| {
            ranking.buchholz = ranking
                .opponents
                .iter()
                .map(|opponent| wins.get(opponent).copied().unwrap_or(0))
                .sum();
            ranking.swiss_score = 2 * ranking.wins + ranking.buchholz;
            ranking.point_differential =
                ranking.points_for as i64 - ranking.points_against as i64;
            ranking
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.swiss_score
            .cmp(&a.swiss_score)
            .then_with(|| b.point_differential.cmp(&a.point_differential))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });

    let keys: Vec<(u32, i64)> = rankings
        .iter()
        .map(|r| (r.swiss_score, r.point_differential))
        .collect();
    for (ranking, rank) in rankings.iter_mut().zip(ranks_for_sorted(&keys)) {
        ranking.rank = rank;
    }

    rankings
}

/// Standings of one season read through the game repository
pub async fn season_standings(
    repo: &dyn GameRepository,
    season_id: &str,
) -> Result<Vec<SwissRanking>> {
    if repo.season(season_id).await?.is_none() {
        return Err(EngineError::SeasonNotFound {
            season_id: season_id.to_string(),
        }
        .into());
    }

    let games = repo.games(season_id).await?;
    let team_ids: Vec<TeamId> = repo
        .teams(season_id)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    Ok(calculate_swiss_rankings(&games, &team_ids))
}
