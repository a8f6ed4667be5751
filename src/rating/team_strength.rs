//! Team strength aggregation from rosters and individual ratings

use crate::rating::state::PlayerTable;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Roster-average strength and how much of it is backed by real ratings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrength {
    pub rating: f64,
    /// Fraction of the roster with a known rating
    pub confidence: f64,
}

/// Average the current (already season-decayed) rating of each roster member
///
/// Players the table has never rated contribute `default_rating`.
pub fn team_strength(
    roster: &[PlayerId],
    table: &PlayerTable,
    default_rating: f64,
) -> TeamStrength {
    if roster.is_empty() {
        return TeamStrength {
            rating: default_rating,
            confidence: 0.0,
        };
    }

    let mut total = 0.0;
    let mut known = 0usize;
    for player_id in roster {
        match table.get(player_id).filter(|p| p.is_rated()) {
            Some(state) => {
                total += state.rating.mu;
                known += 1;
            }
            None => total += default_rating,
        }
    }

    TeamStrength {
        rating: total / roster.len() as f64,
        confidence: known as f64 / roster.len() as f64,
    }
}
