//! Inactivity decay applied at season transitions
//!
//! A dormant player's rating is pulled toward the starting value by
//! `factor^N` for N skipped seasons. The processor calls
//! `apply_season_transition` once per season change, never per game.

use crate::config::DecayConfig;
use crate::rating::state::PlayerTable;
use tracing::debug;

/// Rating after `seasons_inactive` skipped seasons
pub fn decayed_rating(current: f64, starting: f64, factor: f64, seasons_inactive: u32) -> f64 {
    starting + (current - starting) * factor.powi(seasons_inactive as i32)
}

/// Seasons strictly between the last played season and `season_index`
pub fn seasons_skipped(last_played_index: usize, season_index: usize) -> u32 {
    season_index.saturating_sub(last_played_index + 1) as u32
}

/// Outcome of one season transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecaySummary {
    pub decayed: usize,
    pub deactivated: usize,
}

/// Apply decay for the seasons newly skipped when moving from season
/// `previous_index` (or the start of the run) into `entering_index`
pub fn apply_season_transition(
    table: &mut PlayerTable,
    previous_index: Option<usize>,
    entering_index: usize,
    starting_mu: f64,
    config: &DecayConfig,
) -> DecaySummary {
    let mut summary = DecaySummary::default();

    for player in table.iter_mut() {
        let Some(last_played) = player.last_season_index else {
            continue;
        };

        let skipped_now = seasons_skipped(last_played, entering_index);
        let skipped_before = previous_index
            .map(|previous| seasons_skipped(last_played, previous))
            .unwrap_or(0);
        let newly_skipped = skipped_now.saturating_sub(skipped_before);

        if config.enabled && newly_skipped > 0 {
            player.rating.mu =
                decayed_rating(player.rating.mu, starting_mu, config.factor, newly_skipped);
            summary.decayed += 1;
        }

        if player.is_active && skipped_now > config.inactive_after_seasons {
            player.is_active = false;
            summary.deactivated += 1;
        }
    }

    debug!(
        "Season transition into index {}: {} players decayed, {} deactivated",
        entering_index, summary.decayed, summary.deactivated
    );

    summary
}
