//! Ranking assignment, persistence and Swiss standings

pub mod competition;
pub mod persistence;
pub mod swiss;

pub use competition::{competition_ranks, ranks_for_sorted};
pub use persistence::{build_documents, rankings_reflect, RankingPersister};
pub use swiss::{calculate_swiss_rankings, season_standings, SwissRanking};
