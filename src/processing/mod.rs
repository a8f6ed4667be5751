//! Chronological replay of the game log
//!
//! Loading and round grouping, calculated-round tracking, weekly snapshots
//! and the processor state machine that ties them together.

pub mod loader;
pub mod processor;
pub mod request;
pub mod rounds;
pub mod snapshot;
pub mod tracker;

pub use loader::{load_games, LoadedGame, LoadedGames, SeasonTimeline};
pub use processor::{ChronologicalProcessor, Repositories};
pub use request::{
    CancellationHandle, ProcessorState, RunRequest, RunSummary, SkipReason, SkippedGame,
};
pub use rounds::{group_rounds, Round};
pub use snapshot::{ResumePoint, WeekAccumulator};
pub use tracker::RoundTracker;
