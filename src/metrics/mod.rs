//! Metrics for calculation runs
//!
//! Counters and timings are recorded into a Prometheus registry owned by the
//! caller. Nothing here serves them; exporting is left to the embedding
//! process.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, PersistenceMetrics, RunMetrics};
