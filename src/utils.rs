//! Utility functions for the rating engine

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique run ID
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique snapshot ID
pub fn generate_snapshot_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Integer comparison key of a value rounded to `digits` decimal digits
pub fn precision_key(value: f64, digits: u32) -> i64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() as i64
}
