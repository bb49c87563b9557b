//! Shared per-database tables for block computations.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::error::Result;
use crate::time::{TimeKeys, gen_time_keys};

/// Data shared by every block over one database, computed once per loaded
/// database instead of once per block run.
#[derive(Debug, Clone)]
pub struct CommonBlockData {
    /// Key tables over the database's full date range.
    pub time_keys: TimeKeys,
}

/// Builds the shared tables for `database`.
///
/// # Errors
///
/// Fails only if the database's day range cannot be enumerated, which
/// cannot happen for a builder-produced database.
pub fn compute_common_block_data(database: &Database) -> Result<CommonBlockData> {
    Ok(CommonBlockData {
        time_keys: gen_time_keys(database.time.min_day, database.time.max_day)?,
    })
}

/// A dictionary index paired with an aggregated value.
///
/// The usual shape for "per author" / "per emoji" summaries once zeroes are
/// dropped and the rest is sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub index: u32,
    pub value: u64,
}

/// One row of a per-day/week/month series, keyed by the period's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleCount {
    /// Date, week or month key (see [`crate::time::Day`]).
    pub key: String,
    pub value: u64,
}

impl CycleCount {
    /// A zero-valued row for the given period key.
    #[must_use]
    pub fn empty(key: &str) -> Self {
        CycleCount {
            key: key.to_string(),
            value: 0,
        }
    }
}

/// Zero-valued rows for a whole key table, ready to be counted into.
#[must_use]
pub fn empty_cycle(keys: &[String]) -> Vec<CycleCount> {
    keys.iter().map(|k| CycleCount::empty(k)).collect()
}
