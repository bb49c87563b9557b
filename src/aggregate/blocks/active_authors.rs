//! Distinct active authors per month.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::aggregate::common::{CommonBlockData, CycleCount};
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// How many distinct selected authors wrote at least one message in each
/// month. A timeline block, so the time filter is ignored (see
/// [`MessagesPerCycle`](crate::aggregate::MessagesPerCycle)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAuthors {
    pub per_month: Vec<CycleCount>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let keys = &common.time_keys;
    let mut seen: Vec<HashSet<u32>> = vec![HashSet::new(); keys.month_keys.len()];

    filter_messages(database, filters, ActiveAxes::IGNORE_TIME, |view, _reader| {
        let month = keys.date_to_month[view.day_index as usize];
        seen[month].insert(view.author_index);
    });

    let per_month = keys
        .month_keys
        .iter()
        .zip(&seen)
        .map(|(key, authors)| CycleCount {
            key: key.clone(),
            value: authors.len() as u64,
        })
        .collect();

    Ok(BlockData::ActiveAuthors(ActiveAuthors { per_month }))
}

// ============================================================================
// Tests
// ============================================================================
