//! Message totals per day, week and month.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::{CommonBlockData, CycleCount, empty_cycle};
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// The activity timeline: how many selected messages fall in each day, week
/// and month of the database's date range.
///
/// The time filter is ignored here on purpose. Date-range selection is drawn
/// *over* this series, so the series itself always spans the full range and
/// every key list lines up with [`TimeKeys`](crate::time::TimeKeys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesPerCycle {
    pub per_day: Vec<CycleCount>,
    pub per_week: Vec<CycleCount>,
    pub per_month: Vec<CycleCount>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let keys = &common.time_keys;
    let mut per_day = empty_cycle(&keys.date_keys);
    let mut per_week = empty_cycle(&keys.week_keys);
    let mut per_month = empty_cycle(&keys.month_keys);

    filter_messages(database, filters, ActiveAxes::IGNORE_TIME, |view, _reader| {
        let day = view.day_index as usize;
        per_day[day].value += 1;
        per_week[keys.date_to_week[day]].value += 1;
        per_month[keys.date_to_month[day]].value += 1;
    });

    Ok(BlockData::MessagesPerCycle(MessagesPerCycle {
        per_day,
        per_week,
        per_month,
    }))
}

// ============================================================================
// Tests
// ============================================================================
