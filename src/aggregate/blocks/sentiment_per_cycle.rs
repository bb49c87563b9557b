//! Sentiment split per week and month.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::CommonBlockData;
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// One period of the sentiment series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCycleRow {
    /// Week or month key.
    pub key: String,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    /// `positive - negative`, the series most charts want directly.
    pub diff: i64,
}

impl SentimentCycleRow {
    fn empty(key: &str) -> Self {
        SentimentCycleRow {
            key: key.to_string(),
            positive: 0,
            negative: 0,
            neutral: 0,
            diff: 0,
        }
    }
}

/// Sentiment of text messages over time. Non-text messages are skipped.
///
/// A timeline block: the series spans the full date range and the time
/// filter is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentPerCycle {
    pub positive_messages: u64,
    pub negative_messages: u64,
    pub neutral_messages: u64,
    pub per_week: Vec<SentimentCycleRow>,
    pub per_month: Vec<SentimentCycleRow>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let keys = &common.time_keys;
    let empty_rows = |period_keys: &[String]| -> Vec<SentimentCycleRow> {
        period_keys.iter().map(|k| SentimentCycleRow::empty(k)).collect()
    };

    let mut stats = SentimentPerCycle {
        positive_messages: 0,
        negative_messages: 0,
        neutral_messages: 0,
        per_week: empty_rows(&keys.week_keys),
        per_month: empty_rows(&keys.month_keys),
    };

    filter_messages(database, filters, ActiveAxes::IGNORE_TIME, |view, _reader| {
        let Some(text) = view.text else {
            return;
        };
        let day = view.day_index as usize;
        let week = &mut stats.per_week[keys.date_to_week[day]];
        let month_index = keys.date_to_month[day];

        if text.sentiment > 0 {
            stats.positive_messages += 1;
            week.positive += 1;
            stats.per_month[month_index].positive += 1;
        } else if text.sentiment < 0 {
            stats.negative_messages += 1;
            week.negative += 1;
            stats.per_month[month_index].negative += 1;
        } else {
            stats.neutral_messages += 1;
            week.neutral += 1;
            stats.per_month[month_index].neutral += 1;
        }
    });

    for row in stats.per_week.iter_mut().chain(stats.per_month.iter_mut()) {
        row.diff = row.positive as i64 - row.negative as i64;
    }

    Ok(BlockData::SentimentPerCycle(stats))
}

// ============================================================================
// Tests
// ============================================================================
