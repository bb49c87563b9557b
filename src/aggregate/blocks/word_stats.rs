//! Per-word usage, the one parameterized block.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::{CommonBlockData, CycleCount, empty_cycle};
use crate::aggregate::engine::{BlockArgs, BlockData, BlockKey};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::{ChatstatsError, Result};
use crate::filters::Filters;

/// Selects the word to drill into. Part of the cache key, so results for
/// different words coexist in the block cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordStatsArgs {
    /// Index into the word dictionary.
    pub word_index: u32,
}

/// Usage of a single dictionary word across the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordStats {
    pub word_index: u32,
    pub total: u64,
    pub per_month: Vec<CycleCount>,
    pub author_counts: Vec<u64>,
    pub channel_counts: Vec<u64>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    common: &CommonBlockData,
    args: &BlockArgs,
) -> Result<BlockData> {
    let BlockArgs::WordStats(args) = args else {
        return Err(ChatstatsError::invalid_block_args(
            BlockKey::WordStats.as_str(),
        ));
    };
    if args.word_index as usize >= database.words.len() {
        return Err(ChatstatsError::invalid_block_args(
            BlockKey::WordStats.as_str(),
        ));
    }

    let keys = &common.time_keys;
    let mut stats = WordStats {
        word_index: args.word_index,
        total: 0,
        per_month: empty_cycle(&keys.month_keys),
        author_counts: vec![0; database.authors.len()],
        channel_counts: vec![0; database.channels.len()],
    };

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        let Some(list) = view.words(reader) else {
            return;
        };
        let Some(&(_, count)) = list.iter().find(|&&(i, _)| i == args.word_index) else {
            return;
        };
        let count = u64::from(count);
        stats.total += count;
        stats.per_month[keys.date_to_month[view.day_index as usize]].value += count;
        stats.author_counts[view.author_index as usize] += count;
        stats.channel_counts[view.channel_index as usize] += count;
    });

    Ok(BlockData::WordStats(stats))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::blocks::fixtures::fixture_context;

    fn run(filters: &Filters, word_index: u32) -> WordStats {
        let (database, _, common) = fixture_context();
        let args = BlockArgs::WordStats(WordStatsArgs { word_index });
        let data = compute(&database, filters, &common, &args).unwrap();
        let BlockData::WordStats(data) = data else {
            panic!("wrong variant");
        };
        data
    }

    fn month_values(stats: &WordStats) -> Vec<u64> {
        stats.per_month.iter().map(|c| c.value).collect()
    }

    #[test]
    fn tracks_one_word_through_the_selection() {
        let (_, filters, _) = fixture_context();
        let stats = run(&filters, 0);

        assert_eq!(stats.word_index, 0);
        assert_eq!(stats.total, 3);
        assert_eq!(month_values(&stats), vec![2, 1]);
        assert_eq!(stats.author_counts, vec![3, 0, 0]);
        assert_eq!(stats.channel_counts, vec![3, 0]);
    }

    #[test]
    fn different_words_give_different_series() {
        let (_, filters, _) = fixture_context();
        let stats = run(&filters, 1);

        assert_eq!(stats.total, 4);
        assert_eq!(month_values(&stats), vec![1, 3]);
        assert_eq!(stats.author_counts, vec![1, 3, 0]);
        assert_eq!(stats.channel_counts, vec![1, 3]);
    }

    #[test]
    fn respects_the_time_filter() {
        let (_, mut filters, _) = fixture_context();
        filters.update_start_date("2022-04-01").unwrap();
        let stats = run(&filters, 0);

        assert_eq!(stats.total, 1);
        assert_eq!(month_values(&stats), vec![0, 1]);
    }

    #[test]
    fn rejects_missing_args() {
        let (database, filters, common) = fixture_context();
        let err = compute(&database, &filters, &common, &BlockArgs::None).unwrap_err();
        assert!(err.is_invalid_block_args());
    }

    #[test]
    fn rejects_a_word_outside_the_dictionary() {
        let (database, filters, common) = fixture_context();
        let args = BlockArgs::WordStats(WordStatsArgs { word_index: 99 });
        let err = compute(&database, &filters, &common, &args).unwrap_err();
        assert!(err.is_invalid_block_args());
    }
}
