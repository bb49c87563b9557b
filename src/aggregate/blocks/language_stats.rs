//! Language distribution and word totals.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::{CommonBlockData, IndexEntry};
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// Language spread plus word totals over the selected text messages.
///
/// `languages` drops zero rows, folds languages rarer than 0.1% of the text
/// messages into the index-0 ("unknown") row and sorts the rest by count.
/// `word_counts` stays dense so per-word blocks and exports can index it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub languages: Vec<IndexEntry>,
    pub total_words: u64,
    /// Distinct words used at least once.
    pub unique_words: u64,
    /// Mean words per text message, `0.0` when nothing is selected.
    pub avg_words_per_message: f64,
    pub word_counts: Vec<u64>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    _common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let mut lang_counts = vec![0u64; database.languages.len()];
    let mut word_counts = vec![0u64; database.words.len()];
    let mut text_messages = 0u64;
    let mut total_words = 0u64;

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        let Some(text) = view.text else {
            return;
        };
        text_messages += 1;
        lang_counts[text.lang_index as usize] += 1;

        if let Some(list) = view.words(reader) {
            for (index, count) in list {
                total_words += u64::from(count);
                word_counts[index as usize] += u64::from(count);
            }
        }
    });

    let unique_words = word_counts.iter().filter(|&&c| c > 0).count() as u64;
    let avg_words_per_message = if text_messages == 0 {
        0.0
    } else {
        total_words as f64 / text_messages as f64
    };

    // Languages below one message per thousand fold into "unknown".
    let threshold = (text_messages / 1000).max(1);
    let mut folded = 0u64;
    let mut languages: Vec<IndexEntry> = Vec::new();
    for (index, &count) in lang_counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if index == 0 || count < threshold {
            folded += count;
        } else {
            languages.push(IndexEntry {
                index: index as u32,
                value: count,
            });
        }
    }
    if folded > 0 {
        languages.push(IndexEntry {
            index: 0,
            value: folded,
        });
    }
    languages.sort_by(|a, b| b.value.cmp(&a.value));

    Ok(BlockData::LanguageStats(LanguageStats {
        languages,
        total_words,
        unique_words,
        avg_words_per_message,
        word_counts,
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::blocks::fixtures::fixture_context;
    use crate::aggregate::common::compute_common_block_data;
    use crate::codec::TextInfo;
    use crate::database::{Author, DatabaseBuilder, RawMessage};
    use crate::time::Day;

    fn run(filters: &Filters) -> LanguageStats {
        let (database, _, common) = fixture_context();
        let data = compute(&database, filters, &common, &BlockArgs::None).unwrap();
        let BlockData::LanguageStats(data) = data else {
            panic!("wrong variant");
        };
        data
    }

    fn entry(index: u32, value: u64) -> IndexEntry {
        IndexEntry { index, value }
    }

    #[test]
    fn tallies_languages_and_words() {
        let (_, filters, _) = fixture_context();
        let stats = run(&filters);

        assert_eq!(stats.languages, vec![entry(1, 3), entry(2, 1)]);
        assert_eq!(stats.total_words, 10);
        assert_eq!(stats.unique_words, 3);
        assert_eq!(stats.word_counts, vec![3, 4, 3]);
        assert!((stats.avg_words_per_message - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_selection_yields_zeroes() {
        let (_, mut filters, _) = fixture_context();
        // Only the bot, which never writes text.
        filters.update_authors(&[2]);
        let stats = run(&filters);

        assert!(stats.languages.is_empty());
        assert_eq!(stats.total_words, 0);
        assert_eq!(stats.unique_words, 0);
        assert_eq!(stats.avg_words_per_message, 0.0);
    }

    #[test]
    fn respects_the_channel_filter() {
        let (_, mut filters, _) = fixture_context();
        filters.update_channels(vec![1]);
        let stats = run(&filters);

        assert_eq!(stats.languages, vec![entry(1, 1)]);
        assert_eq!(stats.word_counts, vec![0, 3, 0]);
        assert!((stats.avg_words_per_message - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rare_languages_fold_into_unknown() {
        let mut builder = DatabaseBuilder::new("langs")
            .with_channels(vec!["main".to_string()])
            .with_authors(vec![Author {
                name: "a".to_string(),
                bot: false,
            }])
            .with_languages(vec![
                "unknown".to_string(),
                "common".to_string(),
                "rare".to_string(),
            ]);
        for i in 0..2000u32 {
            let lang_index = if i == 0 { 2 } else { 1 };
            builder
                .add_message(
                    0,
                    &RawMessage {
                        day: Day::new(2022, 1, 1),
                        author_index: 0,
                        text: Some(TextInfo {
                            sentiment: 0,
                            lang_index,
                        }),
                        ..RawMessage::default()
                    },
                )
                .unwrap();
        }
        let database = builder.build().unwrap();
        let filters = Filters::new(&database).unwrap();
        let common = compute_common_block_data(&database).unwrap();

        let data = compute(&database, &filters, &common, &BlockArgs::None).unwrap();
        let BlockData::LanguageStats(stats) = data else {
            panic!("wrong variant");
        };
        // 2000 text messages put the cutoff at two; the single "rare"
        // message lands in the unknown row.
        assert_eq!(stats.languages, vec![entry(1, 1999), entry(0, 1)]);
    }
}
