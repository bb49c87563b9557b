//! Emoji usage, split between message text and reactions.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::CommonBlockData;
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// Counters for one emoji source. All vectors are dense over the database
/// dictionaries (`emoji_counts` by emoji index, and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiGroup {
    /// Total emoji occurrences.
    pub total: u64,
    /// Distinct emojis seen at least once.
    pub unique: u64,
    /// Messages contributing at least one emoji, each counted once no
    /// matter how many emojis it carries.
    pub messages_with_emoji: u64,
    pub emoji_counts: Vec<u64>,
    pub author_counts: Vec<u64>,
    pub channel_counts: Vec<u64>,
}

impl EmojiGroup {
    fn sized(database: &Database) -> Self {
        EmojiGroup {
            total: 0,
            unique: 0,
            messages_with_emoji: 0,
            emoji_counts: vec![0; database.emojis.len()],
            author_counts: vec![0; database.authors.len()],
            channel_counts: vec![0; database.channels.len()],
        }
    }

    fn tally(&mut self, list: &[(u32, u32)], author: u32, channel: u32) {
        let mut added = 0u64;
        for &(index, count) in list {
            let count = u64::from(count);
            self.emoji_counts[index as usize] += count;
            added += count;
        }
        if added > 0 {
            self.total += added;
            self.messages_with_emoji += 1;
            self.author_counts[author as usize] += added;
            self.channel_counts[channel as usize] += added;
        }
    }

    fn finish(&mut self) {
        self.unique = self.emoji_counts.iter().filter(|&&c| c > 0).count() as u64;
    }
}

/// Emoji statistics over the selection. Text emojis and reaction emojis
/// share the dictionary but are tallied separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiStats {
    pub in_text: EmojiGroup,
    pub in_reactions: EmojiGroup,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    _common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let mut in_text = EmojiGroup::sized(database);
    let mut in_reactions = EmojiGroup::sized(database);

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        if let Some(list) = view.emojis(reader) {
            in_text.tally(&list, view.author_index, view.channel_index);
        }
        if let Some(list) = view.reactions(reader) {
            in_reactions.tally(&list, view.author_index, view.channel_index);
        }
    });

    in_text.finish();
    in_reactions.finish();

    Ok(BlockData::EmojiStats(EmojiStats {
        in_text,
        in_reactions,
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
    use crate::database::{Author, DatabaseBuilder, RawMessage};
    use crate::time::Day;

    fn run(filters: &Filters) -> EmojiStats {
        let (database, _, common) = fixture_context();
        let data = compute(&database, filters, &common, &BlockArgs::None).unwrap();
        let BlockData::EmojiStats(data) = data else {
            panic!("wrong variant");
        };
        data
    }

    #[test]
    fn splits_text_and_reaction_tallies() {
        let (_, filters, _) = fixture_context();
        let stats = run(&filters);

        assert_eq!(stats.in_text.total, 3);
        assert_eq!(stats.in_text.unique, 2);
        assert_eq!(stats.in_text.messages_with_emoji, 2);
        assert_eq!(stats.in_text.emoji_counts, vec![2, 1]);
        assert_eq!(stats.in_text.author_counts, vec![0, 2, 1]);
        assert_eq!(stats.in_text.channel_counts, vec![2, 1]);

        assert_eq!(stats.in_reactions.total, 4);
        assert_eq!(stats.in_reactions.unique, 2);
        assert_eq!(stats.in_reactions.messages_with_emoji, 2);
        assert_eq!(stats.in_reactions.emoji_counts, vec![1, 3]);
        assert_eq!(stats.in_reactions.author_counts, vec![3, 1, 0]);
        assert_eq!(stats.in_reactions.channel_counts, vec![3, 1]);
    }

    #[test]
    fn respects_the_author_filter() {
        let (_, mut filters, _) = fixture_context();
        filters.update_authors(&[1]);
        let stats = run(&filters);

        assert_eq!(stats.in_text.total, 2);
        assert_eq!(stats.in_text.unique, 1);
        assert_eq!(stats.in_text.emoji_counts, vec![2, 0]);
        assert_eq!(stats.in_reactions.total, 1);
        assert_eq!(stats.in_reactions.emoji_counts, vec![1, 0]);
    }

    #[test]
    fn multi_emoji_message_counts_once() {
        let mut builder = DatabaseBuilder::new("emoji")
            .with_channels(vec!["main".to_string()])
            .with_authors(vec![Author {
                name: "a".to_string(),
                bot: false,
            }])
            .with_emojis(vec!["one".to_string(), "two".to_string()]);
        builder
            .add_message(
                0,
                &RawMessage {
                    day: Day::new(2022, 1, 1),
                    author_index: 0,
                    emojis: vec![(0, 1), (1, 2)],
                    ..RawMessage::default()
                },
            )
            .unwrap();
        let database = builder.build().unwrap();
        let filters = Filters::new(&database).unwrap();
        let common = compute_common_block_data(&database).unwrap();

        let data = compute(&database, &filters, &common, &BlockArgs::None).unwrap();
        let BlockData::EmojiStats(stats) = data else {
            panic!("wrong variant");
        };
        assert_eq!(stats.in_text.messages_with_emoji, 1);
        assert_eq!(stats.in_text.total, 3);
        assert_eq!(stats.in_text.unique, 2);
    }
}
