//! Mentions, replies and reaction leaderboards.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::CommonBlockData;
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::codec::Message;
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// Length of the reaction leaderboards.
const TOP_LEN: usize = 3;

/// A fully decoded leaderboard entry.
///
/// `replied_to` is the quoted message when the entry is a reply. It is
/// decoded regardless of the active filters; a reply to an unselected
/// message still shows what it replied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMessage {
    pub channel_index: u32,
    /// Total or best-single reaction count, depending on the list.
    pub score: u64,
    pub message: Message,
    pub replied_to: Option<Message>,
}

/// Interaction totals over the selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionStats {
    /// Times each dictionary name was mentioned.
    pub mention_counts: Vec<u64>,
    /// Replies written per author.
    pub author_reply_counts: Vec<u64>,
    /// Messages with the most reactions in total.
    pub top_total_reactions: Vec<TopMessage>,
    /// Messages with the highest single-emoji reaction count.
    pub top_single_reactions: Vec<TopMessage>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    _common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let mut mention_counts = vec![0u64; database.mentions.len()];
    let mut author_reply_counts = vec![0u64; database.authors.len()];
    let mut total_candidates: Vec<TopMessage> = Vec::new();
    let mut single_candidates: Vec<TopMessage> = Vec::new();

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        if let Some(list) = view.mentions(reader) {
            for (index, count) in list {
                mention_counts[index as usize] += u64::from(count);
            }
        }
        if view.has_reply() {
            author_reply_counts[view.author_index as usize] += 1;
        }

        if let Some(reactions) = view.reactions(reader) {
            let total: u64 = reactions.iter().map(|&(_, n)| u64::from(n)).sum();
            let single = reactions.iter().map(|&(_, n)| u64::from(n)).max().unwrap_or(0);
            if total > 0 {
                let message = view.full_message(reader);
                let replied_to = view.reply(reader).map(|r| r.full_message(reader));
                total_candidates.push(TopMessage {
                    channel_index: view.channel_index,
                    score: total,
                    message: message.clone(),
                    replied_to: replied_to.clone(),
                });
                single_candidates.push(TopMessage {
                    channel_index: view.channel_index,
                    score: single,
                    message,
                    replied_to,
                });
            }
        }
    });

    Ok(BlockData::InteractionStats(InteractionStats {
        mention_counts,
        author_reply_counts,
        top_total_reactions: keep_top(total_candidates),
        top_single_reactions: keep_top(single_candidates),
    }))
}

/// Highest scores first, ties in scan order, capped at [`TOP_LEN`].
fn keep_top(mut candidates: Vec<TopMessage>) -> Vec<TopMessage> {
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates.truncate(TOP_LEN);
    candidates
}

// ============================================================================
// Tests
// ============================================================================
