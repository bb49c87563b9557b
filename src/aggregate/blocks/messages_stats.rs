//! Headline totals for the current selection.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::{CommonBlockData, IndexEntry};
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::codec::AttachmentKind;
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// Length of the `top_*` leaderboards.
const TOP_LEN: usize = 5;

/// Counts and leaderboards over the selected messages.
///
/// `author_counts` and `channel_counts` are dense, indexed by dictionary
/// position; `attachment_counts` is sparse, indexed by
/// [`AttachmentKind`] wire index with zero kinds dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesStats {
    pub total: u64,
    pub with_text: u64,
    /// Messages carrying at least one linked domain.
    pub with_links: u64,
    pub edited: u64,
    /// Days in the range with at least one selected message.
    pub num_active_days: u64,
    pub attachment_counts: Vec<IndexEntry>,
    pub author_counts: Vec<u64>,
    pub channel_counts: Vec<u64>,
    pub top_authors: Vec<IndexEntry>,
    pub top_channels: Vec<IndexEntry>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let mut stats = MessagesStats {
        total: 0,
        with_text: 0,
        with_links: 0,
        edited: 0,
        num_active_days: 0,
        attachment_counts: Vec::new(),
        author_counts: vec![0; database.authors.len()],
        channel_counts: vec![0; database.channels.len()],
        top_authors: Vec::new(),
        top_channels: Vec::new(),
    };
    let mut attachments = [0u64; AttachmentKind::COUNT];
    let mut active_days = vec![false; common.time_keys.num_days()];

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        stats.total += 1;
        if view.has_text() {
            stats.with_text += 1;
        }
        if view.has_domains() {
            stats.with_links += 1;
        }
        if view.has_edits() {
            stats.edited += 1;
        }
        stats.author_counts[view.author_index as usize] += 1;
        stats.channel_counts[view.channel_index as usize] += 1;
        active_days[view.day_index as usize] = true;

        if let Some(list) = view.attachments(reader) {
            for (index, count) in list {
                let kind = AttachmentKind::from_index(index).index() as usize;
                attachments[kind] += u64::from(count);
            }
        }
    });

    stats.num_active_days = active_days.iter().filter(|&&active| active).count() as u64;
    stats.attachment_counts = attachments
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(index, &count)| IndexEntry {
            index: index as u32,
            value: count,
        })
        .collect();
    stats.top_authors = top_entries(&stats.author_counts);
    stats.top_channels = top_entries(&stats.channel_counts);

    Ok(BlockData::MessagesStats(stats))
}

/// Non-zero counters as `(index, value)` pairs, highest first, capped at
/// [`TOP_LEN`]. Ties keep dictionary order.
fn top_entries(counts: &[u64]) -> Vec<IndexEntry> {
    let mut entries: Vec<IndexEntry> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value > 0)
        .map(|(index, &value)| IndexEntry {
            index: index as u32,
            value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value));
    entries.truncate(TOP_LEN);
    entries
}

// ============================================================================
// Tests
// ============================================================================
