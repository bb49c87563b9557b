//! Linked-domain counters.

use serde::{Deserialize, Serialize};

use crate::aggregate::common::CommonBlockData;
use crate::aggregate::engine::{BlockArgs, BlockData};
use crate::aggregate::helpers::{ActiveAxes, filter_messages};
use crate::database::Database;
use crate::error::Result;
use crate::filters::Filters;

/// Who links what, and where. All vectors are dense over the dictionaries;
/// author and channel rows count linked domains, not messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsStats {
    pub domain_counts: Vec<u64>,
    pub author_counts: Vec<u64>,
    pub channel_counts: Vec<u64>,
}

pub(crate) fn compute(
    database: &Database,
    filters: &Filters,
    _common: &CommonBlockData,
    _args: &BlockArgs,
) -> Result<BlockData> {
    let mut stats = DomainsStats {
        domain_counts: vec![0; database.domains.len()],
        author_counts: vec![0; database.authors.len()],
        channel_counts: vec![0; database.channels.len()],
    };

    filter_messages(database, filters, ActiveAxes::ALL, |view, reader| {
        let Some(list) = view.domains(reader) else {
            return;
        };
        for (index, count) in list {
            let count = u64::from(count);
            stats.domain_counts[index as usize] += count;
            stats.author_counts[view.author_index as usize] += count;
            stats.channel_counts[view.channel_index as usize] += count;
        }
    });

    Ok(BlockData::DomainsStats(stats))
}

// ============================================================================
// Tests
// ============================================================================
