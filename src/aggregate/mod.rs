//! Filtered aggregation over a packed database.
//!
//! Statistics are organized as *blocks*: independent, pure computations
//! keyed by [`BlockKey`], each scanning the selected messages through
//! [`filter_messages`] and returning one [`BlockData`] payload. The
//! [`BlockEngine`] caches results per key and argument set and re-runs a
//! block only when a filter axis it depends on was invalidated; the
//! [`AggregateWorker`] runs an engine on its own thread behind a
//! request/result channel pair, which is the shape interactive frontends
//! want.
//!
//! Blocks that draw the activity timeline ignore the date-range filter on
//! purpose, so the timeline the range is brushed on never narrows to the
//! brush itself.

pub mod blocks;
pub mod common;
pub mod engine;
pub mod helpers;
pub mod worker;

pub use blocks::active_authors::ActiveAuthors;
pub use blocks::domains_stats::DomainsStats;
pub use blocks::emoji_stats::{EmojiGroup, EmojiStats};
pub use blocks::interaction_stats::{InteractionStats, TopMessage};
pub use blocks::language_stats::LanguageStats;
pub use blocks::messages_per_cycle::MessagesPerCycle;
pub use blocks::messages_stats::MessagesStats;
pub use blocks::sentiment_per_cycle::{SentimentCycleRow, SentimentPerCycle};
pub use blocks::word_stats::{WordStats, WordStatsArgs};
pub use common::{CommonBlockData, CycleCount, IndexEntry, compute_common_block_data, empty_cycle};
pub use engine::{
    BlockArgs, BlockData, BlockDescriptor, BlockEngine, BlockFn, BlockKey, BlockRegistry,
    BlockTrigger,
};
pub use helpers::{ActiveAxes, filter_messages};
pub use worker::{AggregateWorker, BlockRequest, BlockResult, BlockState, FilterPatch};
