//! Block registry, result cache and invalidation.
//!
//! Every block is registered under a [`BlockKey`] with the set of filter
//! axes ([`BlockTrigger`]s) its result depends on. The [`BlockEngine`] keeps
//! one generation counter per axis; a filter change bumps the matching
//! counter via [`BlockEngine::invalidate`], and a cached result is reused
//! only while every axis it was computed under is still at the same
//! generation. Staleness is lazy: nothing recomputes until the block is
//! asked for again.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::aggregate::blocks;
use crate::aggregate::blocks::active_authors::ActiveAuthors;
use crate::aggregate::blocks::domains_stats::DomainsStats;
use crate::aggregate::blocks::emoji_stats::EmojiStats;
use crate::aggregate::blocks::interaction_stats::InteractionStats;
use crate::aggregate::blocks::language_stats::LanguageStats;
use crate::aggregate::blocks::messages_per_cycle::MessagesPerCycle;
use crate::aggregate::blocks::messages_stats::MessagesStats;
use crate::aggregate::blocks::sentiment_per_cycle::SentimentPerCycle;
use crate::aggregate::blocks::word_stats::{WordStats, WordStatsArgs};
use crate::aggregate::common::{CommonBlockData, compute_common_block_data};
use crate::database::Database;
use crate::error::{ChatstatsError, Result};
use crate::filters::Filters;

// ============================================================================
// Triggers
// ============================================================================

/// A filter axis a block result can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockTrigger {
    Authors,
    Channels,
    Time,
}

impl BlockTrigger {
    /// Number of axes; generation arrays are sized by this.
    pub const COUNT: usize = 3;

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Axes for blocks that react to every filter.
const ALL_TRIGGERS: &[BlockTrigger] = &[
    BlockTrigger::Authors,
    BlockTrigger::Channels,
    BlockTrigger::Time,
];

/// Axes for timeline blocks, which span the full date range and ignore the
/// time filter.
const TIMELINE_TRIGGERS: &[BlockTrigger] = &[BlockTrigger::Authors, BlockTrigger::Channels];

// ============================================================================
// Keys and arguments
// ============================================================================

/// Identifies one registered block.
///
/// The string form (see [`BlockKey::as_str`]) is what CLIs and reports use.
///
/// # Example
///
/// ```rust
/// use chatstats::aggregate::BlockKey;
///
/// let key: BlockKey = "messages-stats".parse().unwrap();
/// assert_eq!(key, BlockKey::MessagesStats);
/// assert_eq!(key.to_string(), "messages-stats");
/// assert!("message-stats".parse::<BlockKey>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKey {
    MessagesPerCycle,
    MessagesStats,
    ActiveAuthors,
    EmojiStats,
    InteractionStats,
    LanguageStats,
    SentimentPerCycle,
    DomainsStats,
    WordStats,
}

impl BlockKey {
    /// Every key, in registry order.
    pub const ALL: [BlockKey; 9] = [
        BlockKey::MessagesPerCycle,
        BlockKey::MessagesStats,
        BlockKey::ActiveAuthors,
        BlockKey::EmojiStats,
        BlockKey::InteractionStats,
        BlockKey::LanguageStats,
        BlockKey::SentimentPerCycle,
        BlockKey::DomainsStats,
        BlockKey::WordStats,
    ];

    /// The key's stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKey::MessagesPerCycle => "messages-per-cycle",
            BlockKey::MessagesStats => "messages-stats",
            BlockKey::ActiveAuthors => "active-authors",
            BlockKey::EmojiStats => "emoji-stats",
            BlockKey::InteractionStats => "interaction-stats",
            BlockKey::LanguageStats => "language-stats",
            BlockKey::SentimentPerCycle => "sentiment-per-cycle",
            BlockKey::DomainsStats => "domains-stats",
            BlockKey::WordStats => "word-stats",
        }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKey {
    type Err = ChatstatsError;

    fn from_str(s: &str) -> Result<Self> {
        BlockKey::ALL
            .iter()
            .find(|key| key.as_str() == s)
            .copied()
            .ok_or_else(|| ChatstatsError::unknown_block(s))
    }
}

/// Arguments for parameterized blocks.
///
/// Per-argument results are cached separately, so this is part of the cache
/// key. Blocks that take no arguments ignore it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum BlockArgs {
    #[default]
    None,
    WordStats(WordStatsArgs),
}

// ============================================================================
// Results
// ============================================================================

/// Any block's result.
///
/// Serializes untagged: JSON output contains the block's payload directly,
/// with the key carried alongside by whoever asked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockData {
    MessagesPerCycle(MessagesPerCycle),
    MessagesStats(MessagesStats),
    ActiveAuthors(ActiveAuthors),
    EmojiStats(EmojiStats),
    InteractionStats(InteractionStats),
    LanguageStats(LanguageStats),
    SentimentPerCycle(SentimentPerCycle),
    DomainsStats(DomainsStats),
    WordStats(WordStats),
}

// ============================================================================
// Registry
// ============================================================================

/// A block's compute function. Pure: reads the database through the given
/// filters, never mutates shared state.
pub type BlockFn = fn(&Database, &Filters, &CommonBlockData, &BlockArgs) -> Result<BlockData>;

/// One registered block.
#[derive(Debug, Clone, Copy)]
pub struct BlockDescriptor {
    pub key: BlockKey,
    /// Filter axes the result depends on.
    pub triggers: &'static [BlockTrigger],
    pub run: BlockFn,
}

/// The set of known blocks.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockDescriptor>,
}

impl BlockRegistry {
    /// An empty registry; see [`BlockRegistry::register`].
    #[must_use]
    pub fn new() -> Self {
        BlockRegistry { blocks: Vec::new() }
    }

    /// The full standard block set.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = BlockRegistry::new();
        registry.register(BlockDescriptor {
            key: BlockKey::MessagesPerCycle,
            triggers: TIMELINE_TRIGGERS,
            run: blocks::messages_per_cycle::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::MessagesStats,
            triggers: ALL_TRIGGERS,
            run: blocks::messages_stats::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::ActiveAuthors,
            triggers: TIMELINE_TRIGGERS,
            run: blocks::active_authors::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::EmojiStats,
            triggers: ALL_TRIGGERS,
            run: blocks::emoji_stats::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::InteractionStats,
            triggers: ALL_TRIGGERS,
            run: blocks::interaction_stats::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::LanguageStats,
            triggers: ALL_TRIGGERS,
            run: blocks::language_stats::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::SentimentPerCycle,
            triggers: TIMELINE_TRIGGERS,
            run: blocks::sentiment_per_cycle::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::DomainsStats,
            triggers: ALL_TRIGGERS,
            run: blocks::domains_stats::compute,
        });
        registry.register(BlockDescriptor {
            key: BlockKey::WordStats,
            triggers: ALL_TRIGGERS,
            run: blocks::word_stats::compute,
        });
        registry
    }

    /// Adds a block, replacing any previous descriptor under the same key.
    pub fn register(&mut self, descriptor: BlockDescriptor) {
        match self.blocks.iter_mut().find(|b| b.key == descriptor.key) {
            Some(slot) => *slot = descriptor,
            None => self.blocks.push(descriptor),
        }
    }

    #[must_use]
    pub fn get(&self, key: BlockKey) -> Option<&BlockDescriptor> {
        self.blocks.iter().find(|b| b.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockDescriptor> {
        self.blocks.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        BlockRegistry::standard()
    }
}

// ============================================================================
// Engine
// ============================================================================

struct CacheEntry {
    data: BlockData,
    /// Generation of each axis when the entry was computed.
    computed_at: [u64; BlockTrigger::COUNT],
}

/// Computes blocks on demand and caches their results.
///
/// The engine does not watch [`Filters`]; the owner of both reports filter
/// changes through [`BlockEngine::invalidate`]. An un-invalidated change is
/// invisible and a cached result is served as-is, which is exactly what the
/// aggregation worker relies on when it batches filter updates.
pub struct BlockEngine {
    registry: BlockRegistry,
    common: CommonBlockData,
    generations: [u64; BlockTrigger::COUNT],
    cache: HashMap<(BlockKey, BlockArgs), CacheEntry>,
}

impl BlockEngine {
    /// Builds an engine over one database.
    ///
    /// # Errors
    ///
    /// Fails if the shared per-database tables cannot be built.
    pub fn new(registry: BlockRegistry, database: &Database) -> Result<Self> {
        Ok(BlockEngine {
            registry,
            common: compute_common_block_data(database)?,
            generations: [0; BlockTrigger::COUNT],
            cache: HashMap::new(),
        })
    }

    /// The shared per-database tables.
    #[must_use]
    pub fn common(&self) -> &CommonBlockData {
        &self.common
    }

    #[must_use]
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Marks every cached result depending on `trigger` as stale.
    pub fn invalidate(&mut self, trigger: BlockTrigger) {
        self.generations[trigger.index()] += 1;
    }

    /// Returns the block's result, computing it only when missing or stale.
    ///
    /// # Errors
    ///
    /// [`ChatstatsError::UnknownBlock`] when `key` is not registered, or
    /// whatever the block itself returns. Failed computations are not
    /// cached.
    pub fn compute(
        &mut self,
        key: BlockKey,
        args: &BlockArgs,
        database: &Database,
        filters: &Filters,
    ) -> Result<&BlockData> {
        let descriptor = self
            .registry
            .get(key)
            .ok_or_else(|| ChatstatsError::unknown_block(key.as_str()))?;
        let (run, triggers) = (descriptor.run, descriptor.triggers);

        let entry = match self.cache.entry((key, args.clone())) {
            Entry::Occupied(mut slot) => {
                let stale = triggers
                    .iter()
                    .any(|t| slot.get().computed_at[t.index()] != self.generations[t.index()]);
                if stale {
                    let data = run(database, filters, &self.common, args)?;
                    slot.insert(CacheEntry {
                        data,
                        computed_at: self.generations,
                    });
                }
                slot.into_mut()
            }
            Entry::Vacant(slot) => {
                let data = run(database, filters, &self.common, args)?;
                slot.insert(CacheEntry {
                    data,
                    computed_at: self.generations,
                })
            }
        };
        Ok(&entry.data)
    }
}

// ============================================================================
// Tests
// ============================================================================
