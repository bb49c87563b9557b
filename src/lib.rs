//! # Chatstats
//!
//! A Rust library for packing chat exports into a compact bit-level database
//! and computing filtered statistics over it interactively.
//!
//! ## Overview
//!
//! Chat exports are repetitive: a year of messages references the same few
//! channels, authors and words over and over. Chatstats stores every
//! cross-reference as a dictionary index packed at exactly the bit width the
//! dictionary needs, which brings a message down to a few dozen bits. On top
//! of that stream sits an aggregation engine: statistics *blocks* scan the
//! packed messages through lazy views, honor the active channel/author/date
//! filters, and cache their results until a filter axis they depend on
//! actually changes.
//!
//! ## Quick Start
//!
//! ```rust
//! use chatstats::aggregate::{BlockArgs, BlockData, BlockEngine, BlockKey, BlockRegistry};
//! use chatstats::database::{Author, DatabaseBuilder, RawMessage};
//! use chatstats::filters::Filters;
//! use chatstats::time::Day;
//!
//! fn main() -> chatstats::Result<()> {
//!     // Pack two messages into a bit-level database
//!     let mut builder = DatabaseBuilder::new("team chat")
//!         .with_channels(vec!["general".to_string()])
//!         .with_authors(vec![Author { name: "alice".to_string(), bot: false }]);
//!     builder.add_message(0, &RawMessage {
//!         day: Day::new(2022, 3, 28),
//!         hour: 9,
//!         ..RawMessage::default()
//!     })?;
//!     builder.add_message(0, &RawMessage {
//!         day: Day::new(2022, 3, 29),
//!         hour: 10,
//!         ..RawMessage::default()
//!     })?;
//!     let database = builder.build()?;
//!
//!     // Ask the engine for a block; the result is cached until a filter
//!     // axis the block depends on changes
//!     let filters = Filters::new(&database)?;
//!     let mut engine = BlockEngine::new(BlockRegistry::standard(), &database)?;
//!     let data = engine.compute(BlockKey::MessagesStats, &BlockArgs::None, &database, &filters)?;
//!     if let BlockData::MessagesStats(stats) = data {
//!         assert_eq!(stats.total, 2);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Background Aggregation
//!
//! Interactive frontends keep the engine on a worker thread and talk to it
//! over channels; see [`aggregate::AggregateWorker`]. Filter changes ride on
//! block requests, and requests made stale by later ones in the same batch
//! are answered without being computed.
//!
//! ## Module Structure
//!
//! - [`bits`] — bit stream, cursor and checkpoint primitives
//!   - [`BitStream`](bits::BitStream), [`BitReader`](bits::BitReader)
//! - [`indexed`] — codec for `(index, count)` lists
//! - [`codec`] — message wire format
//!   - [`Message`](codec::Message) — full decode
//!   - [`MessageView`](codec::MessageView) — lazy decode for scans
//! - [`time`] — [`Day`](time::Day), day/week/month keys
//! - [`database`] — [`DatabaseBuilder`](database::DatabaseBuilder) and the
//!   packed [`Database`]
//! - [`filters`] — [`Filters`](filters::Filters) query predicate
//! - [`aggregate`] — statistics blocks, cache engine, worker thread
//! - [`archive`] — JSON archive load/save (feature `json-io`)
//! - [`export`] — CSV export of block results (feature `csv-output`)
//! - [`cli`] — CLI types (feature `cli`)
//! - [`error`] — unified error types ([`ChatstatsError`], [`Result`])
//! - [`progress`] — progress reporting for long packing runs
//! - [`prelude`] — convenient re-exports
//!
//! ## Feature Flags
//!
//! - `full` (default) — `json-io` + `csv-output` + `cli`
//! - `json-io` — [`archive`]: resolved-index JSON archives
//! - `csv-output` — [`export`]: block results as CSV tables
//! - `cli` — the `chatstats` binary
//! - `gen-test` — the `gen_test` synthetic archive generator

pub mod aggregate;
#[cfg(feature = "json-io")]
pub mod archive;
pub mod bits;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod database;
pub mod error;
#[cfg(feature = "csv-output")]
pub mod export;
pub mod filters;
pub mod indexed;
pub mod progress;
pub mod time;

// Re-export the main types at the crate root for convenience
pub use database::Database;
pub use error::{ChatstatsError, Result};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use chatstats::prelude::*;
/// ```
pub mod prelude {
    // Central database types
    pub use crate::database::{Author, Database, DatabaseBuilder, RawMessage};

    // Error types
    pub use crate::error::{ChatstatsError, Result};

    // Message codec
    pub use crate::codec::{AttachmentKind, Message, MessageView, TextInfo};

    // Calendar keys
    pub use crate::time::Day;

    // Query predicate
    pub use crate::filters::Filters;

    // Aggregation engine and worker
    pub use crate::aggregate::{
        AggregateWorker, BlockArgs, BlockData, BlockEngine, BlockKey, BlockRegistry, BlockRequest,
        BlockResult, BlockState, FilterPatch,
    };

    // Archive I/O
    #[cfg(feature = "json-io")]
    pub use crate::archive::{Archive, ArchiveChannel};

    // CSV export
    #[cfg(feature = "csv-output")]
    pub use crate::export::{block_to_csv, save_block_csv, write_block_csv};

    // CLI types
    #[cfg(feature = "cli")]
    pub use crate::cli::{Block, OutputFormat};
}
