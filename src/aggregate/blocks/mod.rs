//! The standard block set.
//!
//! Each submodule holds one block: its result types and its compute
//! function. Blocks are pure; they read the database through the traversal
//! primitive and return a serializable result. Registration lives in
//! [`BlockRegistry::standard`](crate::aggregate::BlockRegistry::standard).

pub mod active_authors;
pub mod domains_stats;
pub mod emoji_stats;
pub mod interaction_stats;
pub mod language_stats;
pub mod messages_per_cycle;
pub mod messages_stats;
pub mod sentiment_per_cycle;
pub mod word_stats;
