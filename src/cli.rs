//! Command-line interface definition using clap.
//!
//! This module defines:
//! - [`Args`] - CLI argument structure (for use with clap)
//! - [`Block`] - Selectable statistics blocks
//! - [`OutputFormat`] - Output format options
//!
//! # Using Block and OutputFormat in Libraries
//!
//! These types are designed to be usable outside of CLI context:
//!
//! ```rust
//! use chatstats::aggregate::BlockKey;
//! use chatstats::cli::{Block, OutputFormat};
//!
//! // Block selections resolve to engine keys
//! assert_eq!(Block::MessagesStats.keys(), vec![BlockKey::MessagesStats]);
//! assert_eq!(Block::All.keys().len(), 9);
//!
//! // OutputFormat can be converted to/from strings
//! let format = OutputFormat::Csv;
//! println!("Format: {}", format); // "CSV"
//! ```

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::aggregate::BlockKey;

/// Compute filtered statistics blocks over packed chat archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatstats")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    chatstats archive.json messages-stats
    chatstats archive.json all -o report.json
    chatstats archive.json messages-per-cycle --format csv -o cycles.csv
    chatstats archive.json word-stats --word hello
    chatstats archive.json stats --channels general --after 2022-03-01
    chatstats archive.json sentiment --authors alice,bob --before 2022-04-01")]
pub struct Args {
    /// Path to the archive file (resolved-index JSON)
    pub input: String,

    /// Blocks to compute
    #[arg(value_enum, default_value = "all")]
    pub blocks: Vec<Block>,

    /// Path to output file (defaults to chatstats.<format>)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Only count messages in these channels (comma-separated names)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub channels: Vec<String>,

    /// Only count messages by these authors (comma-separated names)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub authors: Vec<String>,

    /// Ignore messages before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub after: Option<String>,

    /// Ignore messages after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub before: Option<String>,

    /// Word to track with the word-stats block
    #[arg(long, value_name = "WORD")]
    pub word: Option<String>,

    /// Print database statistics after loading
    #[arg(long)]
    pub stats: bool,
}

/// Selectable statistics blocks.
///
/// Mirrors [`BlockKey`] plus an `all` shorthand that expands to every
/// standard block. The dash-form names match the engine's block keys, so
/// output files are keyed consistently with what was asked for.
///
/// # Example
///
/// ```rust
/// use chatstats::cli::Block;
///
/// assert_eq!(Block::All.keys().len(), 9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Block {
    /// Every standard block
    All,

    /// Message counts per day/week/month
    #[value(alias = "cycle")]
    #[serde(alias = "cycle")]
    MessagesPerCycle,

    /// Totals, attachment breakdown and most active authors/channels
    #[value(alias = "stats")]
    #[serde(alias = "stats")]
    MessagesStats,

    /// Distinct authors per month
    #[value(alias = "active")]
    #[serde(alias = "active")]
    ActiveAuthors,

    /// Emoji usage in text and reactions
    #[value(alias = "emoji")]
    #[serde(alias = "emoji")]
    EmojiStats,

    /// Mentions, replies and top reacted messages
    #[value(alias = "interactions")]
    #[serde(alias = "interactions")]
    InteractionStats,

    /// Language and vocabulary breakdown
    #[value(alias = "languages")]
    #[serde(alias = "languages")]
    LanguageStats,

    /// Sentiment per week/month
    #[value(alias = "sentiment")]
    #[serde(alias = "sentiment")]
    SentimentPerCycle,

    /// Link counts per domain
    #[value(alias = "domains")]
    #[serde(alias = "domains")]
    DomainsStats,

    /// Usage of a single word (requires --word)
    #[value(alias = "word")]
    #[serde(alias = "word")]
    WordStats,
}

impl Block {
    /// Expands the selection into engine block keys.
    pub fn keys(self) -> Vec<BlockKey> {
        match self {
            Block::All => BlockKey::ALL.to_vec(),
            Block::MessagesPerCycle => vec![BlockKey::MessagesPerCycle],
            Block::MessagesStats => vec![BlockKey::MessagesStats],
            Block::ActiveAuthors => vec![BlockKey::ActiveAuthors],
            Block::EmojiStats => vec![BlockKey::EmojiStats],
            Block::InteractionStats => vec![BlockKey::InteractionStats],
            Block::LanguageStats => vec![BlockKey::LanguageStats],
            Block::SentimentPerCycle => vec![BlockKey::SentimentPerCycle],
            Block::DomainsStats => vec![BlockKey::DomainsStats],
            Block::WordStats => vec![BlockKey::WordStats],
        }
    }

    /// Returns all supported block names (without aliases).
    pub fn all_names() -> &'static [&'static str] {
        &[
            "all",
            "messages-per-cycle",
            "messages-stats",
            "active-authors",
            "emoji-stats",
            "interaction-stats",
            "language-stats",
            "sentiment-per-cycle",
            "domains-stats",
            "word-stats",
        ]
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Block::All => write!(f, "all"),
            _ => write!(f, "{}", self.keys()[0].as_str()),
        }
    }
}

impl std::str::FromStr for Block {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Block::All),
            "messages-per-cycle" | "cycle" => Ok(Block::MessagesPerCycle),
            "messages-stats" | "stats" => Ok(Block::MessagesStats),
            "active-authors" | "active" => Ok(Block::ActiveAuthors),
            "emoji-stats" | "emoji" => Ok(Block::EmojiStats),
            "interaction-stats" | "interactions" => Ok(Block::InteractionStats),
            "language-stats" | "languages" => Ok(Block::LanguageStats),
            "sentiment-per-cycle" | "sentiment" => Ok(Block::SentimentPerCycle),
            "domains-stats" | "domains" => Ok(Block::DomainsStats),
            "word-stats" | "word" => Ok(Block::WordStats),
            _ => Err(format!(
                "Unknown block: '{}'. Expected one of: {}",
                s,
                Block::all_names().join(", ")
            )),
        }
    }
}

/// Output format options.
///
/// Different formats serve different purposes:
/// - [`Json`](OutputFormat::Json) - Full nested results, any block
/// - [`Csv`](OutputFormat::Csv) - Flat tables, one block per file
///
/// # Example
///
/// ```rust
/// use chatstats::cli::OutputFormat;
///
/// let format = OutputFormat::Csv;
/// println!("Extension: {}", format.extension()); // "csv"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON object keyed by block name (default)
    #[default]
    Json,

    /// Semicolon-delimited CSV (single block only)
    Csv,
}

impl OutputFormat {
    /// Returns the file extension for this format (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }

    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["json", "csv"]
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Csv => "text/csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!(
                "Unknown format: '{}'. Expected one of: {}",
                s,
                OutputFormat::all_names().join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_display_matches_engine_keys() {
        assert_eq!(Block::All.to_string(), "all");
        assert_eq!(Block::MessagesPerCycle.to_string(), "messages-per-cycle");
        assert_eq!(Block::WordStats.to_string(), "word-stats");
        assert_eq!(
            Block::SentimentPerCycle.to_string(),
            BlockKey::SentimentPerCycle.as_str()
        );
    }

    #[test]
    fn test_block_from_str() {
        assert_eq!("all".parse::<Block>().unwrap(), Block::All);
        assert_eq!(
            "messages-stats".parse::<Block>().unwrap(),
            Block::MessagesStats
        );
        assert_eq!("stats".parse::<Block>().unwrap(), Block::MessagesStats);
        assert_eq!("emoji".parse::<Block>().unwrap(), Block::EmojiStats);
        assert_eq!("sentiment".parse::<Block>().unwrap(), Block::SentimentPerCycle);
        assert!("unknown".parse::<Block>().is_err());
    }

    #[test]
    fn test_block_all_expands_to_every_key() {
        assert_eq!(Block::All.keys(), BlockKey::ALL.to_vec());
        assert_eq!(Block::DomainsStats.keys(), vec![BlockKey::DomainsStats]);
    }

    #[test]
    fn test_format_extension() {
        assert_eq!(OutputFormat::Json.extension(), "json");
        assert_eq!(OutputFormat::Csv.extension(), "csv");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_block_serde() {
        let block = Block::MessagesPerCycle;
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, "\"messages-per-cycle\"");

        let parsed: Block = serde_json::from_str("\"sentiment\"").unwrap();
        assert_eq!(parsed, Block::SentimentPerCycle);
    }

    #[test]
    fn test_format_serde() {
        let format = OutputFormat::Csv;
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, "\"csv\"");
    }

    #[test]
    fn test_args_parse_defaults() {
        let args = Args::parse_from(["chatstats", "archive.json"]);
        assert_eq!(args.input, "archive.json");
        assert_eq!(args.blocks, vec![Block::All]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.output.is_none());
        assert!(args.channels.is_empty());
        assert!(!args.stats);
    }

    #[test]
    fn test_args_parse_filters() {
        let args = Args::parse_from([
            "chatstats",
            "archive.json",
            "messages-stats",
            "emoji-stats",
            "--channels",
            "general,random",
            "--authors",
            "alice",
            "--after",
            "2022-03-01",
            "--format",
            "csv",
        ]);
        assert_eq!(args.blocks, vec![Block::MessagesStats, Block::EmojiStats]);
        assert_eq!(args.channels, vec!["general", "random"]);
        assert_eq!(args.authors, vec!["alice"]);
        assert_eq!(args.after.as_deref(), Some("2022-03-01"));
        assert!(args.before.is_none());
        assert_eq!(args.format, OutputFormat::Csv);
    }
}
