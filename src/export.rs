//! CSV export of block results.
//!
//! Every block result flattens to a small semicolon-delimited table. Series
//! blocks keep one row per period; count tables resolve dictionary indices
//! to names through the [`Database`] and omit zero rows. Nested payloads
//! that have no tabular shape, such as the ranked message lists of
//! `interaction-stats`, stay JSON-only.
//!
//! # Examples
//!
//! ```
//! use chatstats::aggregate::{BlockData, CycleCount, MessagesPerCycle};
//! use chatstats::database::{Author, DatabaseBuilder, RawMessage};
//! use chatstats::export::block_to_csv;
//! use chatstats::time::Day;
//!
//! let mut builder = DatabaseBuilder::new("demo")
//!     .with_channels(vec!["general".to_string()])
//!     .with_authors(vec![Author { name: "alice".to_string(), bot: false }]);
//! builder.add_message(0, &RawMessage {
//!     day: Day::new(2022, 3, 28),
//!     ..RawMessage::default()
//! })?;
//! let database = builder.build()?;
//!
//! let data = BlockData::MessagesPerCycle(MessagesPerCycle {
//!     per_day: vec![CycleCount { key: "2022-03-28".to_string(), value: 1 }],
//!     per_week: vec![],
//!     per_month: vec![],
//! });
//! let csv = block_to_csv(&database, &data)?;
//! assert!(csv.starts_with("cycle;key;messages"));
//! assert!(csv.contains("day;2022-03-28;1"));
//! # Ok::<(), chatstats::ChatstatsError>(())
//! ```

use std::fs::File;
use std::io;
use std::path::Path;

use crate::aggregate::{BlockData, CycleCount, SentimentCycleRow};
use crate::codec::AttachmentKind;
use crate::database::Database;
use crate::error::Result;

// ============================================================================
// Entry points
// ============================================================================

/// Writes a block result as semicolon-delimited CSV.
///
/// The header depends on the block shape: period series use
/// `cycle;key;messages`, sentiment series add one column per polarity, and
/// everything else uses `section;name;value` rows.
pub fn write_block_csv<W: io::Write>(
    database: &Database,
    data: &BlockData,
    writer: W,
) -> Result<()> {
    let mut w = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

    let authors: Vec<&str> = database.authors.iter().map(|a| a.name.as_str()).collect();
    let channels: Vec<&str> = database.channels.iter().map(|c| c.name.as_str()).collect();

    match data {
        BlockData::MessagesPerCycle(cycle) => {
            record(&mut w, &["cycle", "key", "messages"])?;
            write_cycles(&mut w, "day", &cycle.per_day)?;
            write_cycles(&mut w, "week", &cycle.per_week)?;
            write_cycles(&mut w, "month", &cycle.per_month)?;
        }
        BlockData::MessagesStats(stats) => {
            record(&mut w, &["section", "name", "value"])?;
            record(&mut w, &["totals", "messages", &stats.total.to_string()])?;
            record(&mut w, &["totals", "with_text", &stats.with_text.to_string()])?;
            record(&mut w, &["totals", "with_links", &stats.with_links.to_string()])?;
            record(&mut w, &["totals", "edited", &stats.edited.to_string()])?;
            record(
                &mut w,
                &["totals", "active_days", &stats.num_active_days.to_string()],
            )?;
            for entry in &stats.attachment_counts {
                let label = AttachmentKind::from_index(entry.index).label();
                record(&mut w, &["attachments", label, &entry.value.to_string()])?;
            }
            write_counts(&mut w, "authors", &authors, &stats.author_counts)?;
            write_counts(&mut w, "channels", &channels, &stats.channel_counts)?;
        }
        BlockData::ActiveAuthors(active) => {
            record(&mut w, &["month", "authors"])?;
            for row in &active.per_month {
                record(&mut w, &[row.key.as_str(), &row.value.to_string()])?;
            }
        }
        BlockData::EmojiStats(emoji) => {
            record(&mut w, &["section", "name", "value"])?;
            let emojis: Vec<&str> = database.emojis.iter().map(String::as_str).collect();
            for (prefix, group) in [("text", &emoji.in_text), ("reactions", &emoji.in_reactions)] {
                let totals = format!("{prefix}_totals");
                record(&mut w, &[&totals, "emojis", &group.total.to_string()])?;
                record(&mut w, &[&totals, "unique", &group.unique.to_string()])?;
                record(
                    &mut w,
                    &[&totals, "messages", &group.messages_with_emoji.to_string()],
                )?;
                write_counts(&mut w, &format!("{prefix}_emojis"), &emojis, &group.emoji_counts)?;
                write_counts(
                    &mut w,
                    &format!("{prefix}_authors"),
                    &authors,
                    &group.author_counts,
                )?;
                write_counts(
                    &mut w,
                    &format!("{prefix}_channels"),
                    &channels,
                    &group.channel_counts,
                )?;
            }
        }
        BlockData::InteractionStats(interaction) => {
            record(&mut w, &["section", "name", "value"])?;
            let mentions: Vec<&str> = database.mentions.iter().map(String::as_str).collect();
            write_counts(&mut w, "mentions", &mentions, &interaction.mention_counts)?;
            write_counts(&mut w, "replies", &authors, &interaction.author_reply_counts)?;
        }
        BlockData::LanguageStats(language) => {
            record(&mut w, &["section", "name", "value"])?;
            record(&mut w, &["totals", "words", &language.total_words.to_string()])?;
            record(
                &mut w,
                &["totals", "unique_words", &language.unique_words.to_string()],
            )?;
            record(
                &mut w,
                &[
                    "totals",
                    "avg_words_per_message",
                    &language.avg_words_per_message.to_string(),
                ],
            )?;
            for entry in &language.languages {
                let name = language_name(database, entry.index);
                record(&mut w, &["languages", name, &entry.value.to_string()])?;
            }
            let words: Vec<&str> = database.words.iter().map(String::as_str).collect();
            write_counts(&mut w, "words", &words, &language.word_counts)?;
        }
        BlockData::SentimentPerCycle(sentiment) => {
            record(
                &mut w,
                &["cycle", "key", "positive", "negative", "neutral", "diff"],
            )?;
            write_sentiment(&mut w, "week", &sentiment.per_week)?;
            write_sentiment(&mut w, "month", &sentiment.per_month)?;
        }
        BlockData::DomainsStats(domains) => {
            record(&mut w, &["section", "name", "value"])?;
            let names: Vec<&str> = database.domains.iter().map(String::as_str).collect();
            write_counts(&mut w, "domains", &names, &domains.domain_counts)?;
            write_counts(&mut w, "authors", &authors, &domains.author_counts)?;
            write_counts(&mut w, "channels", &channels, &domains.channel_counts)?;
        }
        BlockData::WordStats(word) => {
            record(&mut w, &["section", "name", "value"])?;
            let name = database
                .words
                .get(word.word_index as usize)
                .map_or("?", String::as_str);
            record(&mut w, &["word", name, &word.total.to_string()])?;
            for row in &word.per_month {
                record(&mut w, &["per_month", row.key.as_str(), &row.value.to_string()])?;
            }
            write_counts(&mut w, "authors", &authors, &word.author_counts)?;
            write_counts(&mut w, "channels", &channels, &word.channel_counts)?;
        }
    }

    w.flush()?;
    Ok(())
}

/// Writes a block result as CSV to a new file at `path`.
pub fn save_block_csv(database: &Database, data: &BlockData, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    write_block_csv(database, data, file)
}

/// Renders a block result to an in-memory CSV string.
pub fn block_to_csv(database: &Database, data: &BlockData) -> Result<String> {
    let mut buffer = Vec::new();
    write_block_csv(database, data, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

// ============================================================================
// Row helpers
// ============================================================================

fn record<W: io::Write>(w: &mut csv::Writer<W>, fields: &[&str]) -> Result<()> {
    w.write_record(fields)?;
    Ok(())
}

fn write_cycles<W: io::Write>(
    w: &mut csv::Writer<W>,
    cycle: &str,
    rows: &[CycleCount],
) -> Result<()> {
    for row in rows {
        record(w, &[cycle, row.key.as_str(), &row.value.to_string()])?;
    }
    Ok(())
}

fn write_sentiment<W: io::Write>(
    w: &mut csv::Writer<W>,
    cycle: &str,
    rows: &[SentimentCycleRow],
) -> Result<()> {
    for row in rows {
        record(
            w,
            &[
                cycle,
                row.key.as_str(),
                &row.positive.to_string(),
                &row.negative.to_string(),
                &row.neutral.to_string(),
                &row.diff.to_string(),
            ],
        )?;
    }
    Ok(())
}

/// One row per non-zero count, resolved to its dictionary name.
fn write_counts<W: io::Write>(
    w: &mut csv::Writer<W>,
    section: &str,
    names: &[&str],
    counts: &[u64],
) -> Result<()> {
    for (index, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let name = names.get(index).copied().unwrap_or("?");
        record(w, &[section, name, &count.to_string()])?;
    }
    Ok(())
}

fn language_name(database: &Database, index: u32) -> &str {
    database
        .languages
        .get(index as usize)
        .map_or("unknown", String::as_str)
}

// ============================================================================
// Tests
// ============================================================================
