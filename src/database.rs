//! Packed message database and its two-pass builder.
//!
//! A [`Database`] is the queryable form of a chat export: small
//! serde-friendly side tables (channels, authors, dictionaries) next to one
//! packed [`BitStream`] holding every message. The aggregation layer scans
//! the stream through [`MessageView`](crate::codec::MessageView)s; nothing
//! is ever unpacked wholesale.
//!
//! [`DatabaseBuilder`] packs in two passes. Messages arrive in any channel
//! interleaving and are appended to an intermediate stream under the wide
//! default bit widths, while the builder tracks which stream ranges belong
//! to which channel. `build()` then repacks channel by channel into a final
//! stream with widths derived from the actual dictionary sizes, which makes
//! each channel's messages contiguous and lets calendar days shrink to
//! small day indexes.
//!
//! # Example
//!
//! ```rust
//! use chatstats::database::{Author, DatabaseBuilder, RawMessage};
//! use chatstats::time::Day;
//!
//! let mut builder = DatabaseBuilder::new("my export")
//!     .with_channels(vec!["general".to_string()])
//!     .with_authors(vec![Author { name: "alice".to_string(), bot: false }]);
//!
//! builder.add_message(0, &RawMessage {
//!     day: Day::new(2022, 3, 5),
//!     hour: 13,
//!     author_index: 0,
//!     ..RawMessage::default()
//! })?;
//!
//! let database = builder.build()?;
//! assert_eq!(database.num_messages(), 1);
//! assert_eq!(database.channels[0].msg_count, 1);
//! # Ok::<(), chatstats::ChatstatsError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::bits::{BitAddress, BitReader, BitStream};
use crate::codec::{Message, MessageBitConfig, TextInfo, read_message, write_message};
use crate::error::{ChatstatsError, Result};
use crate::indexed::{IndexCounts, IndexCountsBuilder};
use crate::progress::{Progress, ProgressCallback};
use crate::time::{Day, gen_time_keys};

// ============================================================================
// Side tables
// ============================================================================

/// A chat participant, referenced by messages through `author_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,

    /// Whether this is an automated account.
    #[serde(default)]
    pub bot: bool,
}

/// A channel and the location of its packed messages.
///
/// After `build()` every channel's messages occupy one contiguous stream
/// range: `msg_count` messages starting at bit address `msg_addr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,

    /// Absolute bit address of the channel's first packed message.
    pub msg_addr: BitAddress,

    /// Number of packed messages in the channel.
    pub msg_count: u32,
}

/// Date coverage of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub min_day: Day,
    pub max_day: Day,

    /// Calendar days in `[min_day, max_day]`, inclusive. Message day
    /// indexes are always below this.
    pub num_days: usize,
}

// ============================================================================
// Raw input
// ============================================================================

/// One unpacked message record, the input contract of [`DatabaseBuilder`].
///
/// Every reference here is an index into a side table handed to the builder
/// up front: `author_index` into the author table, list entries into the
/// word/emoji/mention/domain dictionaries. `reply_to` is the zero-based
/// ordinal of an earlier message *in the same channel*; forward or
/// out-of-range ordinals are silently dropped, since an append-only stream
/// cannot point at messages that do not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Calendar day the message was posted.
    pub day: Day,

    /// Hour of day, 0-23.
    #[serde(default)]
    pub hour: u8,

    pub author_index: u32,

    /// Ordinal of the replied-to message within the same channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<u32>,

    /// Seconds between posting and the last edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_after: Option<u32>,

    /// Present when the message has text content. Required for `words`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextInfo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: IndexCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emojis: IndexCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: IndexCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: IndexCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentions: IndexCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: IndexCounts,
}

impl Default for RawMessage {
    fn default() -> Self {
        RawMessage {
            day: Day::new(1970, 1, 1),
            hour: 0,
            author_index: 0,
            reply_to: None,
            edited_after: None,
            text: None,
            words: Vec::new(),
            emojis: Vec::new(),
            attachments: Vec::new(),
            reactions: Vec::new(),
            mentions: Vec::new(),
            domains: Vec::new(),
        }
    }
}

// ============================================================================
// Database
// ============================================================================

/// A fully packed chat database: side tables plus the message stream.
///
/// Produced by [`DatabaseBuilder::build`]. The packed stream itself is
/// private; readers are handed out through [`Database::reader`] /
/// [`Database::reader_at`] so every scan runs on its own cursor.
#[derive(Debug, Clone)]
pub struct Database {
    pub title: String,

    /// Date coverage. Message `day_index` values count from `min_day`.
    pub time: TimeInfo,

    /// Bit widths the stream was packed with.
    pub bit_config: MessageBitConfig,

    pub channels: Vec<Channel>,
    pub authors: Vec<Author>,

    /// Word dictionary; message word lists index into it.
    pub words: Vec<String>,
    pub emojis: Vec<String>,
    pub mentions: Vec<String>,
    pub domains: Vec<String>,

    /// Language labels; `TextInfo::lang_index` indexes into it.
    pub languages: Vec<String>,

    stream: BitStream,
}

impl Database {
    /// Returns a read cursor positioned at the start of the stream.
    #[must_use]
    pub fn reader(&self) -> BitReader<'_> {
        self.stream.reader()
    }

    /// Returns a read cursor positioned at `addr`.
    #[must_use]
    pub fn reader_at(&self, addr: BitAddress) -> BitReader<'_> {
        self.stream.reader_at(addr)
    }

    /// Total number of packed messages across all channels.
    #[must_use]
    pub fn num_messages(&self) -> usize {
        self.channels.iter().map(|c| c.msg_count as usize).sum()
    }

    /// Number of bits occupied by packed messages.
    #[must_use]
    pub fn packed_bits(&self) -> usize {
        self.stream.offset
    }

    /// Copies the packed stream out as little-endian bytes, padded to a
    /// whole number of 32-bit words.
    #[must_use]
    pub fn stream_bytes(&self) -> Vec<u8> {
        self.stream.to_bytes()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// How many bits are needed to address `n` distinct values (minimum 1).
fn bits_needed(n: u32) -> u32 {
    if n == 0 { 1 } else { 32 - n.leading_zeros() }
}

/// Folds duplicate indices and applies the canonical count-descending
/// order. Count-1 ties end up index-consecutive, which the run codec packs
/// tightest.
fn normalize(list: &IndexCounts) -> IndexCounts {
    if list.len() < 2 {
        return list.clone();
    }
    let mut builder = IndexCountsBuilder::new();
    for &(index, count) in list {
        builder.incr_by(index, count);
    }
    builder.into_vec()
}

/// A contiguous intermediate-stream range holding one channel's messages.
#[derive(Debug, Clone, Copy)]
struct Section {
    start: BitAddress,
    end: BitAddress,
}

/// Incremental packer producing a [`Database`].
///
/// Side tables are attached with the `with_*` methods, messages with
/// [`add_message`](DatabaseBuilder::add_message) in any channel order, and
/// [`build`](DatabaseBuilder::build) runs the compaction pass. See the
/// [module docs](self) for the two-pass scheme.
#[derive(Default)]
pub struct DatabaseBuilder {
    title: String,
    channel_names: Vec<String>,
    authors: Vec<Author>,
    words: Vec<String>,
    emojis: Vec<String>,
    mentions: Vec<String>,
    domains: Vec<String>,
    languages: Vec<String>,

    /// Intermediate stream, packed under [`MessageBitConfig::DEFAULT`].
    stream: BitStream,

    /// Per-channel list of contiguous intermediate-stream ranges.
    sections: Vec<Vec<Section>>,

    /// Messages added so far per channel. Doubles as the next ordinal.
    ordinals: Vec<u32>,

    min_day: Option<Day>,
    max_day: Option<Day>,
    total_messages: usize,

    progress: Option<ProgressCallback>,
}

impl DatabaseBuilder {
    /// Creates an empty builder for a database with the given title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        DatabaseBuilder {
            title: title.into(),
            ..DatabaseBuilder::default()
        }
    }

    /// Sets the channel table. Messages are added by index into it.
    #[must_use]
    pub fn with_channels(mut self, names: Vec<String>) -> Self {
        self.sections = vec![Vec::new(); names.len()];
        self.ordinals = vec![0; names.len()];
        self.channel_names = names;
        self
    }

    /// Sets the author table.
    #[must_use]
    pub fn with_authors(mut self, authors: Vec<Author>) -> Self {
        self.authors = authors;
        self
    }

    /// Sets the word dictionary.
    #[must_use]
    pub fn with_words(mut self, words: Vec<String>) -> Self {
        self.words = words;
        self
    }

    /// Sets the emoji dictionary.
    #[must_use]
    pub fn with_emojis(mut self, emojis: Vec<String>) -> Self {
        self.emojis = emojis;
        self
    }

    /// Sets the mention dictionary.
    #[must_use]
    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Sets the domain dictionary.
    #[must_use]
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    /// Sets the language label table.
    #[must_use]
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    /// Registers a callback invoked once per message during the compaction
    /// pass of [`build`](DatabaseBuilder::build).
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Packs one message into the intermediate stream.
    ///
    /// Section lists are stored normalized: duplicate indices fold together
    /// and entries take the canonical count-descending order.
    ///
    /// # Errors
    ///
    /// Returns an error if `channel_index` or `raw.author_index` is out of
    /// range for the attached tables, if `raw.day` is not a valid calendar
    /// day, or if the record carries words without a text section.
    pub fn add_message(&mut self, channel_index: usize, raw: &RawMessage) -> Result<()> {
        if channel_index >= self.channel_names.len() {
            return Err(ChatstatsError::unknown_channel(
                channel_index,
                self.channel_names.len(),
            ));
        }
        if raw.author_index as usize >= self.authors.len() {
            return Err(ChatstatsError::invalid_archive(format!(
                "author index {} out of range ({} authors)",
                raw.author_index,
                self.authors.len()
            )));
        }
        if raw.text.is_none() && !raw.words.is_empty() {
            return Err(ChatstatsError::invalid_archive(
                "message has words but no text section",
            ));
        }
        if raw.day.to_date().is_none() {
            return Err(ChatstatsError::invalid_date(raw.day.date_key()));
        }

        self.min_day = Some(self.min_day.map_or(raw.day, |d| d.min(raw.day)));
        self.max_day = Some(self.max_day.map_or(raw.day, |d| d.max(raw.day)));

        // Backward references only. The target must already be packed.
        let reply_ordinal = raw
            .reply_to
            .filter(|&target| target < self.ordinals[channel_index]);

        let message = Message {
            // The intermediate stream stores the calendar form; day indexes
            // only exist once the full date range is known.
            day_index: raw.day.to_binary(),
            hour: raw.hour,
            author_index: raw.author_index,
            edited_after: raw.edited_after,
            reply_addr: reply_ordinal,
            text: raw.text,
            words: normalize(&raw.words),
            emojis: normalize(&raw.emojis),
            attachments: normalize(&raw.attachments),
            reactions: normalize(&raw.reactions),
            mentions: normalize(&raw.mentions),
            domains: normalize(&raw.domains),
        };

        // Extend the channel's last section if it ends exactly at the
        // cursor, otherwise the channel was interrupted and a new section
        // starts here.
        let resumed = self.sections[channel_index]
            .last()
            .is_none_or(|s| s.end != self.stream.offset);
        if resumed {
            self.sections[channel_index].push(Section {
                start: self.stream.offset,
                end: self.stream.offset,
            });
        }

        write_message(&mut self.stream, &message, &MessageBitConfig::DEFAULT);

        if let Some(section) = self.sections[channel_index].last_mut() {
            section.end = self.stream.offset;
        }
        self.ordinals[channel_index] += 1;
        self.total_messages += 1;
        Ok(())
    }

    /// Number of messages added so far.
    #[must_use]
    pub fn num_messages(&self) -> usize {
        self.total_messages
    }

    /// Runs the compaction pass and returns the finished database.
    ///
    /// Channels are written in table order, each one's sections stitched
    /// into a single contiguous run. Calendar days become day indexes
    /// relative to the covered range, and reply ordinals become the
    /// absolute bit address of the target message in the final stream.
    ///
    /// # Errors
    ///
    /// Returns [`ChatstatsError::EmptyDatabase`] if no message was added.
    pub fn build(self) -> Result<Database> {
        let DatabaseBuilder {
            title,
            channel_names,
            authors,
            words,
            emojis,
            mentions,
            domains,
            languages,
            stream,
            sections,
            ordinals: _,
            min_day,
            max_day,
            total_messages,
            progress,
        } = self;

        let (Some(min_day), Some(max_day)) = (min_day, max_day) else {
            return Err(ChatstatsError::EmptyDatabase);
        };

        let keys = gen_time_keys(min_day, max_day)?;
        let min_date = min_day
            .to_date()
            .ok_or_else(|| ChatstatsError::invalid_date(min_day.date_key()))?;

        let bit_config = MessageBitConfig {
            day_bits: bits_needed(keys.date_keys.len() as u32),
            author_bits: bits_needed(authors.len() as u32),
            word_bits: bits_needed(words.len() as u32),
            emoji_bits: bits_needed(emojis.len() as u32),
            mention_bits: bits_needed(mentions.len() as u32),
            domain_bits: bits_needed(domains.len() as u32),
        };

        let mut final_stream = BitStream::new();
        let mut channels = Vec::with_capacity(channel_names.len());
        let mut written = 0usize;
        let mut reader = stream.reader();

        for (channel_index, name) in channel_names.into_iter().enumerate() {
            let msg_addr = final_stream.offset;
            let mut msg_count = 0u32;

            // Final bit address of each already-written message in this
            // channel, indexed by ordinal. Reply targets are always behind
            // the referencing message, so lookups never miss.
            let mut final_addrs: Vec<u32> = Vec::new();

            for section in &sections[channel_index] {
                reader.offset = section.start;
                while reader.offset < section.end {
                    let mut message = read_message(&mut reader, &MessageBitConfig::DEFAULT);

                    let day = Day::from_binary(message.day_index);
                    let date = day
                        .to_date()
                        .ok_or_else(|| ChatstatsError::invalid_date(day.date_key()))?;
                    message.day_index = date.signed_duration_since(min_date).num_days() as u32;

                    message.reply_addr = message
                        .reply_addr
                        .and_then(|ordinal| final_addrs.get(ordinal as usize).copied());

                    final_addrs.push(final_stream.offset as u32);
                    write_message(&mut final_stream, &message, &bit_config);

                    msg_count += 1;
                    written += 1;
                    if let Some(callback) = &progress {
                        callback(Progress::new(written, Some(total_messages)));
                    }
                }
            }

            channels.push(Channel {
                name,
                msg_addr,
                msg_count,
            });
        }

        Ok(Database {
            title,
            time: TimeInfo {
                min_day,
                max_day,
                num_days: keys.date_keys.len(),
            },
            bit_config,
            channels,
            authors,
            words,
            emojis,
            mentions,
            domains,
            languages,
            stream: final_stream,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MessageView;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(day_of_month: u8, author: u32) -> RawMessage {
        RawMessage {
            day: Day::new(2022, 3, day_of_month),
            hour: 12,
            author_index: author,
            ..RawMessage::default()
        }
    }

    fn test_builder() -> DatabaseBuilder {
        DatabaseBuilder::new("test")
            .with_channels(vec!["general".to_string(), "random".to_string()])
            .with_authors(vec![
                Author {
                    name: "alice".to_string(),
                    bot: false,
                },
                Author {
                    name: "bob".to_string(),
                    bot: false,
                },
                Author {
                    name: "bridge".to_string(),
                    bot: true,
                },
            ])
            .with_words(vec![
                "hello".to_string(),
                "world".to_string(),
                "rust".to_string(),
            ])
            .with_emojis(vec!["smile".to_string(), "fire".to_string()])
            .with_mentions(vec!["everyone".to_string()])
            .with_domains(vec!["example.com".to_string()])
            .with_languages(vec!["en".to_string(), "es".to_string()])
    }

    // ==== validation ====

    #[test]
    fn test_empty_database_rejected() {
        let result = test_builder().build();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_empty_database());
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let mut builder = test_builder();
        let err = builder.add_message(2, &raw(5, 0)).unwrap_err();
        assert!(err.is_unknown_channel());
        assert!(err.to_string().contains("index 2"));
    }

    #[test]
    fn test_author_out_of_range_rejected() {
        let mut builder = test_builder();
        let err = builder.add_message(0, &raw(5, 99)).unwrap_err();
        assert!(err.is_invalid_archive());
        assert!(err.to_string().contains("author index 99"));
    }

    #[test]
    fn test_invalid_day_rejected() {
        let mut builder = test_builder();
        let mut message = raw(5, 0);
        message.day = Day::new(2022, 13, 40);
        let err = builder.add_message(0, &message).unwrap_err();
        assert!(err.is_invalid_date());
    }

    #[test]
    fn test_words_without_text_rejected() {
        let mut builder = test_builder();
        let mut message = raw(5, 0);
        message.words = vec![(0, 2)];
        let err = builder.add_message(0, &message).unwrap_err();
        assert!(err.is_invalid_archive());
    }

    // ==== packing ====

    #[test]
    fn test_single_message() {
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 1)).unwrap();
        let db = builder.build().unwrap();

        assert_eq!(db.num_messages(), 1);
        assert_eq!(db.channels[0].msg_addr, 0);
        assert_eq!(db.channels[0].msg_count, 1);
        assert_eq!(db.channels[1].msg_count, 0);
        assert_eq!(db.time.min_day, Day::new(2022, 3, 5));
        assert_eq!(db.time.max_day, Day::new(2022, 3, 5));
        assert_eq!(db.time.num_days, 1);

        let mut reader = db.reader_at(db.channels[0].msg_addr);
        let view = MessageView::read(&mut reader, &db.bit_config);
        assert_eq!(view.day_index, 0);
        assert_eq!(view.hour, 12);
        assert_eq!(view.author_index, 1);
    }

    #[test]
    fn test_full_payload_round_trip() {
        let mut builder = test_builder();
        let message = RawMessage {
            edited_after: Some(90),
            text: Some(TextInfo {
                sentiment: -7,
                lang_index: 1,
            }),
            words: vec![(2, 3), (0, 1)],
            emojis: vec![(1, 2)],
            attachments: vec![(0, 1)],
            reactions: vec![(0, 5)],
            mentions: vec![(0, 1)],
            domains: vec![(0, 2)],
            ..raw(5, 2)
        };
        builder.add_message(1, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[1].msg_addr);
        let decoded = read_message(&mut reader, &db.bit_config);
        assert_eq!(decoded.day_index, 0);
        assert_eq!(decoded.author_index, 2);
        assert_eq!(decoded.edited_after, Some(90));
        assert_eq!(
            decoded.text,
            Some(TextInfo {
                sentiment: -7,
                lang_index: 1,
            })
        );
        assert_eq!(decoded.words, vec![(2, 3), (0, 1)]);
        assert_eq!(decoded.emojis, vec![(1, 2)]);
        assert_eq!(decoded.attachments, vec![(0, 1)]);
        assert_eq!(decoded.reactions, vec![(0, 5)]);
        assert_eq!(decoded.mentions, vec![(0, 1)]);
        assert_eq!(decoded.domains, vec![(0, 2)]);
    }

    #[test]
    fn test_section_lists_are_normalized() {
        let mut builder = test_builder();
        let message = RawMessage {
            text: Some(TextInfo {
                sentiment: 0,
                lang_index: 0,
            }),
            // Duplicate index, out of canonical order.
            words: vec![(0, 1), (2, 2), (0, 1)],
            reactions: vec![(1, 1), (0, 4)],
            ..raw(5, 0)
        };
        builder.add_message(0, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[0].msg_addr);
        let decoded = read_message(&mut reader, &db.bit_config);
        assert_eq!(decoded.words, vec![(0, 2), (2, 2)]);
        assert_eq!(decoded.reactions, vec![(0, 4), (1, 1)]);
    }

    #[test]
    fn test_interleaved_channels_become_contiguous() {
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 0)).unwrap();
        builder.add_message(1, &raw(6, 1)).unwrap();
        builder.add_message(0, &raw(7, 0)).unwrap();
        builder.add_message(1, &raw(8, 1)).unwrap();
        builder.add_message(0, &raw(9, 2)).unwrap();
        let db = builder.build().unwrap();

        assert_eq!(db.channels[0].msg_count, 3);
        assert_eq!(db.channels[1].msg_count, 2);
        assert_eq!(db.channels[0].msg_addr, 0);

        // Channel 0's three messages sit back to back, in add order, and
        // channel 1 starts exactly where channel 0 ends.
        let mut reader = db.reader_at(db.channels[0].msg_addr);
        let days: Vec<u32> = (0..3)
            .map(|_| MessageView::read(&mut reader, &db.bit_config).day_index)
            .collect();
        assert_eq!(days, vec![0, 2, 4]);
        assert_eq!(reader.offset, db.channels[1].msg_addr);

        let days: Vec<u32> = (0..2)
            .map(|_| MessageView::read(&mut reader, &db.bit_config).day_index)
            .collect();
        assert_eq!(days, vec![1, 3]);
        assert_eq!(reader.offset, db.packed_bits());
    }

    #[test]
    fn test_day_remap_spans_range() {
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 0)).unwrap();
        builder.add_message(0, &raw(10, 0)).unwrap();
        let db = builder.build().unwrap();

        assert_eq!(db.time.num_days, 6);
        let mut reader = db.reader_at(db.channels[0].msg_addr);
        assert_eq!(read_message(&mut reader, &db.bit_config).day_index, 0);
        assert_eq!(read_message(&mut reader, &db.bit_config).day_index, 5);
    }

    #[test]
    fn test_min_max_tracked_across_channels() {
        let mut builder = test_builder();
        builder.add_message(1, &raw(20, 0)).unwrap();
        builder.add_message(0, &raw(3, 0)).unwrap();
        builder.add_message(1, &raw(11, 0)).unwrap();
        let db = builder.build().unwrap();

        assert_eq!(db.time.min_day, Day::new(2022, 3, 3));
        assert_eq!(db.time.max_day, Day::new(2022, 3, 20));
        assert_eq!(db.time.num_days, 18);
    }

    #[test]
    fn test_empty_channel_keeps_zero_count() {
        let mut builder = test_builder();
        builder.add_message(1, &raw(5, 0)).unwrap();
        let db = builder.build().unwrap();

        assert_eq!(db.channels[0].msg_count, 0);
        assert_eq!(db.channels[1].msg_count, 1);
    }

    // ==== replies ====

    #[test]
    fn test_reply_resolves_to_target_address() {
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 0)).unwrap();
        builder.add_message(0, &raw(6, 1)).unwrap();
        let mut message = raw(7, 2);
        message.reply_to = Some(1);
        builder.add_message(0, &message).unwrap();
        let db = builder.build().unwrap();

        // Walk to the second message to learn its address.
        let mut reader = db.reader_at(db.channels[0].msg_addr);
        MessageView::read(&mut reader, &db.bit_config);
        let target_addr = reader.offset;
        let target = MessageView::read(&mut reader, &db.bit_config);
        assert_eq!(target.author_index, 1);

        let third = MessageView::read(&mut reader, &db.bit_config);
        assert!(third.has_reply());
        assert_eq!(
            third.full_message(&mut reader).reply_addr,
            Some(target_addr as u32)
        );

        let reply = third.reply(&mut reader).unwrap();
        assert_eq!(reply.author_index, 1);
        assert_eq!(reply.day_index, 1);
        assert_eq!(reply.channel_index, third.channel_index);
    }

    #[test]
    fn test_reply_survives_section_stitching() {
        // The reply target lands in an earlier section than the reply
        // itself once another channel interrupts the stream.
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 0)).unwrap();
        builder.add_message(1, &raw(5, 1)).unwrap();
        let mut message = raw(6, 1);
        message.reply_to = Some(0);
        builder.add_message(0, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[0].msg_addr);
        let first = MessageView::read(&mut reader, &db.bit_config);
        assert!(!first.has_reply());
        let second = MessageView::read(&mut reader, &db.bit_config);
        assert!(second.has_reply());

        let reply = second.reply(&mut reader).unwrap();
        assert_eq!(reply.author_index, 0);
        assert_eq!(reply.day_index, 0);
    }

    #[test]
    fn test_forward_reply_dropped() {
        let mut builder = test_builder();
        let mut message = raw(5, 0);
        message.reply_to = Some(5);
        builder.add_message(0, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[0].msg_addr);
        assert!(!MessageView::read(&mut reader, &db.bit_config).has_reply());
    }

    #[test]
    fn test_self_reply_dropped() {
        let mut builder = test_builder();
        let mut message = raw(5, 0);
        message.reply_to = Some(0);
        builder.add_message(0, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[0].msg_addr);
        assert!(!MessageView::read(&mut reader, &db.bit_config).has_reply());
    }

    #[test]
    fn test_reply_ordinal_is_per_channel() {
        // Ordinal 0 of channel 1, not the globally-first message.
        let mut builder = test_builder();
        builder.add_message(0, &raw(5, 0)).unwrap();
        builder.add_message(1, &raw(6, 1)).unwrap();
        let mut message = raw(7, 2);
        message.reply_to = Some(0);
        builder.add_message(1, &message).unwrap();
        let db = builder.build().unwrap();

        let mut reader = db.reader_at(db.channels[1].msg_addr);
        MessageView::read(&mut reader, &db.bit_config);
        let second = MessageView::read(&mut reader, &db.bit_config);
        let reply = second.reply(&mut reader).unwrap();
        assert_eq!(reply.author_index, 1);
        assert_eq!(reply.day_index, 1);
    }

    // ==== bit widths ====

    #[test]
    fn test_bits_needed() {
        assert_eq!(bits_needed(0), 1);
        assert_eq!(bits_needed(1), 1);
        assert_eq!(bits_needed(2), 2);
        assert_eq!(bits_needed(3), 2);
        assert_eq!(bits_needed(4), 3);
        assert_eq!(bits_needed(255), 8);
        assert_eq!(bits_needed(256), 9);
        assert_eq!(bits_needed(65535), 16);
    }

    #[test]
    fn test_bit_config_derived_from_dictionaries() {
        let mut builder = test_builder();
        builder.add_message(0, &raw(1, 0)).unwrap();
        builder.add_message(0, &raw(9, 0)).unwrap();
        let db = builder.build().unwrap();

        // 9 days, 3 authors, 3 words, 2 emojis, 1 mention, 1 domain.
        assert_eq!(db.bit_config.day_bits, 4);
        assert_eq!(db.bit_config.author_bits, 2);
        assert_eq!(db.bit_config.word_bits, 2);
        assert_eq!(db.bit_config.emoji_bits, 2);
        assert_eq!(db.bit_config.mention_bits, 1);
        assert_eq!(db.bit_config.domain_bits, 1);
    }

    #[test]
    fn test_compaction_shrinks_stream() {
        let mut builder = test_builder();
        for i in 0..40 {
            builder.add_message(0, &raw(1 + (i % 9), u32::from(i % 3))).unwrap();
        }
        let intermediate_bits = builder.stream.offset;
        let db = builder.build().unwrap();

        assert!(db.packed_bits() < intermediate_bits);
        assert_eq!(db.stream_bytes().len() % 4, 0);
    }

    // ==== progress ====

    #[test]
    fn test_progress_reported_per_message() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_total = Arc::new(AtomicUsize::new(0));
        let calls_in = calls.clone();
        let total_in = seen_total.clone();

        let mut builder = test_builder().with_progress(Arc::new(move |progress: Progress| {
            calls_in.fetch_add(1, Ordering::SeqCst);
            if let Some(total) = progress.total_items {
                total_in.store(total, Ordering::SeqCst);
            }
        }));
        for _ in 0..3 {
            builder.add_message(0, &raw(5, 0)).unwrap();
        }
        builder.build().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(seen_total.load(Ordering::SeqCst), 3);
    }
}
