//! Whole-message packing.
//!
//! A packed message is a fixed header followed by optional sections:
//!
//! ```text
//! day index    day_bits
//! hour         5 bits (0-23)
//! author index author_bits
//! flags        8 bits               which sections follow
//! edited_after varint               if EDITED: seconds until the edit
//! reply_addr   varint               if REPLY: bit address of the target
//! text         8+8 bits + counts    if TEXT: sentiment, language, words
//! emojis       counts               if EMOJIS
//! attachments  counts (3-bit index) if ATTACHMENTS
//! reactions    counts               if REACTIONS
//! mentions     counts               if MENTIONS
//! domains      counts               if DOMAINS
//! ```
//!
//! Sections always appear in flag-bit order, which is what lets
//! [`crate::codec::view::MessageView`] locate any section by skipping the
//! ones before it.
//!
//! Field widths come from a [`MessageBitConfig`]. Values wider than their
//! field are truncated silently; the database builder sizes the config from
//! the dictionaries, so this never loses data on its own output. Reply
//! addresses are stored as 32-bit varints, which bounds a stream at 2^32
//! bits.

use serde::{Deserialize, Serialize};

use crate::bits::{BitReader, BitStream};
use crate::codec::index_counts::{read_index_counts, write_index_counts};
use crate::indexed::IndexCounts;

/// Width of the hour-of-day field.
pub const HOUR_BITS: u32 = 5;
/// Width of the section flags field.
pub const FLAG_BITS: u32 = 8;
/// Fixed index width for attachment lists; see [`AttachmentKind`].
pub const ATTACHMENT_BITS: u32 = 3;

// ============================================================================
// Flags
// ============================================================================

/// Marks which optional sections a packed message carries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MessageFlags(u8);

impl MessageFlags {
    pub const REPLY: MessageFlags = MessageFlags(1 << 0);
    pub const EDITED: MessageFlags = MessageFlags(1 << 1);
    pub const TEXT: MessageFlags = MessageFlags(1 << 2);
    pub const EMOJIS: MessageFlags = MessageFlags(1 << 3);
    pub const ATTACHMENTS: MessageFlags = MessageFlags(1 << 4);
    pub const REACTIONS: MessageFlags = MessageFlags(1 << 5);
    pub const MENTIONS: MessageFlags = MessageFlags(1 << 6);
    pub const DOMAINS: MessageFlags = MessageFlags(1 << 7);

    /// Reconstructs flags from their wire byte.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        MessageFlags(bits)
    }

    /// The wire byte.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// `true` if every flag in `other` is set.
    #[must_use]
    pub fn contains(self, other: MessageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets every flag in `other`.
    pub fn insert(&mut self, other: MessageFlags) {
        self.0 |= other.0;
    }
}

// ============================================================================
// Bit config
// ============================================================================

/// Per-database field widths for packed messages.
///
/// The builder derives the final widths from dictionary sizes, so a database
/// with 1000 authors spends 10 bits per author reference instead of 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBitConfig {
    pub day_bits: u32,
    pub author_bits: u32,
    pub word_bits: u32,
    pub emoji_bits: u32,
    pub mention_bits: u32,
    pub domain_bits: u32,
}

impl MessageBitConfig {
    /// Wide hand-picked widths for the intermediate stream, where dictionary
    /// sizes are still unknown. The day field holds a packed calendar date
    /// there ([`crate::time::Day::to_binary`]), hence 21 bits.
    pub const DEFAULT: MessageBitConfig = MessageBitConfig {
        day_bits: 21, // 12 + 4 + 5
        author_bits: 21,
        word_bits: 21,
        emoji_bits: 18,
        mention_bits: 20,
        domain_bits: 16,
    };
}

// ============================================================================
// Attachment kinds
// ============================================================================

/// Attachment type, a fixed dictionary small enough for a 3-bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentKind {
    Image,
    /// GIFs and friends.
    ImageAnimated,
    Video,
    Sticker,
    Audio,
    Document,
    Other,
}

impl AttachmentKind {
    /// Number of kinds; counter arrays are sized by this.
    pub const COUNT: usize = 7;

    /// Maps a wire index back to a kind. Unknown indices fold into
    /// [`AttachmentKind::Other`].
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => AttachmentKind::Image,
            1 => AttachmentKind::ImageAnimated,
            2 => AttachmentKind::Video,
            3 => AttachmentKind::Sticker,
            4 => AttachmentKind::Audio,
            5 => AttachmentKind::Document,
            _ => AttachmentKind::Other,
        }
    }

    /// The wire index.
    #[must_use]
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Human-readable name for reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::ImageAnimated => "animated image",
            AttachmentKind::Video => "video",
            AttachmentKind::Sticker => "sticker",
            AttachmentKind::Audio => "audio",
            AttachmentKind::Document => "document",
            AttachmentKind::Other => "other",
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// Text metadata stored when a message has any text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInfo {
    /// AFINN-style sentiment score, negative is negative.
    pub sentiment: i8,
    /// Index into the language dictionary.
    pub lang_index: u8,
}

/// A fully decoded message.
///
/// The fields mirror the wire layout. `reply_addr` is the absolute bit
/// address of the replied-to message, which is always *earlier* in the
/// stream; `edited_after` is the delay between sending and the last edit, in
/// seconds. Empty lists are simply not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub day_index: u32,
    /// 0-23
    pub hour: u8,
    pub author_index: u32,
    pub edited_after: Option<u32>,
    pub reply_addr: Option<u32>,
    pub text: Option<TextInfo>,
    /// Only meaningful when `text` is present.
    pub words: IndexCounts,
    pub emojis: IndexCounts,
    pub attachments: IndexCounts,
    pub reactions: IndexCounts,
    pub mentions: IndexCounts,
    pub domains: IndexCounts,
}

impl Message {
    /// Computes the flags byte this message will be stored with.
    #[must_use]
    pub fn flags(&self) -> MessageFlags {
        let mut flags = MessageFlags::default();
        if self.reply_addr.is_some() {
            flags.insert(MessageFlags::REPLY);
        }
        if self.edited_after.is_some() {
            flags.insert(MessageFlags::EDITED);
        }
        if self.text.is_some() {
            flags.insert(MessageFlags::TEXT);
        }
        if !self.emojis.is_empty() {
            flags.insert(MessageFlags::EMOJIS);
        }
        if !self.attachments.is_empty() {
            flags.insert(MessageFlags::ATTACHMENTS);
        }
        if !self.reactions.is_empty() {
            flags.insert(MessageFlags::REACTIONS);
        }
        if !self.mentions.is_empty() {
            flags.insert(MessageFlags::MENTIONS);
        }
        if !self.domains.is_empty() {
            flags.insert(MessageFlags::DOMAINS);
        }
        flags
    }
}

/// Packs a message at the stream cursor.
///
/// Words without a text section would be unreadable (the words list lives
/// inside the TEXT section), so that combination is a caller bug.
pub fn write_message(stream: &mut BitStream, message: &Message, config: &MessageBitConfig) {
    debug_assert!(
        message.words.is_empty() || message.text.is_some(),
        "words require a text section"
    );

    stream.set_bits(config.day_bits, message.day_index);
    stream.set_bits(HOUR_BITS, u32::from(message.hour));
    stream.set_bits(config.author_bits, message.author_index);

    let flags = message.flags();
    stream.set_bits(FLAG_BITS, u32::from(flags.bits()));

    if let Some(seconds) = message.edited_after {
        stream.write_varint(seconds, 32);
    }
    if let Some(addr) = message.reply_addr {
        stream.write_varint(addr, 32);
    }
    if let Some(text) = message.text {
        stream.set_bits(8, (i32::from(text.sentiment) + 128) as u32);
        stream.set_bits(8, u32::from(text.lang_index));
        write_index_counts(stream, &message.words, config.word_bits);
    }
    if !message.emojis.is_empty() {
        write_index_counts(stream, &message.emojis, config.emoji_bits);
    }
    if !message.attachments.is_empty() {
        write_index_counts(stream, &message.attachments, ATTACHMENT_BITS);
    }
    if !message.reactions.is_empty() {
        write_index_counts(stream, &message.reactions, config.emoji_bits);
    }
    if !message.mentions.is_empty() {
        write_index_counts(stream, &message.mentions, config.mention_bits);
    }
    if !message.domains.is_empty() {
        write_index_counts(stream, &message.domains, config.domain_bits);
    }
}

/// Decodes a whole message at the reader cursor, leaving the cursor just
/// past it.
///
/// This is the eager counterpart of [`crate::codec::view::MessageView`];
/// aggregation prefers the view, full decoding is for repacking and tests.
pub fn read_message(reader: &mut BitReader<'_>, config: &MessageBitConfig) -> Message {
    let day_index = reader.get_bits(config.day_bits);
    let hour = reader.get_bits(HOUR_BITS) as u8;
    let author_index = reader.get_bits(config.author_bits);
    let flags = MessageFlags::from_bits(reader.get_bits(FLAG_BITS) as u8);

    let mut message = Message {
        day_index,
        hour,
        author_index,
        ..Message::default()
    };

    if flags.contains(MessageFlags::EDITED) {
        message.edited_after = Some(reader.read_varint(32));
    }
    if flags.contains(MessageFlags::REPLY) {
        message.reply_addr = Some(reader.read_varint(32));
    }
    if flags.contains(MessageFlags::TEXT) {
        let sentiment = (reader.get_bits(8) as i32 - 128) as i8;
        let lang_index = reader.get_bits(8) as u8;
        message.text = Some(TextInfo {
            sentiment,
            lang_index,
        });
        message.words = read_index_counts(reader, config.word_bits);
    }
    if flags.contains(MessageFlags::EMOJIS) {
        message.emojis = read_index_counts(reader, config.emoji_bits);
    }
    if flags.contains(MessageFlags::ATTACHMENTS) {
        message.attachments = read_index_counts(reader, ATTACHMENT_BITS);
    }
    if flags.contains(MessageFlags::REACTIONS) {
        message.reactions = read_index_counts(reader, config.emoji_bits);
    }
    if flags.contains(MessageFlags::MENTIONS) {
        message.mentions = read_index_counts(reader, config.mention_bits);
    }
    if flags.contains(MessageFlags::DOMAINS) {
        message.domains = read_index_counts(reader, config.domain_bits);
    }

    message
}

// ============================================================================
// Tests
// ============================================================================
