//! On-demand message decoding.
//!
//! [`MessageView`] is the aggregation-side alternative to
//! [`read_message`](crate::codec::read_message): it decodes the cheap
//! fixed-position scalars eagerly, *records the bit address* of each present
//! list section while skipping over it, and only decodes a list when a block
//! actually asks for it. Most blocks touch one or two sections per message,
//! so the skipped work dominates.
//!
//! Views do not hold the reader. Accessors take `&mut BitReader` and move
//! its cursor (seek to the recorded address, decode, stop after the list) so
//! the caller keeps one cursor per scan, shared by everything the scan
//! decodes. The traversal in [`crate::aggregate`] wraps block callbacks in a
//! [`checkpoint`](crate::bits::BitReader::checkpoint) so any wandering, e.g.
//! following a reply, is undone before the next message is read.

use crate::bits::{BitAddress, BitReader};
use crate::codec::index_counts::{read_index_counts, skip_index_counts};
use crate::codec::message::{
    ATTACHMENT_BITS, FLAG_BITS, HOUR_BITS, Message, MessageBitConfig, MessageFlags, TextInfo,
};
use crate::indexed::IndexCounts;

/// A partially decoded message plus the addresses of its list sections.
///
/// Construction costs one pass over the message's *structure* (header reads
/// plus length-field hops through each list) and leaves the reader cursor
/// exactly past the message, ready for the next one.
///
/// # Example
///
/// ```rust
/// use chatstats::bits::BitStream;
/// use chatstats::codec::{Message, MessageBitConfig, MessageView, write_message};
///
/// let config = MessageBitConfig::DEFAULT;
/// let mut stream = BitStream::new();
/// write_message(
///     &mut stream,
///     &Message { day_index: 3, hour: 15, author_index: 7, emojis: vec![(1, 2)], ..Message::default() },
///     &config,
/// );
///
/// let mut reader = stream.reader();
/// let view = MessageView::read(&mut reader, &config);
/// assert_eq!(view.day_index, 3);
/// assert!(view.has_emojis());
/// assert_eq!(view.emojis(&mut reader), Some(vec![(1, 2)]));
/// assert_eq!(view.words(&mut reader), None);
/// ```
#[derive(Debug, Clone)]
pub struct MessageView {
    /// Which channel the message came from. Filled in by the channel
    /// traversal; reply views inherit it (replies never cross channels).
    pub channel_index: u32,
    pub day_index: u32,
    /// 0-23
    pub hour: u8,
    pub author_index: u32,
    /// Seconds between sending and the last edit, when edited.
    pub edited_after: Option<u32>,
    /// Sentiment and language, when the message has text.
    pub text: Option<TextInfo>,

    flags: MessageFlags,
    reply_addr: Option<u32>,
    words_addr: Option<BitAddress>,
    emojis_addr: Option<BitAddress>,
    attachments_addr: Option<BitAddress>,
    reactions_addr: Option<BitAddress>,
    mentions_addr: Option<BitAddress>,
    domains_addr: Option<BitAddress>,
    config: MessageBitConfig,
}

impl MessageView {
    /// Decodes the message at the reader cursor into a view, leaving the
    /// cursor just past the message.
    pub fn read(reader: &mut BitReader<'_>, config: &MessageBitConfig) -> Self {
        let day_index = reader.get_bits(config.day_bits);
        let hour = reader.get_bits(HOUR_BITS) as u8;
        let author_index = reader.get_bits(config.author_bits);
        let flags = MessageFlags::from_bits(reader.get_bits(FLAG_BITS) as u8);

        let mut view = MessageView {
            channel_index: 0,
            day_index,
            hour,
            author_index,
            edited_after: None,
            text: None,
            flags,
            reply_addr: None,
            words_addr: None,
            emojis_addr: None,
            attachments_addr: None,
            reactions_addr: None,
            mentions_addr: None,
            domains_addr: None,
            config: *config,
        };

        if flags.contains(MessageFlags::EDITED) {
            view.edited_after = Some(reader.read_varint(32));
        }
        if flags.contains(MessageFlags::REPLY) {
            view.reply_addr = Some(reader.read_varint(32));
        }
        if flags.contains(MessageFlags::TEXT) {
            let sentiment = (reader.get_bits(8) as i32 - 128) as i8;
            let lang_index = reader.get_bits(8) as u8;
            view.text = Some(TextInfo {
                sentiment,
                lang_index,
            });
            view.words_addr = Some(reader.offset);
            skip_index_counts(reader, config.word_bits);
        }
        if flags.contains(MessageFlags::EMOJIS) {
            view.emojis_addr = Some(reader.offset);
            skip_index_counts(reader, config.emoji_bits);
        }
        if flags.contains(MessageFlags::ATTACHMENTS) {
            view.attachments_addr = Some(reader.offset);
            skip_index_counts(reader, ATTACHMENT_BITS);
        }
        if flags.contains(MessageFlags::REACTIONS) {
            view.reactions_addr = Some(reader.offset);
            skip_index_counts(reader, config.emoji_bits);
        }
        if flags.contains(MessageFlags::MENTIONS) {
            view.mentions_addr = Some(reader.offset);
            skip_index_counts(reader, config.mention_bits);
        }
        if flags.contains(MessageFlags::DOMAINS) {
            view.domains_addr = Some(reader.offset);
            skip_index_counts(reader, config.domain_bits);
        }

        view
    }

    pub fn has_reply(&self) -> bool {
        self.flags.contains(MessageFlags::REPLY)
    }

    pub fn has_edits(&self) -> bool {
        self.flags.contains(MessageFlags::EDITED)
    }

    pub fn has_text(&self) -> bool {
        self.flags.contains(MessageFlags::TEXT)
    }

    pub fn has_emojis(&self) -> bool {
        self.flags.contains(MessageFlags::EMOJIS)
    }

    pub fn has_attachments(&self) -> bool {
        self.flags.contains(MessageFlags::ATTACHMENTS)
    }

    pub fn has_reactions(&self) -> bool {
        self.flags.contains(MessageFlags::REACTIONS)
    }

    pub fn has_mentions(&self) -> bool {
        self.flags.contains(MessageFlags::MENTIONS)
    }

    pub fn has_domains(&self) -> bool {
        self.flags.contains(MessageFlags::DOMAINS)
    }

    /// Decodes one recorded list: seek, read, leave the cursor after it.
    fn section(
        &self,
        reader: &mut BitReader<'_>,
        addr: Option<BitAddress>,
        bits: u32,
    ) -> Option<IndexCounts> {
        let addr = addr?;
        reader.offset = addr;
        Some(read_index_counts(reader, bits))
    }

    /// The words list, present only on text-bearing messages (may be empty).
    pub fn words(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.words_addr, self.config.word_bits)
    }

    /// Emojis used in the message text.
    pub fn emojis(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.emojis_addr, self.config.emoji_bits)
    }

    /// Attachment kind counts; indices map through
    /// [`AttachmentKind::from_index`](crate::codec::message::AttachmentKind::from_index).
    pub fn attachments(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.attachments_addr, ATTACHMENT_BITS)
    }

    /// Reaction emoji counts.
    pub fn reactions(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.reactions_addr, self.config.emoji_bits)
    }

    /// Mentioned-name counts.
    pub fn mentions(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.mentions_addr, self.config.mention_bits)
    }

    /// Linked-domain counts.
    pub fn domains(&self, reader: &mut BitReader<'_>) -> Option<IndexCounts> {
        self.section(reader, self.domains_addr, self.config.domain_bits)
    }

    /// Decodes the replied-to message, one level deep.
    ///
    /// Reply targets are always earlier in the stream, so this terminates
    /// even on reply chains. The cursor is left past the *target's*
    /// structure; wrap the call in a checkpoint when the current position
    /// matters.
    pub fn reply(&self, reader: &mut BitReader<'_>) -> Option<MessageView> {
        let addr = self.reply_addr?;
        reader.offset = addr as BitAddress;
        let mut view = MessageView::read(reader, &self.config);
        view.channel_index = self.channel_index;
        Some(view)
    }

    /// Decodes every section into a plain [`Message`].
    pub fn full_message(&self, reader: &mut BitReader<'_>) -> Message {
        Message {
            day_index: self.day_index,
            hour: self.hour,
            author_index: self.author_index,
            edited_after: self.edited_after,
            reply_addr: self.reply_addr,
            text: self.text,
            words: self.words(reader).unwrap_or_default(),
            emojis: self.emojis(reader).unwrap_or_default(),
            attachments: self.attachments(reader).unwrap_or_default(),
            reactions: self.reactions(reader).unwrap_or_default(),
            mentions: self.mentions(reader).unwrap_or_default(),
            domains: self.domains(reader).unwrap_or_default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitStream;
    use crate::codec::message::write_message;

    const CONFIG: MessageBitConfig = MessageBitConfig {
        day_bits: 10,
        author_bits: 6,
        word_bits: 8,
        emoji_bits: 6,
        mention_bits: 5,
        domain_bits: 5,
    };

    fn full_message() -> Message {
        Message {
            day_index: 321,
            hour: 9,
            author_index: 17,
            edited_after: Some(120),
            reply_addr: None,
            text: Some(TextInfo {
                sentiment: -3,
                lang_index: 5,
            }),
            words: vec![(20, 1), (21, 1), (22, 1)],
            emojis: vec![(2, 4)],
            attachments: vec![(0, 1)],
            reactions: vec![(3, 2)],
            mentions: vec![(1, 1)],
            domains: vec![(4, 1)],
        }
    }

    fn packed(message: &Message) -> BitStream {
        let mut stream = BitStream::new();
        write_message(&mut stream, message, &CONFIG);
        stream
    }

    #[test]
    fn header_scalars_match_full_decode() {
        let message = full_message();
        let stream = packed(&message);

        let mut reader = stream.reader();
        let view = MessageView::read(&mut reader, &CONFIG);
        assert_eq!(view.day_index, message.day_index);
        assert_eq!(view.hour, message.hour);
        assert_eq!(view.author_index, message.author_index);
        assert_eq!(view.edited_after, message.edited_after);
        assert_eq!(view.text, message.text);
    }

    #[test]
    fn construction_leaves_cursor_past_the_message() {
        let message = full_message();
        let stream = packed(&message);

        let mut reader = stream.reader();
        MessageView::read(&mut reader, &CONFIG);
        assert_eq!(reader.offset, stream.offset);
    }

    #[test]
    fn accessors_decode_their_sections() {
        let message = full_message();
        let stream = packed(&message);

        let mut reader = stream.reader();
        let view = MessageView::read(&mut reader, &CONFIG);
        assert_eq!(view.words(&mut reader), Some(message.words.clone()));
        assert_eq!(view.emojis(&mut reader), Some(message.emojis.clone()));
        assert_eq!(
            view.attachments(&mut reader),
            Some(message.attachments.clone())
        );
        assert_eq!(view.reactions(&mut reader), Some(message.reactions.clone()));
        assert_eq!(view.mentions(&mut reader), Some(message.mentions.clone()));
        assert_eq!(view.domains(&mut reader), Some(message.domains.clone()));
    }

    #[test]
    fn accessors_are_idempotent_and_order_independent() {
        let message = full_message();
        let stream = packed(&message);

        let mut reader = stream.reader();
        let view = MessageView::read(&mut reader, &CONFIG);

        // Out of wire order, some repeated.
        assert_eq!(view.domains(&mut reader), Some(message.domains.clone()));
        assert_eq!(view.words(&mut reader), Some(message.words.clone()));
        assert_eq!(view.words(&mut reader), Some(message.words.clone()));
        assert_eq!(view.emojis(&mut reader), Some(message.emojis.clone()));
        assert_eq!(view.words(&mut reader), Some(message.words.clone()));
    }

    #[test]
    fn absent_sections_return_none() {
        let message = Message {
            day_index: 1,
            hour: 1,
            author_index: 1,
            ..Message::default()
        };
        let stream = packed(&message);

        let mut reader = stream.reader();
        let view = MessageView::read(&mut reader, &CONFIG);
        assert!(!view.has_text());
        assert_eq!(view.words(&mut reader), None);
        assert_eq!(view.emojis(&mut reader), None);
        assert_eq!(view.attachments(&mut reader), None);
        assert_eq!(view.reactions(&mut reader), None);
        assert_eq!(view.mentions(&mut reader), None);
        assert_eq!(view.domains(&mut reader), None);
        assert!(view.reply(&mut reader).is_none());
    }

    #[test]
    fn views_chain_across_packed_messages() {
        let messages = [
            full_message(),
            Message {
                day_index: 322,
                hour: 10,
                author_index: 3,
                emojis: vec![(1, 1)],
                ..Message::default()
            },
            Message {
                day_index: 323,
                hour: 11,
                author_index: 4,
                ..Message::default()
            },
        ];

        let mut stream = BitStream::new();
        for message in &messages {
            write_message(&mut stream, message, &CONFIG);
        }

        let mut reader = stream.reader();
        for message in &messages {
            let view = MessageView::read(&mut reader, &CONFIG);
            assert_eq!(view.day_index, message.day_index);
            assert_eq!(view.author_index, message.author_index);
        }
        assert_eq!(reader.offset, stream.offset);
    }

    #[test]
    fn reply_reads_the_earlier_message() {
        let target = Message {
            day_index: 5,
            hour: 8,
            author_index: 2,
            emojis: vec![(3, 1)],
            ..Message::default()
        };

        let mut stream = BitStream::new();
        write_message(&mut stream, &target, &CONFIG);
        let reply = Message {
            day_index: 6,
            hour: 9,
            author_index: 7,
            // Target sits at bit 0.
            reply_addr: Some(0),
            ..Message::default()
        };
        let reply_addr = stream.offset;
        write_message(&mut stream, &reply, &CONFIG);

        let mut reader = stream.reader_at(reply_addr);
        let mut view = MessageView::read(&mut reader, &CONFIG);
        view.channel_index = 3;
        assert!(view.has_reply());

        let target_view = view.reply(&mut reader).unwrap();
        assert_eq!(target_view.day_index, target.day_index);
        assert_eq!(target_view.author_index, target.author_index);
        assert_eq!(target_view.channel_index, 3);
        assert_eq!(target_view.emojis(&mut reader), Some(target.emojis.clone()));
        // One level only: the target itself has no reply.
        assert!(target_view.reply(&mut reader).is_none());
    }

    #[test]
    fn full_message_reconstructs_everything() {
        let message = full_message();
        let stream = packed(&message);

        let mut reader = stream.reader();
        let view = MessageView::read(&mut reader, &CONFIG);
        assert_eq!(view.full_message(&mut reader), message);
    }
}
