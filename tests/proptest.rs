//! Property-based tests for chatstats.
//!
//! These tests generate random inputs to find edge cases in the bit-level
//! codecs and the database builder.

use proptest::prelude::*;

use chatstats::aggregate::{BlockArgs, BlockData, BlockEngine, BlockKey, BlockRegistry};
use chatstats::bits::BitStream;
use chatstats::codec::{
    Message, MessageBitConfig, MessageView, TextInfo, read_index_counts, read_message,
    skip_index_counts, write_index_counts, write_message,
};
use chatstats::database::{Author, DatabaseBuilder, RawMessage};
use chatstats::filters::Filters;
use chatstats::indexed::IndexCounts;
use chatstats::time::Day;

/// Generate a sequence of bit writes, each value masked to its width.
fn arb_bit_writes() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((1u32..=32, any::<u32>()), 0..200).prop_map(|ops| {
        ops.into_iter()
            .map(|(bits, raw)| {
                let value = if bits == 32 { raw } else { raw & ((1 << bits) - 1) };
                (bits, value)
            })
            .collect()
    })
}

/// Generate an index/count list that stays inside the format limits, so the
/// decoded list is entry-for-entry equal to the input.
fn arb_index_counts(index_max: u32, max_len: usize) -> impl Strategy<Value = IndexCounts> {
    prop::collection::vec((0..index_max, 1u32..1000), 0..max_len)
}

/// Generate a message whose fields fit [`MessageBitConfig::DEFAULT`].
fn arb_message() -> impl Strategy<Value = Message> {
    let header = (
        0u32..2000,
        0u8..24,
        0u32..100_000,
        prop::option::of(any::<u32>()),
        prop::option::of(any::<u32>()),
        prop::option::of(
            (any::<i8>(), any::<u8>()).prop_map(|(sentiment, lang_index)| TextInfo {
                sentiment,
                lang_index,
            }),
        ),
    );
    let sections = (
        arb_index_counts(50_000, 8),
        arb_index_counts(10_000, 6),
        arb_index_counts(7, 4),
        arb_index_counts(10_000, 6),
        arb_index_counts(1000, 4),
        arb_index_counts(1000, 4),
    );

    (header, sections).prop_map(
        |(
            (day_index, hour, author_index, edited_after, reply_addr, text),
            (words, emojis, attachments, reactions, mentions, domains),
        )| {
            Message {
                day_index,
                hour,
                author_index,
                edited_after,
                reply_addr,
                text,
                // The words list lives inside the text section.
                words: if text.is_some() { words } else { Vec::new() },
                emojis,
                attachments,
                reactions,
                mentions,
                domains,
            }
        },
    )
}

/// Generate a raw message valid against the dictionaries used by
/// `build_database` below: 4 authors, 8 words, 4 emojis, 3 languages.
fn arb_raw_message() -> impl Strategy<Value = RawMessage> {
    (
        (2020u16..2023, 1u8..13, 1u8..29),
        0u8..24,
        0u32..4,
        prop::option::of(0u32..500),
        prop::option::of(0u32..10),
        prop::option::of((-5i8..6, 0u8..3)),
        prop::collection::vec((0u32..8, 1u32..4), 0..4),
        prop::collection::vec((0u32..4, 1u32..4), 0..3),
    )
        .prop_map(
            |((year, month, day), hour, author_index, edited_after, reply_to, text, words, emojis)| {
                let text = text.map(|(sentiment, lang_index)| TextInfo {
                    sentiment,
                    lang_index,
                });
                RawMessage {
                    day: Day::new(year, month, day),
                    hour,
                    author_index,
                    reply_to,
                    edited_after,
                    text,
                    words: if text.is_some() { words } else { Vec::new() },
                    emojis,
                    ..RawMessage::default()
                }
            },
        )
}

/// Packs the raw batch into a single-channel database.
fn build_database(messages: &[RawMessage]) -> chatstats::Database {
    let mut builder = DatabaseBuilder::new("prop")
        .with_channels(vec!["main".to_string()])
        .with_authors(
            ["alice", "bob", "carol", "dave"]
                .iter()
                .map(|name| Author {
                    name: (*name).to_string(),
                    bot: false,
                })
                .collect(),
        )
        .with_words((0..8).map(|i| format!("word{i}")).collect())
        .with_emojis((0..4).map(|i| format!("emoji{i}")).collect())
        .with_languages(vec![
            "unknown".to_string(),
            "en".to_string(),
            "de".to_string(),
        ]);
    for message in messages {
        builder.add_message(0, message).expect("valid message");
    }
    builder.build().expect("non-empty batch")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ============================================
    // BIT STREAM PROPERTIES
    // ============================================

    /// A single masked value survives one write/read cycle at any width
    #[test]
    fn single_value_round_trips(bits in 1u32..=32, raw in any::<u32>()) {
        let value = if bits == 32 { raw } else { raw & ((1 << bits) - 1) };

        let mut stream = BitStream::new();
        stream.set_bits(bits, value);
        prop_assert_eq!(stream.offset, bits as usize);

        stream.offset = 0;
        prop_assert_eq!(stream.get_bits(bits), value);
    }

    /// Mixed-width sequences read back in order, and the cursor advances by
    /// exactly the sum of the widths
    #[test]
    fn mixed_width_sequence_round_trips(writes in arb_bit_writes()) {
        let mut stream = BitStream::new();
        for &(bits, value) in &writes {
            stream.set_bits(bits, value);
        }
        let total: usize = writes.iter().map(|&(bits, _)| bits as usize).sum();
        prop_assert_eq!(stream.offset, total);

        stream.offset = 0;
        for &(bits, value) in &writes {
            prop_assert_eq!(stream.get_bits(bits), value);
        }
    }

    /// The byte form feeds back through from_bytes without losing a bit
    #[test]
    fn byte_round_trip_preserves_reads(writes in arb_bit_writes()) {
        let mut stream = BitStream::new();
        for &(bits, value) in &writes {
            stream.set_bits(bits, value);
        }

        let restored = BitStream::from_bytes(&stream.to_bytes()).unwrap();
        let mut reader = restored.reader();
        for &(bits, value) in &writes {
            prop_assert_eq!(reader.get_bits(bits), value);
        }
    }

    /// Varints round trip at every supported bound
    #[test]
    fn varint_round_trips(raw in any::<u32>(), max_bits in prop::sample::select(vec![7u32, 8, 9, 10, 16, 24, 32])) {
        let value = if max_bits == 32 { raw } else { raw & ((1 << max_bits) - 1) };

        let mut stream = BitStream::new();
        stream.write_varint(value, max_bits);
        stream.offset = 0;
        prop_assert_eq!(stream.read_varint(max_bits), value);
    }

    // ============================================
    // INDEX COUNT PROPERTIES
    // ============================================

    /// Bounded lists decode entry-for-entry equal to the input
    #[test]
    fn index_counts_round_trip(counts in arb_index_counts(50_000, 60)) {
        let mut stream = BitStream::new();
        write_index_counts(&mut stream, &counts, 16);

        let mut reader = stream.reader();
        prop_assert_eq!(read_index_counts(&mut reader, 16), counts);
    }

    /// Skipping a list lands the cursor exactly where a full read would
    #[test]
    fn index_counts_skip_matches_read(counts in arb_index_counts(50_000, 60)) {
        let mut stream = BitStream::new();
        write_index_counts(&mut stream, &counts, 16);
        let written = stream.offset;

        let mut skipper = stream.reader();
        skip_index_counts(&mut skipper, 16);
        prop_assert_eq!(skipper.offset, written);

        let mut reader = stream.reader();
        read_index_counts(&mut reader, 16);
        prop_assert_eq!(reader.offset, written);
    }

    /// Narrow index widths carry the same data as wide ones
    #[test]
    fn narrow_width_lists_round_trip(counts in arb_index_counts(7, 10)) {
        let mut stream = BitStream::new();
        write_index_counts(&mut stream, &counts, 3);

        let mut reader = stream.reader();
        prop_assert_eq!(read_index_counts(&mut reader, 3), counts);
    }

    /// Two lists written back to back decode independently
    #[test]
    fn consecutive_lists_stay_independent(
        first in arb_index_counts(1000, 20),
        second in arb_index_counts(1000, 20),
    ) {
        let mut stream = BitStream::new();
        write_index_counts(&mut stream, &first, 16);
        write_index_counts(&mut stream, &second, 16);

        let mut reader = stream.reader();
        prop_assert_eq!(read_index_counts(&mut reader, 16), first);
        prop_assert_eq!(read_index_counts(&mut reader, 16), second);
    }

    // ============================================
    // MESSAGE CODEC PROPERTIES
    // ============================================

    /// A full message survives packing and eager decoding
    #[test]
    fn message_round_trips(message in arb_message()) {
        let config = MessageBitConfig::DEFAULT;
        let mut stream = BitStream::new();
        write_message(&mut stream, &message, &config);

        let mut reader = stream.reader();
        prop_assert_eq!(read_message(&mut reader, &config), message);
        prop_assert_eq!(reader.offset, stream.offset);
    }

    /// The lazy view agrees with the eager decoder on every message of a
    /// batch, and its skipping lands each next message correctly
    #[test]
    fn views_agree_with_eager_decoding(messages in prop::collection::vec(arb_message(), 1..8)) {
        let config = MessageBitConfig::DEFAULT;
        let mut stream = BitStream::new();
        for message in &messages {
            write_message(&mut stream, message, &config);
        }

        let mut reader = stream.reader();
        for message in &messages {
            let view = MessageView::read(&mut reader, &config);
            prop_assert_eq!(view.day_index, message.day_index);
            prop_assert_eq!(view.hour, message.hour);
            prop_assert_eq!(view.author_index, message.author_index);
            prop_assert_eq!(view.edited_after, message.edited_after);
            prop_assert_eq!(view.text, message.text);
        }
        prop_assert_eq!(reader.offset, stream.offset);

        // Full decoding through the view matches the originals too.
        let mut reader = stream.reader();
        for message in &messages {
            let view = MessageView::read(&mut reader, &config);
            prop_assert_eq!(&view.full_message(&mut reader), message);
        }
    }

    /// Packing never panics, whatever the section mix
    #[test]
    fn packing_never_panics(messages in prop::collection::vec(arb_message(), 0..10)) {
        let config = MessageBitConfig::DEFAULT;
        let mut stream = BitStream::new();
        for message in &messages {
            write_message(&mut stream, message, &config);
        }
    }

    // ============================================
    // BUILDER PROPERTIES
    // ============================================

    /// Any valid batch builds, and the scan sees every message
    #[test]
    fn builder_accepts_any_valid_batch(messages in prop::collection::vec(arb_raw_message(), 1..40)) {
        let db = build_database(&messages);

        prop_assert_eq!(db.num_messages(), messages.len());
        prop_assert_eq!(db.channels[0].msg_count as usize, messages.len());
        prop_assert!(db.packed_bits() > 0);

        let filters = Filters::new(&db).unwrap();
        let mut engine = BlockEngine::new(BlockRegistry::standard(), &db).unwrap();
        let data = engine
            .compute(BlockKey::MessagesStats, &BlockArgs::None, &db, &filters)
            .unwrap();
        let BlockData::MessagesStats(stats) = data else {
            panic!("wrong variant");
        };

        prop_assert_eq!(stats.total as usize, messages.len());
        let with_text = messages.iter().filter(|m| m.text.is_some()).count();
        prop_assert_eq!(stats.with_text as usize, with_text);
        let edited = messages.iter().filter(|m| m.edited_after.is_some()).count();
        prop_assert_eq!(stats.edited as usize, edited);
    }

    /// The packed stream survives the byte round trip used by the database
    #[test]
    fn database_stream_bytes_are_word_aligned(messages in prop::collection::vec(arb_raw_message(), 1..20)) {
        let db = build_database(&messages);
        let bytes = db.stream_bytes();
        prop_assert_eq!(bytes.len() % 4, 0);
        prop_assert!(bytes.len() * 8 >= db.packed_bits());
    }

    // ============================================
    // TIME PROPERTIES
    // ============================================

    /// Calendar days survive the packed binary form
    #[test]
    fn day_binary_round_trips(year in 1970u16..2100, month in 1u8..13, day in 1u8..32) {
        let original = Day::new(year, month, day);
        prop_assert_eq!(Day::from_binary(original.to_binary()), original);
    }

    /// Day ordering follows the calendar
    #[test]
    fn day_ordering_is_calendar_ordering(
        a in (1990u16..2030, 1u8..13, 1u8..29),
        b in (1990u16..2030, 1u8..13, 1u8..29),
    ) {
        let day_a = Day::new(a.0, a.1, a.2);
        let day_b = Day::new(b.0, b.1, b.2);
        prop_assert_eq!(day_a <= day_b, a <= b);
    }
}

// ============================================
// NON-PROPTEST EDGE CASE TESTS
// ============================================

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn bare_message_packs_to_header_only() {
        let config = MessageBitConfig::DEFAULT;
        let message = Message {
            day_index: 1,
            hour: 12,
            author_index: 2,
            ..Message::default()
        };

        let mut stream = BitStream::new();
        write_message(&mut stream, &message, &config);
        // day + hour + author + flags, nothing else.
        assert_eq!(
            stream.offset,
            (config.day_bits + 5 + config.author_bits + 8) as usize
        );

        let mut reader = stream.reader();
        assert_eq!(read_message(&mut reader, &config), message);
    }

    #[test]
    fn extreme_field_values_round_trip() {
        let config = MessageBitConfig::DEFAULT;
        let message = Message {
            day_index: (1 << config.day_bits) - 1,
            hour: 23,
            author_index: (1 << config.author_bits) - 1,
            edited_after: Some(u32::MAX),
            reply_addr: Some(u32::MAX),
            text: Some(TextInfo {
                sentiment: i8::MIN,
                lang_index: u8::MAX,
            }),
            words: vec![(0, 1)],
            ..Message::default()
        };

        let mut stream = BitStream::new();
        write_message(&mut stream, &message, &config);
        let mut reader = stream.reader();
        assert_eq!(read_message(&mut reader, &config), message);
    }

    #[test]
    fn entry_budget_truncates_oversized_sections() {
        let config = MessageBitConfig::DEFAULT;
        // Same emoji 400 times never forms a run, so the budget bites.
        let message = Message {
            emojis: vec![(3, 1); 400],
            ..Message::default()
        };

        let mut stream = BitStream::new();
        write_message(&mut stream, &message, &config);
        let mut reader = stream.reader();
        let read = read_message(&mut reader, &config);
        assert_eq!(read.emojis.len(), 255);
        assert!(read.emojis.iter().all(|&pair| pair == (3, 1)));
    }

    #[test]
    fn builder_survives_all_replies_invalid() {
        // Forward ordinals are dropped, the messages themselves are kept.
        let messages: Vec<RawMessage> = (0..4)
            .map(|i| RawMessage {
                day: Day::new(2021, 1, 1 + i),
                author_index: 0,
                reply_to: Some(99),
                ..RawMessage::default()
            })
            .collect();
        let db = build_database(&messages);
        assert_eq!(db.num_messages(), 4);

        let mut reader = db.reader();
        for _ in 0..4 {
            let view = MessageView::read(&mut reader, &db.bit_config);
            assert!(!view.has_reply());
        }
    }
}
