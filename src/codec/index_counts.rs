//! Compact encoding for `(index, count)` lists.
//!
//! Per-message metadata is dominated by short lists of dictionary references
//! where most counts are 1 and indices often arrive consecutively (see
//! [`crate::indexed::IndexCountsBuilder`] for why). The encoder walks the
//! list once and greedily picks, per group of entries, the cheapest of three
//! shapes, each introduced by a 2-bit tag:
//!
//! | tag  | shape  | layout                       | expands to              |
//! |------|--------|------------------------------|-------------------------|
//! | `00` | single | index, count                 | 1 entry                 |
//! | `01` | serial | length, start index          | `len` entries, count 1  |
//! | `10` | RLE    | length, start index, count   | `len` entries, one count|
//!
//! A list starts with an 8-bit total entry count, so a reader can stop (or
//! [`skip_index_counts`] can hop over payloads) without any terminator. The
//! budget is also the format's safety valve: at most 255 entries survive
//! encoding, counts saturate at 16 bits, and runs longer than 127 are
//! flushed and restarted. Decoding therefore yields a *bounded, multiset
//! equivalent* of the input, never an error.
//!
//! Index width is caller-provided (`index_bits`), sized per dictionary by
//! the database builder.

use crate::bits::{BitReader, BitStream};
use crate::indexed::IndexCounts;

const TOTAL_BITS: u32 = 8;
const TAG_BITS: u32 = 2;
const RUN_BITS: u32 = 7;
const COUNT_BITS: u32 = 16;

const TAG_SINGLE: u32 = 0b00;
const TAG_SERIAL: u32 = 0b01;
const TAG_RLE: u32 = 0b10;

/// Most entries a single list can carry; extra input entries are dropped.
pub const MAX_ENTRIES: usize = (1 << TOTAL_BITS) - 1;
/// Longest run one serial/RLE group can describe.
const MAX_RUN: usize = (1 << RUN_BITS) - 1;
/// Largest storable count; higher counts saturate.
pub const MAX_COUNT: u32 = (1 << COUNT_BITS) - 1;

/// Writes an index/count list at the stream cursor.
///
/// Counts must be at least 1. Input beyond [`MAX_ENTRIES`] entries is
/// silently dropped and counts above [`MAX_COUNT`] saturate; both are format
/// limits, not errors.
pub fn write_index_counts(stream: &mut BitStream, counts: &[(u32, u32)], index_bits: u32) {
    let total = counts.len().min(MAX_ENTRIES);
    stream.set_bits(TOTAL_BITS, total as u32);

    let mut i = 0;
    while i < total {
        let (index, count) = counts[i];
        debug_assert!(count > 0, "index counts must be >= 1");

        // Longest run of consecutive indices sharing one count, bounded by
        // the group's length field. Longer runs simply start a new group.
        let mut len = 1;
        while i + len < total && len < MAX_RUN && counts[i + len] == (index + len as u32, count) {
            len += 1;
        }

        if len >= 2 && count == 1 {
            stream.set_bits(TAG_BITS, TAG_SERIAL);
            stream.set_bits(RUN_BITS, len as u32);
            stream.set_bits(index_bits, index);
        } else if len >= 2 {
            stream.set_bits(TAG_BITS, TAG_RLE);
            stream.set_bits(RUN_BITS, len as u32);
            stream.set_bits(index_bits, index);
            stream.set_bits(COUNT_BITS, count.min(MAX_COUNT));
        } else {
            len = 1;
            stream.set_bits(TAG_BITS, TAG_SINGLE);
            stream.set_bits(index_bits, index);
            stream.set_bits(COUNT_BITS, count.min(MAX_COUNT));
        }
        i += len;
    }
}

/// Decodes the groups at the cursor, emitting every expanded entry.
fn decode_groups(reader: &mut BitReader<'_>, index_bits: u32, mut emit: impl FnMut(u32, u32)) {
    let total = reader.get_bits(TOTAL_BITS) as usize;

    let mut produced = 0;
    while produced < total {
        match reader.get_bits(TAG_BITS) {
            TAG_SINGLE => {
                let index = reader.get_bits(index_bits);
                let count = reader.get_bits(COUNT_BITS);
                emit(index, count);
                produced += 1;
            }
            TAG_SERIAL => {
                let len = reader.get_bits(RUN_BITS);
                let start = reader.get_bits(index_bits);
                for k in 0..len {
                    emit(start + k, 1);
                }
                produced += len as usize;
            }
            TAG_RLE => {
                let len = reader.get_bits(RUN_BITS);
                let start = reader.get_bits(index_bits);
                let count = reader.get_bits(COUNT_BITS);
                for k in 0..len {
                    emit(start + k, count);
                }
                produced += len as usize;
            }
            tag => panic!("corrupted stream: index counts tag {tag:#04b}"),
        }
    }
}

/// Reads an index/count list at the reader cursor, leaving the cursor just
/// past it.
///
/// The result is multiset-equivalent to what was written (modulo the format
/// limits described on [`write_index_counts`]); entries may be split across
/// groups, so duplicate indices are possible.
pub fn read_index_counts(reader: &mut BitReader<'_>, index_bits: u32) -> IndexCounts {
    let mut counts = Vec::new();
    decode_groups(reader, index_bits, |index, count| counts.push((index, count)));
    counts
}

/// Streams a list's entries into `emit` without building a `Vec`.
///
/// Aggregation code calls this in its inner loop to bump counters in place:
///
/// ```rust
/// use chatstats::bits::BitStream;
/// use chatstats::codec::{read_index_counts_into, write_index_counts};
///
/// let mut stream = BitStream::new();
/// write_index_counts(&mut stream, &[(0, 1), (1, 1), (1, 1)], 8);
///
/// let mut counters = [0u32; 4];
/// let mut reader = stream.reader();
/// read_index_counts_into(&mut reader, 8, |index, count| {
///     counters[index as usize] += count;
/// });
/// assert_eq!(counters, [1, 2, 0, 0]);
/// ```
pub fn read_index_counts_into(
    reader: &mut BitReader<'_>,
    index_bits: u32,
    emit: impl FnMut(u32, u32),
) {
    decode_groups(reader, index_bits, emit);
}

/// Advances the cursor past a list without decoding payloads.
///
/// Only tags and length fields are read; indices and counts are stepped
/// over. Ends at exactly the offset a full read would.
pub fn skip_index_counts(reader: &mut BitReader<'_>, index_bits: u32) {
    let total = reader.get_bits(TOTAL_BITS) as usize;

    let mut produced = 0;
    while produced < total {
        match reader.get_bits(TAG_BITS) {
            TAG_SINGLE => {
                reader.offset += (index_bits + COUNT_BITS) as usize;
                produced += 1;
            }
            TAG_SERIAL => {
                let len = reader.get_bits(RUN_BITS);
                reader.offset += index_bits as usize;
                produced += len as usize;
            }
            TAG_RLE => {
                let len = reader.get_bits(RUN_BITS);
                reader.offset += (index_bits + COUNT_BITS) as usize;
                produced += len as usize;
            }
            tag => panic!("corrupted stream: index counts tag {tag:#04b}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
