//! Bit-level storage primitives.
//!
//! Everything in a packed database ultimately lands in a [`BitStream`]: a
//! growable buffer of 32-bit words addressed by *bit* offset instead of byte
//! offset. Values are written MSB-first and may straddle two words, so a
//! 21-bit day field followed by a 5-bit hour field costs exactly 26 bits.
//!
//! Two access paths exist:
//!
//! - [`BitStream`] owns the buffer and is used while *building* a database.
//!   It has a public read/write cursor ([`BitStream::offset`]) and grows on
//!   demand.
//! - [`BitReader`] borrows the finished buffer and is used while *querying*.
//!   Many readers can exist over one stream; each carries its own cursor.
//!
//! Reads and writes are limited to 32 bits at a time. Multi-field values are
//! composed by the codecs on top (see [`crate::codec`]).
//!
//! # Example
//!
//! ```rust
//! use chatstats::bits::BitStream;
//!
//! let mut stream = BitStream::new();
//! stream.set_bits(21, 1_000_000);
//! stream.set_bits(5, 13);
//! assert_eq!(stream.offset, 26);
//!
//! let mut reader = stream.reader();
//! assert_eq!(reader.get_bits(21), 1_000_000);
//! assert_eq!(reader.get_bits(5), 13);
//! ```

use crate::error::{ChatstatsError, Result};

/// Offset of a value inside a [`BitStream`], in bits.
pub type BitAddress = usize;

/// Initial buffer size: 1024 words, 4 KiB.
const DEFAULT_WORDS: usize = 1024;

/// Mask with the lowest `bits` bits set. `bits` must be in `1..=32`.
#[inline]
fn width_mask(bits: u32) -> u32 {
    u32::MAX >> (32 - bits)
}

/// Reads `bits` bits starting at `offset`, MSB-first.
///
/// The value either fits inside one word (left boundary only) or spans two
/// consecutive words (cross boundary); out-of-range offsets panic through
/// slice indexing.
#[inline]
fn read_bits_at(words: &[u32], offset: BitAddress, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }

    let aligned = offset >> 5;
    let delta = (offset & 31) as u32;

    if delta + bits > 32 {
        let hi = words[aligned] << delta;
        let lo = words[aligned + 1] >> (32 - delta);
        (hi | lo) >> (32 - bits)
    } else {
        (words[aligned] << delta) >> (32 - bits)
    }
}

/// Reads a variable-length integer via a raw `get_bits` closure.
///
/// Shared between [`BitStream`] and [`BitReader`] so both cursors decode the
/// same encoding: 7-bit groups with a continuation bit, least significant
/// group first. Fields narrower than 10 bits are stored fixed-width instead,
/// since a single continuation bit would already cost more than it saves.
#[inline]
fn read_varint_with(mut get_bits: impl FnMut(u32) -> u32, max_bits: u32) -> u32 {
    if max_bits < 10 {
        return get_bits(max_bits);
    }

    let mut value: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = get_bits(8);
        value |= (byte & 127) << shift;
        if byte & 128 == 0 {
            return value;
        }
        shift += 7;
    }
}

// ============================================================================
// BitStream
// ============================================================================

/// A growable stream of bits with a movable read/write cursor.
///
/// The cursor ([`offset`](BitStream::offset)) is public by design: codecs
/// seek by assigning it, exactly like repositioning a file handle. Writes
/// extend the buffer as needed; reads past the written prefix observe zero
/// bits (the buffer is zero-filled), and reads past the allocated buffer
/// panic.
///
/// Only unsigned values up to 32 bits wide are supported. Wider data is the
/// responsibility of the codecs layered on top.
///
/// # Example
///
/// ```rust
/// use chatstats::bits::BitStream;
///
/// let mut stream = BitStream::new();
/// stream.set_bits(8, 0xAB);
/// stream.set_bits(16, 0xCDEF);
///
/// // Seek back and re-read.
/// stream.offset = 0;
/// assert_eq!(stream.get_bits(8), 0xAB);
/// assert_eq!(stream.get_bits(16), 0xCDEF);
/// ```
#[derive(Debug, Clone)]
pub struct BitStream {
    words: Vec<u32>,
    /// Read/write head. Bits are read or written starting from this offset.
    pub offset: BitAddress,
}

impl BitStream {
    /// Creates an empty stream with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        BitStream {
            words: vec![0; DEFAULT_WORDS],
            offset: 0,
        }
    }

    /// Creates a stream over an existing word buffer, cursor at zero.
    ///
    /// The buffer length is taken as the written prefix, so `offset` may be
    /// positioned anywhere inside it for reading.
    #[must_use]
    pub fn from_words(words: Vec<u32>) -> Self {
        BitStream { words, offset: 0 }
    }

    /// Creates a stream from raw little-endian bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ChatstatsError::UnalignedBuffer`] if `bytes` is not a
    /// multiple of 4 bytes, since the backing buffer is word-addressed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(ChatstatsError::UnalignedBuffer { len: bytes.len() });
        }

        let words = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(BitStream { words, offset: 0 })
    }

    /// Length of the written prefix in bytes, rounded up to whole words.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.offset.div_ceil(32) * 4
    }

    /// Copies the written prefix out as little-endian bytes.
    ///
    /// The result is aligned to 32 bits and can be fed back through
    /// [`BitStream::from_bytes`].
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let word_len = self.offset.div_ceil(32);
        let mut bytes = Vec::with_capacity(word_len * 4);
        for word in &self.words[..word_len] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Grows the buffer so another write of up to 32 bits always fits.
    fn grow(&mut self) {
        let new_len = self.words.len() + self.words.len() / 2;
        self.words.resize(new_len.max(DEFAULT_WORDS), 0);
    }

    /// Writes the lowest `bits` bits of `value` at the cursor and advances it.
    ///
    /// `bits` must be at most 32; higher bits of `value` are masked off.
    pub fn set_bits(&mut self, bits: u32, value: u32) {
        debug_assert!(bits <= 32, "writes are limited to 32 bits, got {bits}");
        if bits == 0 {
            return;
        }

        let offset = self.offset;
        self.offset += bits as usize;

        if self.offset + 32 > self.words.len() * 32 {
            self.grow();
        }

        let mask = width_mask(bits);
        let value = value & mask;

        let aligned = offset >> 5;
        let delta = (offset & 31) as u32;

        if delta + bits > 32 {
            // Cross boundary: high part ends the current word, low part
            // starts the next one.
            let corr = bits - (32 - delta);
            self.words[aligned] = (self.words[aligned] & !(mask >> corr)) | (value >> corr);
            self.words[aligned + 1] =
                (self.words[aligned + 1] & !(mask << (32 - corr))) | (value << (32 - corr));
        } else {
            let corr = 32 - delta - bits;
            self.words[aligned] = (self.words[aligned] & !(mask << corr)) | (value << corr);
        }
    }

    /// Reads `bits` bits at the cursor and advances it.
    pub fn get_bits(&mut self, bits: u32) -> u32 {
        debug_assert!(bits <= 32, "reads are limited to 32 bits, got {bits}");
        let value = read_bits_at(&self.words, self.offset, bits);
        self.offset += bits as usize;
        value
    }

    /// Writes a variable-length integer, bounded by `max_bits`.
    ///
    /// Values that fit in fewer than 10 bits are stored fixed-width; anything
    /// wider uses 7-bit continuation groups, costing 8 bits per started
    /// group.
    pub fn write_varint(&mut self, value: u32, max_bits: u32) {
        if max_bits < 10 {
            self.set_bits(max_bits, value);
            return;
        }

        let mut value = value;
        while value > 127 {
            self.set_bits(8, (value & 127) | 128);
            value >>= 7;
        }
        self.set_bits(8, value);
    }

    /// Reads a variable-length integer written by [`write_varint`].
    ///
    /// [`write_varint`]: BitStream::write_varint
    pub fn read_varint(&mut self, max_bits: u32) -> u32 {
        read_varint_with(|bits| self.get_bits(bits), max_bits)
    }

    /// A read-only cursor over this stream, starting at bit zero.
    #[must_use]
    pub fn reader(&self) -> BitReader<'_> {
        BitReader {
            words: &self.words,
            offset: 0,
        }
    }

    /// A read-only cursor positioned at `addr`.
    #[must_use]
    pub fn reader_at(&self, addr: BitAddress) -> BitReader<'_> {
        BitReader {
            words: &self.words,
            offset: addr,
        }
    }
}

impl Default for BitStream {
    fn default() -> Self {
        BitStream::new()
    }
}

// ============================================================================
// BitReader
// ============================================================================

/// A borrowed read cursor over a finished [`BitStream`].
///
/// Readers are cheap (a slice and an offset) and independent: each query
/// thread, and each scan within a thread, gets its own. Decoders share one
/// reader and communicate through its cursor position, which is why most
/// decoding APIs in this crate take `&mut BitReader`.
///
/// Use [`checkpoint`](BitReader::checkpoint) to wander off (for example to
/// follow a reply reference) and come back automatically.
#[derive(Debug)]
pub struct BitReader<'a> {
    words: &'a [u32],
    /// Read head. Bits are read starting from this offset.
    pub offset: BitAddress,
}

impl<'a> BitReader<'a> {
    /// Creates a reader over a raw word buffer.
    #[must_use]
    pub fn new(words: &'a [u32]) -> Self {
        BitReader { words, offset: 0 }
    }

    /// Reads `bits` bits at the cursor and advances it.
    pub fn get_bits(&mut self, bits: u32) -> u32 {
        debug_assert!(bits <= 32, "reads are limited to 32 bits, got {bits}");
        let value = read_bits_at(self.words, self.offset, bits);
        self.offset += bits as usize;
        value
    }

    /// Reads a variable-length integer, bounded by `max_bits`.
    pub fn read_varint(&mut self, max_bits: u32) -> u32 {
        read_varint_with(|bits| self.get_bits(bits), max_bits)
    }

    /// Saves the cursor and returns a guard that restores it on drop.
    ///
    /// The guard dereferences to the reader itself, so scoped excursions
    /// read naturally:
    ///
    /// ```rust
    /// use chatstats::bits::BitStream;
    ///
    /// let mut stream = BitStream::new();
    /// stream.set_bits(16, 500);
    /// stream.set_bits(16, 900);
    ///
    /// let mut reader = stream.reader();
    /// {
    ///     let mut peek = reader.checkpoint();
    ///     peek.offset = 16;
    ///     assert_eq!(peek.get_bits(16), 900);
    /// }
    /// // Cursor is back where it was.
    /// assert_eq!(reader.offset, 0);
    /// assert_eq!(reader.get_bits(16), 500);
    /// ```
    pub fn checkpoint(&mut self) -> Checkpoint<'_, 'a> {
        let saved = self.offset;
        Checkpoint {
            reader: self,
            saved,
        }
    }
}

/// Cursor guard created by [`BitReader::checkpoint`].
///
/// Restores the saved offset when dropped, on every exit path.
#[derive(Debug)]
pub struct Checkpoint<'r, 'a> {
    reader: &'r mut BitReader<'a>,
    saved: BitAddress,
}

impl<'a> std::ops::Deref for Checkpoint<'_, 'a> {
    type Target = BitReader<'a>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl std::ops::DerefMut for Checkpoint<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl Drop for Checkpoint<'_, '_> {
    fn drop(&mut self) {
        self.reader.offset = self.saved;
    }
}

// ============================================================================
// Tests
// ============================================================================
