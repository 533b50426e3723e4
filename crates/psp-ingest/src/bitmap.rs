#![forbid(unsafe_code)]

use crate::error::{IngestError, IngestResult};

/// A compact bit vector used for per-cell validity.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl BitVec {
    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            len: 0,
            ones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow to `bits`, filling new positions with `false`. Never shrinks.
    pub fn grow(&mut self, bits: usize) {
        if bits <= self.len {
            return;
        }
        self.words.resize(bits.div_ceil(64), 0);
        self.len = bits;
    }

    pub fn truncate(&mut self, bits: usize) {
        if bits >= self.len {
            return;
        }
        for idx in bits..self.len {
            self.set(idx, false);
        }
        self.words.truncate(bits.div_ceil(64));
        self.len = bits;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / 64];
        let bit = index % 64;
        ((word >> bit) & 1) == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word_idx = index / 64;
        let bit = index % 64;
        let mask = 1u64 << bit;
        let was_set = (self.words[word_idx] & mask) != 0;

        match (was_set, value) {
            (true, false) => {
                self.words[word_idx] &= !mask;
                self.ones -= 1;
            }
            (false, true) => {
                self.words[word_idx] |= mask;
                self.ones += 1;
            }
            _ => {}
        }
    }

    pub fn set_range(&mut self, start: usize, len: usize, value: bool) {
        for idx in start..start + len {
            self.set(idx, value);
        }
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }
}

/// Borrowed view over a producer-supplied validity bitmap.
///
/// Bit `idx & 7` of byte `idx >> 3` (LSB first) is set iff row `idx` is valid.
#[derive(Clone, Copy, Debug)]
pub struct NullMask<'a> {
    bytes: &'a [u8],
    len: usize,
}

impl<'a> NullMask<'a> {
    /// Wrap `bytes` as the mask for `len` rows; the buffer must cover every row.
    pub fn new(bytes: &'a [u8], len: usize) -> IngestResult<Self> {
        let needed = len.div_ceil(8);
        if bytes.len() < needed {
            return Err(IngestError::SizeMismatch {
                what: "null mask bytes",
                expected: needed,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "NullMask index out of bounds");
        (self.bytes[idx >> 3] & (1u8 << (idx & 7))) != 0
    }
}

/// Pack row validity into the producer bitmap layout understood by [`NullMask`].
pub fn encode_null_mask<I>(valid: I) -> Vec<u8>
where
    I: IntoIterator<Item = bool>,
{
    let mut out = Vec::new();
    for (idx, is_valid) in valid.into_iter().enumerate() {
        if idx % 8 == 0 {
            out.push(0u8);
        }
        if is_valid {
            if let Some(last) = out.last_mut() {
                *last |= 1u8 << (idx & 7);
            }
        }
    }
    out
}
