//! Packed 2-state bit vectors chunked in 32-bit machine words.
//!
//! [`Bits`] is the value representation shared between the simulation kernel
//! and the circuit evaluator. Wide signals span multiple words, matching the
//! chunked storage layout a native evaluator exposes for its current/next
//! value arrays.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Number of bits packed per storage word.
pub const BITS_PER_WORD: u32 = 32;

/// A 2-state bit vector packed into 32-bit words.
///
/// Bit 0 is the least significant bit. Bits beyond `width` in the last word
/// are kept zero, so whole-word comparison is value comparison.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    width: u32,
    words: Vec<u32>,
}

impl Bits {
    /// Creates a new `Bits` of the given width, initialized to all zeros.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            words: vec![0; word_count(width)],
        }
    }

    /// Returns the number of bits in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the number of storage words backing this vector.
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    /// Gets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        (self.words[(index / BITS_PER_WORD) as usize] >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Sets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = &mut self.words[(index / BITS_PER_WORD) as usize];
        let mask = 1u32 << (index % BITS_PER_WORD);
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Creates a single-bit `Bits` from a boolean value.
    pub fn from_bool(value: bool) -> Self {
        let mut b = Self::new(1);
        b.set(0, value);
        b
    }

    /// Creates a `Bits` from a `u64` value with the given width.
    ///
    /// Bits of `value` beyond the given width are truncated.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut b = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                b.set(i, true);
            }
        }
        b
    }

    /// Converts the vector to a `u64`.
    ///
    /// Returns `None` if the width exceeds 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for (i, &word) in self.words.iter().enumerate() {
            result |= (word as u64) << (i as u32 * BITS_PER_WORD);
        }
        Some(result)
    }

    /// Returns true if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the backing words, least significant word first.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Overwrites this vector from a word slice, masking the final word.
    ///
    /// # Panics
    ///
    /// Panics if `words` has a different length than the backing storage.
    pub fn copy_from_words(&mut self, words: &[u32]) {
        assert_eq!(words.len(), self.words.len(), "word count mismatch");
        self.words.copy_from_slice(words);
        self.mask_top_word();
    }

    /// Clears bits beyond `width` in the final word.
    fn mask_top_word(&mut self) {
        let rem = self.width % BITS_PER_WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u32 << rem) - 1;
            }
        }
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({self})")
    }
}

impl BitAnd for &Bits {
    type Output = Bits;

    fn bitand(self, rhs: Self) -> Bits {
        assert_eq!(self.width, rhs.width, "Bits width mismatch in AND");
        let mut result = Bits::new(self.width);
        for (i, w) in result.words.iter_mut().enumerate() {
            *w = self.words[i] & rhs.words[i];
        }
        result
    }
}

impl BitOr for &Bits {
    type Output = Bits;

    fn bitor(self, rhs: Self) -> Bits {
        assert_eq!(self.width, rhs.width, "Bits width mismatch in OR");
        let mut result = Bits::new(self.width);
        for (i, w) in result.words.iter_mut().enumerate() {
            *w = self.words[i] | rhs.words[i];
        }
        result
    }
}

impl BitXor for &Bits {
    type Output = Bits;

    fn bitxor(self, rhs: Self) -> Bits {
        assert_eq!(self.width, rhs.width, "Bits width mismatch in XOR");
        let mut result = Bits::new(self.width);
        for (i, w) in result.words.iter_mut().enumerate() {
            *w = self.words[i] ^ rhs.words[i];
        }
        result
    }
}

impl Not for &Bits {
    type Output = Bits;

    fn not(self) -> Bits {
        let mut result = Bits::new(self.width);
        for (i, w) in result.words.iter_mut().enumerate() {
            *w = !self.words[i];
        }
        result.mask_top_word();
        result
    }
}

/// Returns the number of u32 words needed to store `width` bits.
fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}
