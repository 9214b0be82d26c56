//! Core count types.
//!
//! Everything the engine aggregates is a pair of counts: words and
//! characters. A line carries one pair, a section carries two (its own lines
//! and the rollup including nested sections), and a list block carries the
//! character total of the item and its children.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Word and character counts.
///
/// Characters are Unicode scalar values of the (masked) text, not bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counts {
    /// Number of word-pattern matches
    pub words: u64,
    /// Number of characters
    pub chars: u64,
}

impl Counts {
    /// Create a new Counts with all zeros.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counts from explicit values.
    pub fn of(words: u64, chars: u64) -> Self {
        Self { words, chars }
    }

    /// True when both counts are zero.
    pub fn is_zero(&self) -> bool {
        self.words == 0 && self.chars == 0
    }
}

impl Add for Counts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            words: self.words + other.words,
            chars: self.chars + other.chars,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, other: Self) {
        self.words += other.words;
        self.chars += other.chars;
    }
}

impl Sub for Counts {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            words: self.words.saturating_sub(other.words),
            chars: self.chars.saturating_sub(other.chars),
        }
    }
}

impl SubAssign for Counts {
    fn sub_assign(&mut self, other: Self) {
        self.words = self.words.saturating_sub(other.words);
        self.chars = self.chars.saturating_sub(other.chars);
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + c)
    }
}

/// Cached statistics for one document line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Counts of the line after masking
    pub counts: Counts,
    /// Whether an excluded span touched this line when the record was computed
    pub masked: bool,
    /// Structural state at the end of the line when the record was masked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_state: Option<u64>,
}

impl LineRecord {
    /// Record for a line with no excluded spans.
    pub fn plain(counts: Counts) -> Self {
        Self {
            counts,
            masked: false,
            block_state: None,
        }
    }
}
