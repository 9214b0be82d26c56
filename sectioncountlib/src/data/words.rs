//! Word and character counting.
//!
//! A word is a maximal match of a Unicode-aware token pattern:
//!
//! - runs of letters (any script, combining marks included) joined with
//!   numbers and internal hyphens/apostrophes, e.g. `well-known`, `it’s`,
//!   `3,000.50`, `abc123`
//! - a single character of the scripts that are written without spaces
//!   (Han ideographs, Hiragana, Katakana, Tibetan syllables), so `日本語`
//!   counts as three words
//!
//! Characters are Unicode scalar values.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SectionCountError;
use crate::Result;

use super::stats::Counts;

/// Code points counted one word per character.
const PER_CHARACTER_SCRIPTS: &str = r"\u{0F00}\u{0F40}-\u{0F47}\u{0F49}-\u{0F6C}\u{0F88}-\u{0F8C}\u{3041}-\u{3096}\u{309D}-\u{309F}\u{30A1}-\u{30FA}\u{30FC}-\u{30FF}\u{4E00}-\u{9FD5}";

static WORD_PATTERN: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:[0-9]+(?:[,.][0-9]+)*|[\-'’[\p{{L}}\p{{M}}--[{PER_CHARACTER_SCRIPTS}]]])+|[{PER_CHARACTER_SCRIPTS}]"
    ))
});

/// The compiled word pattern.
pub fn word_pattern() -> Result<&'static Regex> {
    WORD_PATTERN
        .as_ref()
        .map_err(|e| SectionCountError::Pattern(e.to_string()))
}

/// Count the words in `text`.
///
/// # Example
///
/// ```rust
/// use sectioncountlib::count_words;
///
/// assert_eq!(count_words("a well-known fact").unwrap(), 3);
/// assert_eq!(count_words("日本語").unwrap(), 3);
/// ```
pub fn count_words(text: &str) -> Result<u64> {
    let pattern = word_pattern()?;
    Ok(pattern.find_iter(text).count() as u64)
}

/// Count the characters in `text`.
pub fn count_chars(text: &str) -> u64 {
    text.chars().count() as u64
}

/// Count words and characters of `text` in one call.
pub fn count_text(text: &str) -> Result<Counts> {
    Ok(Counts {
        words: count_words(text)?,
        chars: count_chars(text),
    })
}
