//! Engine configuration.
//!
//! [`Settings`] is handed to the engine explicitly (at construction and on
//! every change); nothing reads configuration from global state. Settings
//! files are JSON with camelCase keys, and unknown keys are ignored so a
//! host can keep its own options in the same file.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SectionCountError;
use crate::Result;

/// What the per-section annotations show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionCountDisplayMode {
    /// No annotations at all
    #[default]
    #[serde(rename = "disable", alias = "disabled")]
    Disabled,
    /// Word counts
    Words,
    /// Character counts (and list aggregates, when enabled)
    #[serde(alias = "chars")]
    Characters,
}

impl SectionCountDisplayMode {
    pub fn is_enabled(self) -> bool {
        self != SectionCountDisplayMode::Disabled
    }
}

impl FromStr for SectionCountDisplayMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "disabled" | "off" => Ok(SectionCountDisplayMode::Disabled),
            "words" | "word" => Ok(SectionCountDisplayMode::Words),
            "characters" | "chars" => Ok(SectionCountDisplayMode::Characters),
            _ => Err(format!("Unknown display mode: {}", s)),
        }
    }
}

/// Configuration consumed by the engine and the status tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Strip comment spans before counting
    pub count_comments: bool,
    /// Annotation mode
    pub section_count_display_mode: SectionCountDisplayMode,
    /// Aggregate top-level list blocks (characters mode only)
    pub display_top_level_list_character_counts: bool,
    /// Words per page for status reporting
    pub page_words: u64,
    /// Documents longer than this are rescanned in chunks of this many lines
    pub rescan_chunk_lines: usize,
    /// Quiet interval before background counting, in milliseconds
    pub debounce_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            count_comments: false,
            section_count_display_mode: SectionCountDisplayMode::Disabled,
            display_top_level_list_character_counts: false,
            page_words: 300,
            rescan_chunk_lines: 2000,
            debounce_ms: 200,
        }
    }
}

impl Settings {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SectionCountError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse settings from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| SectionCountError::Settings(e.to_string()))
    }

    /// Builder: enable or disable comment stripping
    pub fn count_comments(mut self, enabled: bool) -> Self {
        self.count_comments = enabled;
        self
    }

    /// Builder: set the display mode
    pub fn mode(mut self, mode: SectionCountDisplayMode) -> Self {
        self.section_count_display_mode = mode;
        self
    }

    /// Builder: enable or disable list aggregates
    pub fn list_counts(mut self, enabled: bool) -> Self {
        self.display_top_level_list_character_counts = enabled;
        self
    }

    /// Builder: set words per page
    pub fn page_words(mut self, words: u64) -> Self {
        self.page_words = words;
        self
    }

    /// Builder: set the rescan chunk size
    pub fn rescan_chunk_lines(mut self, lines: usize) -> Self {
        self.rescan_chunk_lines = lines;
        self
    }

    /// Builder: set the debounce interval
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Whether list aggregates are produced under these settings.
    pub fn lists_active(&self) -> bool {
        self.section_count_display_mode == SectionCountDisplayMode::Characters
            && self.display_top_level_list_character_counts
    }

    /// Whether going from `self` to `next` invalidates every cached line record.
    pub fn requires_rescan(&self, next: &Settings) -> bool {
        next.section_count_display_mode.is_enabled()
            && (self.count_comments != next.count_comments
                || !self.section_count_display_mode.is_enabled())
    }
}
