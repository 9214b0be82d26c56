//! Configuration and status queries.
//!
//! This module handles what the host asks of the engine outside of the
//! annotation pipeline. It provides:
//!
//! - **Options**: `Settings` and the annotation display mode
//! - **Status**: Document and selection totals backed by the background counter
//!
//! ## Example
//!
//! ```rust
//! use sectioncountlib::query::{SectionCountDisplayMode, Settings};
//!
//! let settings = Settings::new()
//!     .mode(SectionCountDisplayMode::Characters)
//!     .list_counts(true);
//! assert!(settings.lists_active());
//! ```

pub mod options;
pub mod status;

pub use options::{SectionCountDisplayMode, Settings};
pub use status::{StatusConsumer, StatusTotals, StatusTracker};
