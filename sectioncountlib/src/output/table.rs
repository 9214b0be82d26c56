//! Table-ready data for status totals.
//!
//! `CountTable` is a presentation-ready structure that the CLI prints or
//! serializes to JSON. It only formats numbers into strings; all counting
//! happens before a table is built.

use serde::{Deserialize, Serialize};

use crate::query::status::StatusTotals;

/// A single row in the table (data row or footer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRow {
    /// Row label (file path or "Total (N files)")
    pub label: String,
    /// Values for each column, ready for display
    pub values: Vec<String>,
}

/// Table of per-file status totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTable {
    /// Column headers: ["File", "Words", "Characters", "Pages"]
    pub headers: Vec<String>,
    /// One row per document
    pub rows: Vec<TableRow>,
    /// Sum over all rows
    pub footer: TableRow,
}

impl CountTable {
    /// Build a table from labelled totals.
    ///
    /// Pages are computed per row and for the footer from the summed word
    /// count, so the footer is not necessarily the sum of the page column.
    pub fn from_totals(items: &[(String, StatusTotals)], page_words: u64) -> Self {
        let rows: Vec<TableRow> = items
            .iter()
            .map(|(label, totals)| TableRow {
                label: label.clone(),
                values: format_totals(totals, page_words),
            })
            .collect();

        let sum = items.iter().fold(StatusTotals::default(), |acc, (_, t)| StatusTotals {
            words: acc.words + t.words,
            characters: acc.characters + t.characters,
        });

        CountTable {
            headers: ["File", "Words", "Characters", "Pages"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            footer: TableRow {
                label: format!("Total ({} files)", rows.len()),
                values: format_totals(&sum, page_words),
            },
            rows,
        }
    }
}

fn format_totals(totals: &StatusTotals, page_words: u64) -> Vec<String> {
    vec![
        totals.words.to_string(),
        totals.characters.to_string(),
        totals.pages(page_words).to_string(),
    ]
}
