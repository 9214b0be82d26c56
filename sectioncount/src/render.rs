//! Template contexts for CLI output rendered by outstanding

use console::Style;
use outstanding::Theme;
use sectioncountlib::{Annotation, CountTable, Document, StatusTotals};
use serde::Serialize;
use std::path::Path;

/// Include templates at compile time
pub const SECTIONS_TEMPLATE: &str = include_str!("../templates/sections.jinja");
pub const COUNT_TEMPLATE: &str = include_str!("../templates/count.jinja");
pub const REPLAY_TEMPLATE: &str = include_str!("../templates/replay.jinja");

/// Width of the label column in count tables
const NAME_WIDTH: usize = 48;
/// Width of each numeric column
const CELL_WIDTH: usize = 12;

/// One annotated line, pre-formatted
#[derive(Debug, Serialize)]
pub struct AnnotationLine {
    /// 1-based line number, right-aligned to the widest line number
    number: String,
    text: String,
    /// Text of the annotated line
    source: String,
}

/// Data context for the sections template
#[derive(Debug, Serialize)]
pub struct SectionsContext {
    lines: Vec<AnnotationLine>,
}

/// Column data for template rendering
#[derive(Debug, Serialize)]
struct TemplateColumn {
    name: String,
    /// Pre-formatted with padding
    formatted: String,
}

/// Row data for template rendering (pre-formatted)
#[derive(Debug, Serialize)]
struct TemplateRow {
    /// Pre-padded name (left-aligned, padded to NAME_WIDTH)
    name: String,
    /// Pre-padded cells (right-aligned, padded to CELL_WIDTH)
    cells: Vec<String>,
}

/// Totals of a line selection
#[derive(Debug, Clone, Serialize)]
pub struct SelectionLine {
    pub file: String,
    pub lines: String,
    pub words: u64,
    pub characters: u64,
    pub pages: u64,
}

/// Data context for the count template: either a table or a selection
#[derive(Debug, Default, Serialize)]
pub struct CountContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    selection: Option<SelectionLine>,
    name_header_formatted: String,
    columns: Vec<TemplateColumn>,
    separator: String,
    rows: Vec<TemplateRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<TemplateRow>,
}

impl CountContext {
    pub fn selection(&self) -> Option<&SelectionLine> {
        self.selection.as_ref()
    }
}

/// One replayed transaction
#[derive(Debug, Serialize)]
pub struct ReplayStepContext {
    header: String,
    lines: Vec<AnnotationLine>,
}

/// Data context for the replay template
#[derive(Debug, Serialize)]
pub struct ReplayContext {
    pub steps: Vec<ReplayStepContext>,
}

/// Create the theme with styles
pub fn create_theme() -> Theme {
    Theme::new()
        .add("category", Style::new().bold())
        .add("source", Style::new().dim())
}

/// Truncate a name to fit within max_len, adding ".." prefix if needed
fn truncate_name(name: &str, max_len: usize) -> String {
    let chars = name.chars().count();
    if chars > max_len {
        let tail: String = name.chars().skip(chars - max_len + 2).collect();
        format!("..{tail}")
    } else {
        name.to_string()
    }
}

/// Convert a path to a relative path from the base directory.
pub fn make_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Pair each annotation with the source line it sits on.
pub fn annotation_lines(annotations: &[Annotation], doc: &Document) -> Vec<AnnotationLine> {
    let width = doc.line_count().to_string().len();
    annotations
        .iter()
        .map(|annotation| AnnotationLine {
            number: format!("{:>width$}", annotation.line + 1),
            text: annotation.text.clone(),
            source: if annotation.line < doc.line_count() {
                doc.line(annotation.line).to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

pub fn sections_context(annotations: &[Annotation], doc: &Document) -> SectionsContext {
    SectionsContext {
        lines: annotation_lines(annotations, doc),
    }
}

pub fn replay_step(header: String, annotations: &[Annotation], doc: &Document) -> ReplayStepContext {
    ReplayStepContext {
        header,
        lines: annotation_lines(annotations, doc),
    }
}

fn to_template_row(label: &str, values: &[String]) -> TemplateRow {
    TemplateRow {
        name: format!("{:<width$}", truncate_name(label, NAME_WIDTH - 2), width = NAME_WIDTH),
        cells: values
            .iter()
            .map(|value| format!("{:>width$}", value, width = CELL_WIDTH))
            .collect(),
    }
}

/// Build the count table context from a [`CountTable`].
pub fn count_context(table: &CountTable) -> CountContext {
    let (name_header, column_names): (&str, &[String]) = match table.headers.split_first() {
        Some((first, rest)) => (first.as_str(), rest),
        None => ("", &[]),
    };

    let columns: Vec<TemplateColumn> = column_names
        .iter()
        .map(|name| TemplateColumn {
            name: name.clone(),
            formatted: format!("{:>width$}", name, width = CELL_WIDTH),
        })
        .collect();

    CountContext {
        selection: None,
        name_header_formatted: format!("{:<width$}", name_header, width = NAME_WIDTH),
        separator: "-".repeat(NAME_WIDTH + (CELL_WIDTH + 1) * columns.len()),
        columns,
        rows: table
            .rows
            .iter()
            .map(|row| to_template_row(&row.label, &row.values))
            .collect(),
        total: Some(to_template_row(&table.footer.label, &table.footer.values)),
    }
}

/// Build the count context for a line selection.
pub fn selection_context(file: &str, lines: &str, totals: StatusTotals, page_words: u64) -> CountContext {
    CountContext {
        selection: Some(SelectionLine {
            file: file.to_string(),
            lines: lines.to_string(),
            words: totals.words,
            characters: totals.characters,
            pages: totals.pages(page_words),
        }),
        ..CountContext::default()
    }
}
