use std::borrow::Cow;

use chrono::NaiveDateTime;
use indexmap::IndexSet;
use serde::Deserialize;

use super::model::{CellValue, ResultRow};

/// Length of the `YYYY-MM-DDTHH:MM:SS` prefix recognised as a date-time.
const ISO_PREFIX_LEN: usize = 19;

// ---------------------------------------------------------------------------
// Layout mode
// ---------------------------------------------------------------------------

/// How the result set is presented. Switching never touches the rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Tabular,
    PerRecord,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            LayoutMode::Tabular => LayoutMode::PerRecord,
            LayoutMode::PerRecord => LayoutMode::Tabular,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::Tabular => "Table",
            LayoutMode::PerRecord => "Cards",
        }
    }
}

// ---------------------------------------------------------------------------
// ResultSetStore
// ---------------------------------------------------------------------------

/// Rows of the last successful search plus the views derived from them.
///
/// Headers are the union of all row keys in first-seen order, so the first
/// row's key order always leads and keys that only appear in later rows are
/// appended instead of dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSetStore {
    rows: Vec<ResultRow>,
    headers: Vec<String>,
    layout: LayoutMode,
}

impl ResultSetStore {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self::with_layout(rows, LayoutMode::default())
    }

    pub fn with_layout(rows: Vec<ResultRow>, layout: LayoutMode) -> Self {
        let headers = collect_headers(&rows);
        Self {
            rows,
            headers,
            layout,
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn set_layout(&mut self, layout: LayoutMode) {
        self.layout = layout;
    }

    /// Normalized cells of `row` in header order. Keys missing from the row
    /// come back as [`CellValue::Null`].
    pub fn row_cells<'a>(&'a self, row: &'a ResultRow) -> impl Iterator<Item = Cow<'a, CellValue>> {
        self.headers.iter().map(move |h| match row.get(h) {
            Some(value) => normalized_cell(value),
            None => Cow::Owned(CellValue::Null),
        })
    }
}

fn collect_headers(rows: &[ResultRow]) -> Vec<String> {
    let mut seen: IndexSet<&str> = IndexSet::new();
    for row in rows {
        seen.extend(row.keys().map(String::as_str));
    }
    seen.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Cell normalization
// ---------------------------------------------------------------------------

/// Presentation form of a cell.
///
/// Strings that start with an ISO-8601 date-time are shown as `DD-MM-YYYY`
/// using the calendar date as written (no timezone shift). Everything else is
/// returned untouched, so already formatted dates pass through.
pub fn normalized_cell(value: &CellValue) -> Cow<'_, CellValue> {
    match value.as_str().and_then(iso_date_prefix) {
        Some(dt) => Cow::Owned(CellValue::String(dt.format("%d-%m-%Y").to_string())),
        None => Cow::Borrowed(value),
    }
}

fn iso_date_prefix(s: &str) -> Option<NaiveDateTime> {
    let prefix = s.get(..ISO_PREFIX_LEN)?;
    let shape_ok = prefix.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 => b == b'-',
        10 => b == b'T',
        13 | 16 => b == b':',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S").ok()
}
