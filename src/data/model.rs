use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue – a single cell in a result row
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value as sent by the query service.
///
/// The service serializes a Pandas frame with `orient="records"`, so cells are
/// JSON scalars. Variant order matters for the untagged decoding: integers are
/// tried before floats so `120000` stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rows and sheets
// ---------------------------------------------------------------------------

/// One row returned by a search: column name → value, in the order the
/// service sent the keys.
pub type ResultRow = IndexMap<String, CellValue>;

/// A sheet the user picked, with the columns the service discovered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMetadata {
    pub name: String,
    /// Ordered column names, as the service reported them.
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// StagedFile – the spreadsheet waiting to be uploaded
// ---------------------------------------------------------------------------

/// A spreadsheet picked by the user and held in memory until upload.
///
/// The bytes are shared so re-uploading or cloning the session state does not
/// copy the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

impl StagedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a spreadsheet from disk. The contents are not inspected.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading spreadsheet {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.xlsx")
            .to_string();
        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}
