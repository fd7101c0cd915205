//! Export artifacts built from the current result set.
//!
//! All exporters are pure over a [`ResultSetStore`] and never touch the
//! network. An empty result set is refused with
//! [`ExportError::EmptyResultSet`].

pub mod delimited;
pub mod snapshot;
pub mod workbook;

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::data::results::ResultSetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Csv,
    Xlsx,
    Png,
}

impl MediaKind {
    pub fn mime(self) -> &'static str {
        match self {
            MediaKind::Csv => "text/csv",
            MediaKind::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            MediaKind::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Csv => "csv",
            MediaKind::Xlsx => "xlsx",
            MediaKind::Png => "png",
        }
    }

    pub fn filter_name(self) -> &'static str {
        match self {
            MediaKind::Csv => "CSV",
            MediaKind::Xlsx => "Excel Workbook",
            MediaKind::Png => "PNG image",
        }
    }
}

/// An exported file, kept in memory until the user saves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: &'static str,
    pub media: MediaKind,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("there are no results to export")]
    EmptyResultSet,

    #[error("writing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("writing workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("encoding image: {0}")]
    Image(#[from] image::ImageError),

    #[error("snapshot is {width}x{height} but carries {len} bytes")]
    SurfaceSize {
        width: usize,
        height: usize,
        len: usize,
    },
}

fn ensure_rows(store: &ResultSetStore) -> Result<(), ExportError> {
    if store.is_empty() {
        return Err(ExportError::EmptyResultSet);
    }
    Ok(())
}

/// Write an artifact to `path`.
pub fn save_artifact(artifact: &ExportArtifact, path: &Path) -> Result<()> {
    std::fs::write(path, &artifact.bytes)
        .with_context(|| format!("saving {} to {}", artifact.filename, path.display()))?;
    log::info!(
        "saved {} ({} bytes) to {}",
        artifact.filename,
        artifact.bytes.len(),
        path.display()
    );
    Ok(())
}
