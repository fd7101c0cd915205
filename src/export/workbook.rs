use rust_xlsxwriter::Workbook;

use super::{ensure_rows, ExportArtifact, ExportError, MediaKind};
use crate::data::model::CellValue;
use crate::data::results::ResultSetStore;

pub const FILENAME: &str = "results.xlsx";
pub const SHEET_NAME: &str = "Results";

/// Single-sheet workbook: header row from the row keys, then one row per
/// record with native cell types (numbers stay numbers).
pub fn export_workbook(store: &ResultSetStore) -> Result<ExportArtifact, ExportError> {
    ensure_rows(store)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in store.headers().iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }

    for (idx, row) in store.rows().iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, cell) in store.row_cells(row).enumerate() {
            let c = col as u16;
            match cell.as_ref() {
                CellValue::String(s) => {
                    sheet.write_string(r, c, s)?;
                }
                CellValue::Integer(i) => {
                    sheet.write_number(r, c, *i as f64)?;
                }
                CellValue::Float(v) => {
                    sheet.write_number(r, c, *v)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(r, c, *b)?;
                }
                CellValue::Null => {}
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    log::debug!("built workbook with {} rows ({} bytes)", store.len(), bytes.len());

    Ok(ExportArtifact {
        filename: FILENAME,
        media: MediaKind::Xlsx,
        bytes,
    })
}
