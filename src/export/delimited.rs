use csv::{QuoteStyle, Terminator, WriterBuilder};

use super::{ensure_rows, ExportArtifact, ExportError, MediaKind};
use crate::data::results::ResultSetStore;

pub const FILENAME: &str = "results.csv";

/// Every field quoted, one record per line, header first.
///
/// Cells are normalized the same way the table shows them. Embedded quotes
/// are doubled so the file stays readable by any CSV parser.
pub fn export_delimited(store: &ResultSetStore) -> Result<ExportArtifact, ExportError> {
    ensure_rows(store)?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(store.headers())?;
    for row in store.rows() {
        writer.write_record(store.row_cells(row).map(|cell| cell.to_string()))?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    // Records are newline-joined, not newline-terminated.
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    Ok(ExportArtifact {
        filename: FILENAME,
        media: MediaKind::Csv,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, ResultRow};

    fn store(rows: &[&[(&str, CellValue)]]) -> ResultSetStore {
        ResultSetStore::new(
            rows.iter()
                .map(|pairs| {
                    pairs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect::<ResultRow>()
                })
                .collect(),
        )
    }

    fn text(artifact: &ExportArtifact) -> &str {
        std::str::from_utf8(&artifact.bytes).unwrap()
    }

    #[test]
    fn quotes_every_field() {
        let s = store(&[
            &[("village", "Pune".into()), ("population", CellValue::Integer(120000))],
            &[("village", "Nashik".into()), ("population", CellValue::Integer(90000))],
        ]);
        let artifact = export_delimited(&s).unwrap();

        assert_eq!(artifact.filename, "results.csv");
        assert_eq!(artifact.media.mime(), "text/csv");
        assert_eq!(
            text(&artifact),
            "\"village\",\"population\"\n\"Pune\",\"120000\"\n\"Nashik\",\"90000\""
        );
    }

    #[test]
    fn dates_and_nulls_are_presented() {
        let s = store(&[&[
            ("when", "2024-03-05T10:00:00".into()),
            ("note", CellValue::Null),
        ]]);
        assert_eq!(
            text(&export_delimited(&s).unwrap()),
            "\"when\",\"note\"\n\"05-03-2024\",\"\""
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let s = store(&[&[("name", "The \"Old\" Mill".into())]]);
        assert_eq!(
            text(&export_delimited(&s).unwrap()),
            "\"name\"\n\"The \"\"Old\"\" Mill\""
        );
    }

    #[test]
    fn round_trips_plain_values() {
        let rows: &[&[(&str, CellValue)]] = &[
            &[("village", "Pune".into()), ("population", CellValue::Integer(120000)), ("state", "MH".into())],
            &[("village", "Surat".into()), ("population", CellValue::Integer(450)), ("state", "GJ".into())],
        ];
        let s = store(rows);
        let artifact = export_delimited(&s).unwrap();

        let mut reader = csv::Reader::from_reader(artifact.bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(headers, s.headers());

        let parsed: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        let expected: Vec<Vec<String>> = rows
            .iter()
            .map(|pairs| pairs.iter().map(|(_, v)| v.to_string()).collect())
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn empty_set_is_refused() {
        assert!(matches!(
            export_delimited(&ResultSetStore::default()),
            Err(ExportError::EmptyResultSet)
        ));
    }
}
