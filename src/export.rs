//! CSV export
//!
//! Serializes processed rows into the downloadable `processed_data.csv`
//! artifact: UTF-8 with a leading byte-order mark, `\n` between records and
//! no trailing newline. Header names come from the first row's own key order.
//! Every data field is quoted; header names are quoted only when they contain
//! a delimiter, quote or line break.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{cell_text, Row};

pub const CSV_FILE_NAME: &str = "processed_data.csv";
pub const CSV_MIME_TYPE: &str = "text/csv;charset=utf-8;";
pub const NOTHING_TO_EXPORT: &str = "No data available for download.";

const BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("exported text is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// A serialized CSV file ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    text: String,
}

impl CsvDocument {
    /// Full text, including the byte-order mark
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn file_name(&self) -> &'static str {
        CSV_FILE_NAME
    }

    pub fn mime_type(&self) -> &'static str {
        CSV_MIME_TYPE
    }
}

/// Serialize rows. Returns `Ok(None)` when there is nothing to export
/// (no rows, or a first row without any columns).
pub fn serialize(rows: &[Row]) -> Result<Option<CsvDocument>, ExportError> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();
    if header.is_empty() {
        return Ok(None);
    }

    let mut header_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header_writer.write_record(&header)?;
    let buffer = header_writer.into_inner().map_err(|e| e.into_error())?;

    let mut body_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for row in rows {
        let fields = header
            .iter()
            .map(|key| row.get(*key).map(cell_text).unwrap_or_default());
        body_writer.write_record(fields.map(|field| field.into_owned()))?;
    }
    let mut buffer = body_writer.into_inner().map_err(|e| e.into_error())?;

    if buffer.last() == Some(&b'\n') {
        buffer.pop();
    }

    let mut text = String::with_capacity(buffer.len() + BOM.len_utf8());
    text.push(BOM);
    text.push_str(&String::from_utf8(buffer)?);

    debug!(rows = rows.len(), columns = header.len(), bytes = text.len(), "serialized CSV");
    Ok(Some(CsvDocument { text }))
}

/// Save a document into `dir` under its file name.
///
/// The bytes are first written to a temporary file in the same directory,
/// which is moved into place on success and removed on any failure.
pub fn download(document: &CsvDocument, dir: &Path) -> Result<PathBuf, ExportError> {
    let mut staged = tempfile::Builder::new()
        .prefix(".processed_data")
        .suffix(".part")
        .tempfile_in(dir)?;

    staged.write_all(document.bytes())?;
    staged.as_file().sync_all()?;

    let target = dir.join(document.file_name());
    staged.persist(&target).map_err(|e| e.error)?;

    info!(path = %target.display(), bytes = document.bytes().len(), "download saved");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    fn decode(text: &str) -> Vec<Vec<String>> {
        let body = text.strip_prefix(BOM).unwrap();
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_empty_rows_produce_no_document() {
        assert_eq!(serialize(&[]).unwrap(), None);
        assert_eq!(serialize(&rows(json!([{}]))).unwrap(), None);
    }

    #[test]
    fn test_email_rows_exact_text() {
        let doc = serialize(&rows(json!([{"email": "a@b.com"}, {"email": "c@d.com"}])))
            .unwrap()
            .unwrap();

        assert_eq!(doc.text(), "\u{feff}email\n\"a@b.com\"\n\"c@d.com\"");
        assert_eq!(&doc.bytes()[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(doc.file_name(), "processed_data.csv");
        assert_eq!(doc.mime_type(), "text/csv;charset=utf-8;");
    }

    #[test]
    fn test_quotes_are_doubled_and_round_trip() {
        let original = "a\",\" b";
        let doc = serialize(&rows(json!([{"v": original}]))).unwrap().unwrap();

        assert_eq!(doc.text(), "\u{feff}v\n\"a\"\",\"\" b\"");
        assert_eq!(decode(doc.text()), vec![vec!["v".to_string()], vec![original.to_string()]]);
    }

    #[test]
    fn test_header_order_follows_first_row() {
        let doc = serialize(&rows(json!([
            {"b": 1, "a": "x"},
            {"a": "y", "b": 2, "c": "ignored"},
            {"a": null}
        ])))
        .unwrap()
        .unwrap();

        assert_eq!(
            doc.text(),
            "\u{feff}b,a\n\"1\",\"x\"\n\"2\",\"y\"\n\"\",\"\""
        );
    }

    #[test]
    fn test_scalars_and_multiline_values_round_trip() {
        let doc = serialize(&rows(json!([
            {"name, full": "Ann\nLee", "score": 0, "ok": false, "note": "say \"hi\"\r\n"}
        ])))
        .unwrap()
        .unwrap();

        let decoded = decode(doc.text());
        assert_eq!(decoded[0], vec!["name, full", "score", "ok", "note"]);
        assert_eq!(decoded[1], vec!["Ann\nLee", "0", "false", "say \"hi\"\r\n"]);
    }

    #[test]
    fn test_whole_float_cells_export_as_integers() {
        let doc = serialize(&rows(json!([{"age": 25.0, "score": 2.5}, {"age": null, "score": 3}])))
            .unwrap()
            .unwrap();

        assert_eq!(doc.text(), "\u{feff}age,score\n\"25\",\"2.5\"\n\"\",\"3\"");
    }

    #[test]
    fn test_download_writes_file_and_leaves_no_temporaries() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = serialize(&rows(json!([{"email": "a@b.com"}]))).unwrap().unwrap();

        let path = download(&doc, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("processed_data.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), doc.bytes());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_download_overwrites_previous_export() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = serialize(&rows(json!([{"v": "old"}]))).unwrap().unwrap();
        let second = serialize(&rows(json!([{"v": "new"}]))).unwrap().unwrap();

        download(&first, dir.path()).unwrap();
        let path = download(&second, dir.path()).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), second.text());
    }

    #[test]
    fn test_failed_persist_removes_staged_file() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(CSV_FILE_NAME)).unwrap();
        let doc = serialize(&rows(json!([{"v": "x"}]))).unwrap().unwrap();

        let err = download(&doc, dir.path()).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![CSV_FILE_NAME.to_string()]);
        assert!(dir.path().join(CSV_FILE_NAME).is_dir());
    }

    #[test]
    fn test_download_into_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let doc = serialize(&rows(json!([{"v": "x"}]))).unwrap().unwrap();

        let err = download(&doc, &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
