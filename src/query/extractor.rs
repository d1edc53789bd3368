//! # Record Extractor
//!
//! Reads a JSON, JSON-Lines or CSV file and yields uniform records.
//!
//! ## JSON / JSON-Lines
//! Both extensions go through the same path. The whole file is first parsed
//! as one JSON value: an array yields one record per element, anything else
//! yields a single record. If that fails the file is read line by line and
//! every non-blank line is parsed on its own. Lines that do not parse are
//! skipped; partially malformed exports stay queryable.
//!
//! ## CSV
//! The first row is the header. Every later row becomes a record whose values
//! are all strings. Short rows are padded with null and extra cells are
//! dropped.
//!
//! Records are produced lazily, so a consumer that stops early never parses
//! the rest of a line-delimited or CSV file.

use std::fs::{self, File};
use std::path::Path;

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::record::{self, Record};
use crate::observability::{log_event_with_fields, Event};

/// Extractable file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.json` and `.jsonl`
    Json,
    /// `.csv`
    Csv,
}

impl Format {
    /// Infer the format from a file extension (ASCII case-insensitive)
    pub fn detect(path: &Path) -> QueryResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" | "jsonl" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            _ => Err(QueryError::UnsupportedFormat { extension }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

/// Stateless file-to-records reader
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Open `path` as `format` and return its records.
    ///
    /// Whole-file structural failures (unreadable file, invalid UTF-8,
    /// malformed CSV header) are reported here; CSV row failures surface as
    /// `Err` items from the iterator.
    pub fn extract(&self, path: &Path, format: Format) -> QueryResult<Records> {
        let inner = match format {
            Format::Json => Self::open_json(path)?,
            Format::Csv => Self::open_csv(path)?,
        };
        Ok(Records { inner })
    }

    fn open_json(path: &Path) -> QueryResult<Inner> {
        let bytes = fs::read(path)?;
        let mut content = String::from_utf8(bytes)
            .map_err(|e| QueryError::parse(path.display().to_string(), e.to_string()))?;

        if content.starts_with('\u{feff}') {
            content.drain(..'\u{feff}'.len_utf8());
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => Ok(Inner::Document(items.into_iter())),
            Ok(single) => Ok(Inner::Document(vec![single].into_iter())),
            Err(_) => Ok(Inner::Lines(JsonLines::new(path, content))),
        }
    }

    fn open_csv(path: &Path) -> QueryResult<Inner> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        Ok(Inner::Csv(CsvRows {
            path: path.display().to_string(),
            headers,
            rows: reader.into_records(),
        }))
    }
}

fn csv_error(path: &Path, err: csv::Error) -> QueryError {
    match err.kind() {
        csv::ErrorKind::Io(_) => QueryError::Io(err.to_string()),
        _ => QueryError::parse(path.display().to_string(), err.to_string()),
    }
}

/// Lazy record sequence produced by [`RecordExtractor::extract`]
pub struct Records {
    inner: Inner,
}

enum Inner {
    Document(std::vec::IntoIter<Value>),
    Lines(JsonLines),
    Csv(CsvRows),
}

impl Iterator for Records {
    type Item = QueryResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Document(values) => values.next().map(|v| Ok(record::from_value(v))),
            Inner::Lines(lines) => lines.next().map(Ok),
            Inner::Csv(rows) => rows.next(),
        }
    }
}

/// Line-delimited JSON over an already-read file
struct JsonLines {
    path: String,
    content: String,
    pos: usize,
    skipped: usize,
}

impl JsonLines {
    fn new(path: &Path, content: String) -> Self {
        Self {
            path: path.display().to_string(),
            content,
            pos: 0,
            skipped: 0,
        }
    }
}

impl Iterator for JsonLines {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while self.pos < self.content.len() {
            let rest = &self.content[self.pos..];
            let (line, advance) = match rest.find('\n') {
                Some(end) => (&rest[..end], end + 1),
                None => (rest, rest.len()),
            };
            self.pos += advance;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(value) => return Some(record::from_value(value)),
                Err(_) => self.skipped += 1,
            }
        }
        None
    }
}

impl Drop for JsonLines {
    fn drop(&mut self) {
        if self.skipped > 0 {
            let skipped = self.skipped.to_string();
            log_event_with_fields(
                Event::RecordsSkipped,
                &[("path", self.path.as_str()), ("skipped", skipped.as_str())],
            );
        }
    }
}

/// CSV rows keyed by the header
struct CsvRows {
    path: String,
    headers: Vec<String>,
    rows: csv::StringRecordsIntoIter<File>,
}

impl CsvRows {
    fn to_record(&self, row: &csv::StringRecord) -> Record {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = row
                    .get(i)
                    .map(|cell| Value::String(cell.to_string()))
                    .unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }
}

impl Iterator for CsvRows {
    type Item = QueryResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(QueryError::parse(self.path.clone(), e.to_string()))),
            };

            if row.is_empty() || (row.len() == 1 && row[0].is_empty()) {
                continue;
            }

            return Some(Ok(self.to_record(&row)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn extract_all(path: &Path) -> Vec<Record> {
        let format = Format::detect(path).unwrap();
        RecordExtractor::new()
            .extract(path, format)
            .unwrap()
            .collect::<QueryResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(Format::detect(Path::new("a.json")).unwrap(), Format::Json);
        assert_eq!(Format::detect(Path::new("a.JSONL")).unwrap(), Format::Json);
        assert_eq!(Format::detect(Path::new("a.csv")).unwrap(), Format::Csv);
        assert!(matches!(
            Format::detect(Path::new("a.txt")),
            Err(QueryError::UnsupportedFormat { extension }) if extension == "txt"
        ));
        assert!(Format::detect(Path::new("README")).is_err());
    }

    #[test]
    fn test_json_array() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#);
        let records = extract_all(&path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[2]["id"], json!(3));
    }

    #[test]
    fn test_json_single_object() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"id": 1, "nested": {"x": [1, 2]}}"#);
        let records = extract_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["nested"], json!({"x": [1, 2]}));
    }

    #[test]
    fn test_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.jsonl", "{\"id\": 1}\n\n{\"id\": 2}\r\n{\"id\": 3}");
        let records = extract_all(&path);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_json_lines_skip_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.jsonl", "{\"id\": 1}\n{\"id\": \n{\"id\": 3}\n");
        let records = extract_all(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], json!(3));
    }

    #[test]
    fn test_json_extension_falls_back_to_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", "{\"a\": 1}\n{\"a\": 2}\n");
        assert_eq!(extract_all(&path).len(), 2);
    }

    #[test]
    fn test_empty_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", "");
        assert!(extract_all(&path).is_empty());
    }

    #[test]
    fn test_scalar_lines_are_wrapped() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", "[1, \"two\"]");
        let records = extract_all(&path);
        assert_eq!(records[0][record::SCALAR_FIELD], json!(1));
        assert_eq!(records[1][record::SCALAR_FIELD], json!("two"));
    }

    #[test]
    fn test_json_with_bom() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", "\u{feff}[{\"id\": 1}]");
        assert_eq!(extract_all(&path).len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let result = RecordExtractor::new().extract(&path, Format::Json);
        assert!(matches!(result, Err(QueryError::ParseError { .. })));
    }

    #[test]
    fn test_csv_values_are_strings() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "id,amount\n42,19.99\n");
        let records = extract_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], json!("42"));
        assert_eq!(records[0]["amount"], json!("19.99"));
    }

    #[test]
    fn test_csv_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "a,b,c\n1,2\n1,2,3,4\n");
        let records = extract_all(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["c"], Value::Null);
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn test_csv_quoted_fields() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "name,note\n\"Doe, Jane\",\"said \"\"hi\"\"\"\n");
        let records = extract_all(&path);
        assert_eq!(records[0]["name"], json!("Doe, Jane"));
        assert_eq!(records[0]["note"], json!("said \"hi\""));
    }

    #[test]
    fn test_csv_header_only() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.csv", "id,amount\n");
        assert!(extract_all(&path).is_empty());
    }

    #[test]
    fn test_extraction_is_lazy() {
        let dir = TempDir::new().unwrap();
        let body: String = (0..1000).map(|i| format!("{{\"i\": {}}}\n", i)).collect();
        let path = write(&dir, "a.jsonl", &body);

        let mut records = RecordExtractor::new().extract(&path, Format::Json).unwrap();
        let first = records.next().unwrap().unwrap();
        assert_eq!(first["i"], json!(0));
    }
}
