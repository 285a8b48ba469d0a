//! Delimited-text record source.
//!
//! Format contract, kept bit-compatible with the historical loader:
//! * the first non-empty line is a header of comma-separated names,
//!   trimmed of surrounding whitespace;
//! * subsequent non-empty lines are records with the same field count;
//!   lines with a different count are skipped silently;
//! * fields parse as floats; unparseable tokens read as 0.0;
//! * over-long lines are skipped like malformed rows.
//!
//! The whole file is buffered at `open`, bounded by [`CsvLimits`].

use crate::stream::{Capabilities, RecordStream};
use crate::types::{DataType, Record, Schema, Value};
use core_error::{EngineError, Result};
use std::fs;
use std::path::PathBuf;

/// Input bounds for the default binding; all configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLimits {
    pub max_line_len: usize,
    pub max_columns: usize,
    pub max_rows: usize,
}

impl Default for CsvLimits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_columns: 10,
            max_rows: 1000,
        }
    }
}

#[derive(Default)]
pub struct CsvSource {
    path: Option<PathBuf>,
    limits: CsvLimits,
    schema: Option<Schema>,
    rows: Vec<Record>,
    cursor: usize,
    skipped_rows: usize,
}

impl CsvSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: CsvLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Rows dropped at `open` for count mismatch or over-length.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

/// Split one line into trimmed fields.
pub fn parse_line(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Render a record as one delimited line, floats to six significant
/// digits. `parse_line` + field parse recovers the record exactly for
/// finite floats representable at that precision.
pub fn emit_record(record: &Record) -> String {
    record
        .values()
        .iter()
        .map(|v| format_field(v.as_f32()))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_field(value: f32) -> String {
    let mut s = format!("{value:.6}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

fn parse_field(token: &str) -> f32 {
    token.trim().parse::<f32>().unwrap_or(0.0)
}

impl RecordStream for CsvSource {
    fn init(&mut self, config: &str) -> Result<()> {
        if config.is_empty() {
            return Err(EngineError::invalid_parameter("csv source needs a path"));
        }
        self.path = Some(PathBuf::from(config));
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(EngineError::invalid_parameter("csv source not initialized"));
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| EngineError::from_io(&format!("open {}", path.display()), &e))?;

        let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
        let Some(header) = lines.next() else {
            return Err(EngineError::parse("csv file has no header line"));
        };
        if header.len() > self.limits.max_line_len {
            return Err(EngineError::parse("csv header exceeds line limit"));
        }
        let names: Vec<&str> = parse_line(header)
            .into_iter()
            .take(self.limits.max_columns)
            .collect();
        let schema = Schema::from_names(names.iter().copied(), DataType::Float);
        let width = schema.len();

        self.rows.clear();
        self.skipped_rows = 0;
        for line in lines {
            if self.rows.len() >= self.limits.max_rows {
                break;
            }
            if line.len() > self.limits.max_line_len {
                self.skipped_rows += 1;
                continue;
            }
            let fields = parse_line(line);
            if fields.len() != width {
                self.skipped_rows += 1;
                continue;
            }
            self.rows.push(Record::new(
                fields
                    .into_iter()
                    .map(|f| Value::Float(parse_field(f)))
                    .collect(),
            ));
        }

        if self.skipped_rows > 0 {
            tracing::debug!(
                target: "data.csv",
                skipped = self.skipped_rows,
                kept = self.rows.len(),
                "skipped malformed rows"
            );
        }
        self.schema = Some(schema);
        self.cursor = 0;
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| EngineError::invalid_parameter("csv source not open"))
    }

    fn has_next(&self) -> bool {
        self.cursor < self.rows.len()
    }

    fn read_next(&mut self) -> Result<Record> {
        let Some(row) = self.rows.get(self.cursor) else {
            return Err(EngineError::out_of_range("csv stream exhausted"));
        };
        self.cursor += 1;
        Ok(row.clone())
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.schema = None;
        self.rows.clear();
        self.cursor = 0;
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::SEEKABLE | Capabilities::RANDOM | Capabilities::BUFFERED
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn open_csv(contents: &str) -> CsvSource {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let mut source = CsvSource::new();
        source.init(file.path().to_str().unwrap()).unwrap();
        // The file is fully buffered at open; the temp guard can drop.
        source.open().unwrap();
        source
    }

    #[test]
    fn header_names_are_trimmed() {
        let source = open_csv(" x , y ,speed\n1,2,3\n");
        let schema = source.schema().unwrap();
        assert_eq!(schema.find("x"), Some(0));
        assert_eq!(schema.find("speed"), Some(2));
    }

    #[test]
    fn mismatched_rows_are_skipped_silently() {
        let mut source = open_csv("x,y\n1,2\n3\n4,5,6\n7,8\n");
        assert_eq!(source.skipped_rows(), 2);
        assert_eq!(source.read_next().unwrap().get_f32(0).unwrap(), 1.0);
        assert_eq!(source.read_next().unwrap().get_f32(1).unwrap(), 8.0);
        assert!(!source.has_next());
    }

    #[test]
    fn unparseable_fields_read_zero() {
        let mut source = open_csv("x,y\nabc,2.5\n");
        let record = source.read_next().unwrap();
        assert_eq!(record.get_f32(0).unwrap(), 0.0);
        assert_eq!(record.get_f32(1).unwrap(), 2.5);
    }

    #[test]
    fn read_past_end_is_out_of_range() {
        let mut source = open_csv("x\n1\n");
        source.read_next().unwrap();
        assert!(!source.has_next());
        let err = source.read_next().unwrap_err();
        assert_eq!(err.kind(), core_error::ErrorKind::OutOfRange);
    }

    #[test]
    fn reset_rewinds_to_first_record() {
        let mut source = open_csv("x\n1\n2\n");
        assert!(source.capabilities().contains(Capabilities::SEEKABLE));
        source.read_next().unwrap();
        source.read_next().unwrap();
        source.reset().unwrap();
        assert_eq!(source.read_next().unwrap().get_f32(0).unwrap(), 1.0);
    }

    #[test]
    fn row_cap_bounds_ingestion() {
        let mut contents = String::from("x\n");
        for i in 0..50 {
            contents.push_str(&format!("{i}\n"));
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let mut source = CsvSource::with_limits(CsvLimits {
            max_rows: 10,
            ..CsvLimits::default()
        });
        source.init(file.path().to_str().unwrap()).unwrap();
        source.open().unwrap();
        let mut n = 0;
        while source.has_next() {
            source.read_next().unwrap();
            n += 1;
        }
        assert_eq!(n, 10);
    }

    #[test]
    fn emit_then_parse_round_trips_six_digit_floats() {
        let record = Record::new(vec![
            Value::Float(1.5),
            Value::Float(-3.25),
            Value::Float(100.0),
            Value::Float(0.125),
        ]);
        let line = emit_record(&record);
        let parsed: Vec<f32> = parse_line(&line).into_iter().map(parse_field).collect();
        let original: Vec<f32> = record.values().iter().map(|v| v.as_f32()).collect();
        assert_eq!(parsed, original);
    }

    #[test]
    fn close_is_idempotent() {
        let mut source = open_csv("x\n1\n");
        source.close();
        source.close();
        assert!(!source.has_next());
        assert!(source.schema().is_err());
    }
}
