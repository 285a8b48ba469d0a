//! Bracketed-object record source: a single top-level array of flat
//! objects.
//!
//! Object keys become column names; the schema is derived from the first
//! object. Numeric values read as floats; string values are accepted in
//! the schema but read 0.0 through the numeric accessor. Keys missing
//! from later objects read 0.0.

use crate::stream::{Capabilities, RecordStream};
use crate::types::{Column, DataType, Record, Schema, Value};
use core_error::{EngineError, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Default)]
pub struct JsonSource {
    path: Option<PathBuf>,
    schema: Option<Schema>,
    rows: Vec<Record>,
    cursor: usize,
}

impl JsonSource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn value_from_json(value: Option<&serde_json::Value>) -> Value {
    match value {
        Some(serde_json::Value::Number(n)) => Value::Float(n.as_f64().unwrap_or(0.0) as f32),
        Some(serde_json::Value::Bool(b)) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Some(serde_json::Value::String(s)) => Value::String(s.clone()),
        _ => Value::Float(0.0),
    }
}

impl RecordStream for JsonSource {
    fn init(&mut self, config: &str) -> Result<()> {
        if config.is_empty() {
            return Err(EngineError::invalid_parameter("json source needs a path"));
        }
        self.path = Some(PathBuf::from(config));
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Err(EngineError::invalid_parameter("json source not initialized"));
        };
        let contents = fs::read_to_string(&path)
            .map_err(|e| EngineError::from_io(&format!("open {}", path.display()), &e))?;
        let parsed: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| EngineError::parse(format!("malformed json: {e}")))?;

        let Some(array) = parsed.as_array() else {
            return Err(EngineError::parse("top-level json value must be an array"));
        };
        let Some(first) = array.first().and_then(|v| v.as_object()) else {
            return Err(EngineError::parse(
                "json array must start with a flat object",
            ));
        };

        // Schema from the first object, in its key order.
        let columns: Vec<Column> = first
            .iter()
            .enumerate()
            .map(|(ordinal, (name, value))| Column {
                name: name.clone(),
                data_type: match value {
                    serde_json::Value::String(_) => DataType::String,
                    _ => DataType::Float,
                },
                ordinal,
            })
            .collect();
        let schema = Schema::new(columns);

        self.rows.clear();
        for item in array {
            let Some(object) = item.as_object() else {
                tracing::debug!(target: "data.json", "skipping non-object array element");
                continue;
            };
            self.rows.push(Record::new(
                schema
                    .columns()
                    .iter()
                    .map(|c| value_from_json(object.get(&c.name)))
                    .collect(),
            ));
        }

        self.schema = Some(schema);
        self.cursor = 0;
        Ok(())
    }

    fn schema(&self) -> Result<&Schema> {
        self.schema
            .as_ref()
            .ok_or_else(|| EngineError::invalid_parameter("json source not open"))
    }

    fn has_next(&self) -> bool {
        self.cursor < self.rows.len()
    }

    fn read_next(&mut self) -> Result<Record> {
        let Some(row) = self.rows.get(self.cursor) else {
            return Err(EngineError::out_of_range("json stream exhausted"));
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
        Capabilities::SEEKABLE | Capabilities::BUFFERED
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn open_json(contents: &str) -> JsonSource {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let mut source = JsonSource::new();
        source.init(file.path().to_str().unwrap()).unwrap();
        source.open().unwrap();
        source
    }

    #[test]
    fn schema_comes_from_first_object() {
        let source = open_json(r#"[{"x": 1.0, "y": 2.0, "label": "a"}]"#);
        let schema = source.schema().unwrap();
        assert_eq!(schema.len(), 3);
        assert!(schema.find("x").is_some());
        assert_eq!(
            schema.column_type(schema.find("label").unwrap()).unwrap(),
            DataType::String
        );
    }

    #[test]
    fn numbers_read_as_floats_strings_as_zero() {
        let mut source = open_json(r#"[{"x": 2.5, "label": "hot"}]"#);
        let schema_x = source.schema().unwrap().find("x").unwrap();
        let schema_label = source.schema().unwrap().find("label").unwrap();
        let record = source.read_next().unwrap();
        assert_eq!(record.get_f32(schema_x).unwrap(), 2.5);
        assert_eq!(record.get_f32(schema_label).unwrap(), 0.0);
    }

    #[test]
    fn missing_keys_read_zero() {
        let mut source = open_json(r#"[{"x": 1.0, "y": 2.0}, {"x": 3.0}]"#);
        source.read_next().unwrap();
        let second = source.read_next().unwrap();
        let y = source.schema().unwrap().find("y").unwrap();
        assert_eq!(second.get_f32(y).unwrap(), 0.0);
    }

    #[test]
    fn non_array_top_level_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"x": 1.0}"#).unwrap();
        let mut source = JsonSource::new();
        source.init(file.path().to_str().unwrap()).unwrap();
        let err = source.open().unwrap_err();
        assert_eq!(err.kind(), core_error::ErrorKind::Parse);
    }

    #[test]
    fn exhaustion_is_out_of_range() {
        let mut source = open_json(r#"[{"x": 1.0}]"#);
        source.read_next().unwrap();
        assert_eq!(
            source.read_next().unwrap_err().kind(),
            core_error::ErrorKind::OutOfRange
        );
    }
}
