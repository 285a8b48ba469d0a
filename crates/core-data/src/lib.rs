//! Pluggable record sources and the record-to-particle binder.
//!
//! A [`RecordStream`] is a pull-based, schema-aware source of tabular
//! records. The engine never looks at payload formats; it resolves column
//! indices by name once, then reads typed values by ordinal. Concrete
//! sources here: delimited text (`csv`) and bracketed objects (`json`),
//! both registered in the default [`SourceRegistry`].

pub mod bind;
pub mod csv;
pub mod json;
pub mod registry;
pub mod stream;
pub mod types;

pub use bind::{BindReport, bind_particles};
pub use csv::{CsvLimits, CsvSource};
pub use json::JsonSource;
pub use registry::SourceRegistry;
pub use stream::{Capabilities, RecordStream};
pub use types::{Column, DataType, Record, Schema, Value};
