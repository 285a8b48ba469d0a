//! Type-name to factory mapping for record sources.
//!
//! The core never inspects payload formats; the driver asks the registry
//! for a source by name ("csv", "json") and hands it a config string.

use crate::csv::CsvSource;
use crate::json::JsonSource;
use crate::stream::RecordStream;
use ahash::AHashMap;
use core_error::{EngineError, Result};

type Factory = Box<dyn Fn() -> Box<dyn RecordStream> + Send + Sync>;

pub struct SourceRegistry {
    factories: AHashMap<String, Factory>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            factories: AHashMap::new(),
        }
    }

    /// Registry with the built-in sources.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("csv", || Box::new(CsvSource::new()));
        registry.register("json", || Box::new(JsonSource::new()));
        registry
    }

    /// Register (or replace) a factory under a type name.
    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn() -> Box<dyn RecordStream> + Send + Sync + 'static,
    {
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
    }

    pub fn create(&self, type_name: &str) -> Result<Box<dyn RecordStream>> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| {
                EngineError::invalid_parameter(format!("unknown source type `{type_name}`"))
            })
    }

    /// Registered type names, sorted for stable display.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_expose_csv_and_json() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["csv", "json"]);
        assert_eq!(registry.create("csv").unwrap().name(), "csv");
        assert_eq!(registry.create("json").unwrap().name(), "json");
    }

    #[test]
    fn unknown_type_is_invalid_parameter() {
        let registry = SourceRegistry::with_defaults();
        let err = match registry.create("parquet") {
            Err(e) => e,
            Ok(_) => panic!("expected an error for unknown source type"),
        };
        assert_eq!(err.kind(), core_error::ErrorKind::InvalidParameter);
    }

    #[test]
    fn custom_factories_can_shadow_builtins() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register("csv", || Box::new(crate::json::JsonSource::new()));
        assert_eq!(registry.create("csv").unwrap().name(), "json");
    }
}
