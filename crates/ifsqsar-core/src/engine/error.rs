use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::TableError;
use crate::core::models::descriptor::ModelError;
use crate::core::models::library::LibraryError;
use crate::core::models::registry::RegistryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model registry error: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error("Cyclic model dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("Model '{model}' returned {actual} estimates for {expected} reported occupants")]
    ValueShape {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("Model '{model}' failed on '{record}': {source}")]
    Model {
        model: String,
        record: String,
        source: ModelError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Table I/O failed: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("Failed to serialize results: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Model library error: {source}")]
    Library {
        #[from]
        source: LibraryError,
    },
}
