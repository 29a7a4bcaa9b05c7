use ifsqsar::core::io::TableError;
use ifsqsar::core::models::registry::RegistryError;
use ifsqsar::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] EngineError),

    #[error("Invalid model selection: {0}")]
    ModelSelection(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file '{path}': {source}", path = path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Table errors already name the file they came from.
    #[error("Cannot read batch input: {source}")]
    InputTable {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Cannot load reference data: {source}")]
    ReferenceData {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Cannot load user values: {source}")]
    UserValues {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("Cannot write results to '{path}': {source}", path = path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log file '{path}': {source}", path = path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
