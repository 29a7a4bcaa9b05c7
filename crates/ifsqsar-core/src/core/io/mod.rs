//! Delimited batch input files and the shared table I/O error type.

pub mod delimited;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Delimited text error in '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Separator '{0}' must be a single ASCII character")]
    InvalidSeparator(String),
    #[error("Header row {row} requested but the input only has {available} header row(s)")]
    MissingHeaderRow { row: usize, available: usize },
    #[error("Invalid value in '{path}' at record {record}: {message}")]
    InvalidValue {
        path: String,
        record: usize,
        message: String,
    },
}

/// Parses a user-facing separator spelling into a single byte.
///
/// Accepts the literal character, an escape such as `\t`, or a name (`tab`, `comma`,
/// `semicolon`, `pipe`, `space`, `newline`).
pub fn separator_byte(spelling: &str) -> Result<u8, TableError> {
    let byte = match spelling {
        "\\t" | "tab" => b'\t',
        "\\n" | "newline" => b'\n',
        "comma" => b',',
        "semicolon" => b';',
        "pipe" => b'|',
        "space" => b' ',
        s if s.len() == 1 && s.is_ascii() => s.as_bytes()[0],
        other => return Err(TableError::InvalidSeparator(other.to_string())),
    };
    Ok(byte)
}
