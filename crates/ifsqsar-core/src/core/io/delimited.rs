use super::TableError;
use csv::{ReaderBuilder, Terminator};
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInputOptions {
    /// Number of header lines at the start of the file.
    pub header_rows: usize,
    /// 1-indexed header row searched for the SMILES label.
    pub target_header_row: usize,
    /// Column label holding SMILES, matched case-insensitively.
    pub smiles_label: String,
    pub separator: u8,
    pub line_ending: u8,
}

impl Default for BatchInputOptions {
    fn default() -> Self {
        Self {
            header_rows: 1,
            target_header_row: 1,
            smiles_label: "smiles".to_string(),
            separator: b'\t',
            line_ending: b'\n',
        }
    }
}

/// A delimited input file split into rows, with the SMILES column located.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchInput {
    rows: Vec<Vec<String>>,
    header_rows: usize,
    target_header_row: usize,
    smiles_column: usize,
    separator: u8,
}

impl BatchInput {
    pub fn read_from_path(path: &Path, options: &BatchInputOptions) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::read_from(file, options, &path.to_string_lossy())
    }

    pub fn read_from<R: Read>(
        reader: R,
        options: &BatchInputOptions,
        source_name: &str,
    ) -> Result<Self, TableError> {
        let terminator = if options.line_ending == b'\n' {
            Terminator::CRLF
        } else {
            Terminator::Any(options.line_ending)
        };
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(options.separator)
            .terminator(terminator)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| TableError::Csv {
                path: source_name.to_string(),
                source: e,
            })?;
            let row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.iter().all(|field| field.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        if options.target_header_row == 0
            || options.target_header_row > options.header_rows.max(1)
            || options.target_header_row > rows.len()
        {
            return Err(TableError::MissingHeaderRow {
                row: options.target_header_row,
                available: options.header_rows.min(rows.len()),
            });
        }

        let label = options.smiles_label.to_lowercase();
        let smiles_column = rows[options.target_header_row - 1]
            .iter()
            .position(|field| field.trim().to_lowercase() == label)
            .unwrap_or(0);
        debug!(
            rows = rows.len(),
            smiles_column, "Read delimited batch input from {}", source_name
        );

        Ok(Self {
            rows,
            header_rows: options.header_rows,
            target_header_row: options.target_header_row,
            smiles_column,
            separator: options.separator,
        })
    }

    pub fn smiles_column(&self) -> usize {
        self.smiles_column
    }

    pub fn header_rows(&self) -> usize {
        self.header_rows.min(self.rows.len())
    }

    pub fn target_header_row(&self) -> usize {
        self.target_header_row
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// SMILES of every data row; short rows yield an empty string.
    pub fn smiles(&self) -> Vec<String> {
        self.rows
            .iter()
            .skip(self.header_rows)
            .map(|row| row.get(self.smiles_column).cloned().unwrap_or_default())
            .collect()
    }

    /// Original file lines rejoined with the input separator.
    pub fn lines(&self) -> Vec<String> {
        let separator = (self.separator as char).to_string();
        self.rows.iter().map(|row| row.join(&separator)).collect()
    }
}
