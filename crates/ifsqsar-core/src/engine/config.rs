use crate::core::models::user_values::UserValues;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Unknown output value '{0}'")]
    UnknownValue(String),
    #[error("Unknown output format '{0}' (expected rows, columns or json)")]
    UnknownFormat(String),
    #[error("Column and row separators must differ, both are {0:?}")]
    SeparatorClash(String),
}

/// A reported field. `insmi`, `normsmi` and `sminote` are per record; the rest are per model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    InputSmiles,
    NormalizedSmiles,
    SmilesNote,
    Endpoint,
    Units,
    Prediction,
    UncertaintyLevel,
    Error,
    DomainNote,
    Citation,
}

impl ValueKind {
    pub const ALL: [ValueKind; 10] = [
        ValueKind::InputSmiles,
        ValueKind::NormalizedSmiles,
        ValueKind::SmilesNote,
        ValueKind::Endpoint,
        ValueKind::Units,
        ValueKind::Prediction,
        ValueKind::UncertaintyLevel,
        ValueKind::Error,
        ValueKind::DomainNote,
        ValueKind::Citation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::InputSmiles => "insmi",
            ValueKind::NormalizedSmiles => "normsmi",
            ValueKind::SmilesNote => "sminote",
            ValueKind::Endpoint => "endpoint",
            ValueKind::Units => "units",
            ValueKind::Prediction => "qsarpred",
            ValueKind::UncertaintyLevel => "UL",
            ValueKind::Error => "error",
            ValueKind::DomainNote => "ULnote",
            ValueKind::Citation => "citation",
        }
    }

    pub fn is_record_level(self) -> bool {
        matches!(
            self,
            ValueKind::InputSmiles | ValueKind::NormalizedSmiles | ValueKind::SmilesNote
        )
    }

    /// Values expanded into one column per reported occupant on mixture records.
    pub fn is_per_occupant(self) -> bool {
        matches!(
            self,
            ValueKind::Prediction | ValueKind::UncertaintyLevel | ValueKind::Error
        )
    }
}

impl FromStr for ValueKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ValueKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownValue(s.to_string()))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One record per line.
    #[default]
    Rows,
    /// One column per line, records across.
    Columns,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rows" => Ok(OutputFormat::Rows),
            "columns" => Ok(OutputFormat::Columns),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Rows => "rows",
            OutputFormat::Columns => "columns",
            OutputFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub values: Vec<ValueKind>,
    pub header: bool,
    pub separator: String,
    pub line_ending: String,
    /// Prepend the original input file columns (rows format only).
    pub keep_input: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    /// Requested models or model groups, in report order.
    pub models: Vec<String>,
    pub user_values: UserValues,
    pub output: OutputConfig,
}

#[derive(Default)]
pub struct PredictionConfigBuilder {
    models: Option<Vec<String>>,
    user_values: Option<UserValues>,
    format: Option<OutputFormat>,
    values: Option<Vec<ValueKind>>,
    header: Option<bool>,
    separator: Option<String>,
    line_ending: Option<String>,
    keep_input: Option<bool>,
}

impl PredictionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }
    pub fn user_values(mut self, values: UserValues) -> Self {
        self.user_values = Some(values);
        self
    }
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }
    pub fn values(mut self, values: Vec<ValueKind>) -> Self {
        self.values = Some(values);
        self
    }
    pub fn header(mut self, header: bool) -> Self {
        self.header = Some(header);
        self
    }
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }
    pub fn line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = Some(line_ending.into());
        self
    }
    pub fn keep_input(mut self, keep: bool) -> Self {
        self.keep_input = Some(keep);
        self
    }

    pub fn build(self) -> Result<PredictionConfig, ConfigError> {
        let separator = self.separator.unwrap_or_else(|| "\t".to_string());
        let line_ending = self.line_ending.unwrap_or_else(|| "\n".to_string());
        if separator == line_ending {
            return Err(ConfigError::SeparatorClash(separator));
        }
        let output = OutputConfig {
            format: self.format.ok_or(ConfigError::MissingParameter("format"))?,
            values: self.values.unwrap_or_else(|| ValueKind::ALL.to_vec()),
            header: self.header.unwrap_or(true),
            separator,
            line_ending,
            keep_input: self.keep_input.unwrap_or(false),
        };
        Ok(PredictionConfig {
            models: self.models.ok_or(ConfigError::MissingParameter("models"))?,
            user_values: self.user_values.unwrap_or_default(),
            output,
        })
    }
}
