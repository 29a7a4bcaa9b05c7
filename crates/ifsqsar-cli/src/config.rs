mod defaults;

use crate::cli::PredictArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use defaults::DefaultsConfig;
use ifsqsar::core::io::delimited::BatchInputOptions;
use ifsqsar::core::io::separator_byte;
use ifsqsar::core::models::user_values::UserValues;
use ifsqsar::engine::config::{self as core_config, OutputFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialInputConfig {
    #[serde(rename = "header-rows")]
    header_rows: Option<usize>,
    #[serde(rename = "target-header-row")]
    target_header_row: Option<usize>,
    #[serde(rename = "smiles-label")]
    smiles_label: Option<String>,
    separator: Option<String>,
    #[serde(rename = "line-ending")]
    line_ending: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialOutputConfig {
    format: Option<String>,
    values: Option<Vec<String>>,
    header: Option<bool>,
    separator: Option<String>,
    #[serde(rename = "line-ending")]
    line_ending: Option<String>,
    #[serde(rename = "keep-input")]
    keep_input: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialPredictConfig {
    models: Option<Vec<String>>,
    #[serde(rename = "user-values")]
    user_values: Option<PathBuf>,
    #[serde(rename = "reference-data")]
    reference_data: Option<PathBuf>,
    input: Option<PartialInputConfig>,
    output: Option<PartialOutputConfig>,
}

/// Where the records of a prediction run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Records(Vec<String>),
    File {
        path: PathBuf,
        options: BatchInputOptions,
    },
}

/// A fully merged `predict` invocation.
#[derive(Debug, Clone)]
pub struct PredictRun {
    pub source: InputSource,
    pub output_path: Option<PathBuf>,
    pub reference_data: Option<PathBuf>,
    pub prediction: core_config::PredictionConfig,
}

impl PartialPredictConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| CliError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merges CLI flags over `--set` overrides over the file over the built-in defaults.
    pub fn merge_with_cli(mut self, args: &PredictArgs) -> Result<PredictRun> {
        self.apply_set_values(&args.set_values)?;

        let defaults = DefaultsConfig::default();
        let input_config = self.input.take().unwrap_or_default();
        let output_config = self.output.take().unwrap_or_default();

        let source = Self::merge_source(args, input_config, &defaults)?;
        let is_file = matches!(source, InputSource::File { .. });

        let models = match (&args.models, self.models.take()) {
            (Some(list), _) => parser::split_names(list).map_err(argument)?,
            (None, Some(models)) => models,
            (None, None) => vec![defaults.models.clone()],
        };

        let format: OutputFormat = args
            .format
            .as_deref()
            .or(output_config.format.as_deref())
            .unwrap_or(&defaults.format)
            .parse()
            .map_err(config)?;

        let header = !args.no_header && output_config.header.unwrap_or(defaults.header);
        let keep_input = is_file
            && !args.drop_input
            && output_config.keep_input.unwrap_or(defaults.keep_input);

        let separator = args
            .separator
            .as_deref()
            .or(output_config.separator.as_deref())
            .map(parser::unescape_separator)
            .unwrap_or(defaults.separator);
        let line_ending = args
            .line_ending
            .as_deref()
            .or(output_config.line_ending.as_deref())
            .map(parser::unescape_separator)
            .unwrap_or(defaults.line_ending);

        let mut builder = core_config::PredictionConfigBuilder::new()
            .models(models)
            .format(format)
            .header(header)
            .separator(separator)
            .line_ending(line_ending)
            .keep_input(keep_input);

        let values = match (&args.values, output_config.values) {
            (Some(list), _) => Some(parser::split_names(list).map_err(argument)?),
            (None, file_values) => file_values,
        };
        if let Some(values) = values {
            let kinds = values
                .iter()
                .map(|v| v.parse::<ValueKind>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(config)?;
            builder = builder.values(kinds);
        }

        if let Some(path) = args.user_values.clone().or(self.user_values.take()) {
            debug!("Loading user values from {:?}", path);
            let values = UserValues::load(&path).map_err(|source| CliError::UserValues {
                path: path.clone(),
                source,
            })?;
            builder = builder.user_values(values);
        }

        let prediction = builder.build().map_err(config)?;
        Ok(PredictRun {
            source,
            output_path: args.output.clone(),
            reference_data: args.reference_data.clone().or(self.reference_data),
            prediction,
        })
    }

    fn merge_source(
        args: &PredictArgs,
        input_config: PartialInputConfig,
        defaults: &DefaultsConfig,
    ) -> Result<InputSource> {
        if let Some(list) = &args.smiles {
            return Ok(InputSource::Records(
                parser::split_records(list).map_err(argument)?,
            ));
        }
        let Some(path) = &args.input else {
            return Err(CliError::Argument(
                "Either --smiles or --input must be given.".to_string(),
            ));
        };

        let byte = |value: Option<&str>, fallback: &str| -> Result<u8> {
            separator_byte(value.unwrap_or(fallback)).map_err(config)
        };
        let options = BatchInputOptions {
            header_rows: args
                .header_rows
                .or(input_config.header_rows)
                .unwrap_or(defaults.header_rows),
            target_header_row: args
                .target_header_row
                .or(input_config.target_header_row)
                .unwrap_or(defaults.target_header_row),
            smiles_label: args
                .smiles_label
                .clone()
                .or(input_config.smiles_label)
                .unwrap_or_else(|| defaults.smiles_label.clone()),
            separator: byte(
                args.input_separator.as_deref().or(input_config.separator.as_deref()),
                &defaults.input_separator,
            )?,
            line_ending: byte(
                args.input_line_ending
                    .as_deref()
                    .or(input_config.line_ending.as_deref()),
                &defaults.input_line_ending,
            )?,
        };
        Ok(InputSource::File {
            path: path.clone(),
            options,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            let int = |value: &str| -> Result<usize> {
                value.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value))
                })
            };
            let boolean = |value: &str| -> Result<bool> {
                value.parse().map_err(|_| {
                    CliError::Config(format!("Invalid boolean value for {}: {}", key, value))
                })
            };

            match key {
                "models" => {
                    self.models = Some(parser::split_names(value_str).map_err(argument)?);
                }
                "user-values" => self.user_values = Some(PathBuf::from(value_str)),
                "reference-data" => self.reference_data = Some(PathBuf::from(value_str)),
                "input.header-rows" => {
                    self.input_mut().header_rows = Some(int(value_str)?);
                }
                "input.target-header-row" => {
                    self.input_mut().target_header_row = Some(int(value_str)?);
                }
                "input.smiles-label" => {
                    self.input_mut().smiles_label = Some(value_str.to_string());
                }
                "input.separator" => self.input_mut().separator = Some(value_str.to_string()),
                "input.line-ending" => {
                    self.input_mut().line_ending = Some(value_str.to_string());
                }
                "output.format" => self.output_mut().format = Some(value_str.to_string()),
                "output.values" => {
                    self.output_mut().values =
                        Some(parser::split_names(value_str).map_err(argument)?);
                }
                "output.header" => self.output_mut().header = Some(boolean(value_str)?),
                "output.separator" => {
                    self.output_mut().separator = Some(value_str.to_string());
                }
                "output.line-ending" => {
                    self.output_mut().line_ending = Some(value_str.to_string());
                }
                "output.keep-input" => {
                    self.output_mut().keep_input = Some(boolean(value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn input_mut(&mut self) -> &mut PartialInputConfig {
        self.input.get_or_insert_with(Default::default)
    }

    fn output_mut(&mut self) -> &mut PartialOutputConfig {
        self.output.get_or_insert_with(Default::default)
    }
}

fn config(e: impl std::fmt::Display) -> CliError {
    CliError::Config(e.to_string())
}

fn argument(e: parser::ParseError) -> CliError {
    CliError::Argument(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("ifsqsar.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn predict_args(args: &[&str]) -> PredictArgs {
        let mut argv = vec!["ifsqsar", "predict"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Commands::Predict(args) => args,
            _ => panic!("Expected 'predict' subcommand"),
        }
    }

    fn merge(file: Option<&Path>, args: &[&str]) -> Result<PredictRun> {
        let partial = match file {
            Some(path) => PartialPredictConfig::from_file(path)?,
            None => PartialPredictConfig::default(),
        };
        partial.merge_with_cli(&predict_args(args))
    }

    #[test]
    fn file_values_merge_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            models = ["logKow"]

            [output]
            format = "json"
            values = ["qsarpred", "UL"]
            "#,
        );
        let run = merge(Some(path.as_path()), &["-s", "CCO,O"]).unwrap();

        assert_eq!(
            run.source,
            InputSource::Records(vec!["CCO".to_string(), "O".to_string()])
        );
        assert_eq!(run.prediction.models, vec!["logKow"]);
        assert_eq!(run.prediction.output.format, OutputFormat::Json);
        assert_eq!(
            run.prediction.output.values,
            vec![ValueKind::Prediction, ValueKind::UncertaintyLevel]
        );
        assert!(run.prediction.output.header);
        assert_eq!(run.prediction.output.separator, "\t");
        assert!(!run.prediction.output.keep_input);
    }

    #[test]
    fn cli_args_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            models = ["logKow"]

            [output]
            format = "json"
            separator = ","
            "#,
        );
        let run = merge(
            Some(path.as_path()),
            &["-s", "CCO", "-m", "Vf,MW", "-f", "columns", "--no-header", "--separator", "\\t"],
        )
        .unwrap();

        assert_eq!(run.prediction.models, vec!["Vf", "MW"]);
        assert_eq!(run.prediction.output.format, OutputFormat::Columns);
        assert!(!run.prediction.output.header);
        assert_eq!(run.prediction.output.separator, "\t");
    }

    #[test]
    fn set_values_override_file_but_not_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [output]
            format = "json"
            header = true
            "#,
        );
        let run = merge(
            Some(path.as_path()),
            &[
                "-s",
                "CCO",
                "-S",
                "output.format=columns",
                "-S",
                "output.header=false",
                "-S",
                "models=logKaw",
                "-m",
                "logKow",
            ],
        )
        .unwrap();

        assert_eq!(run.prediction.output.format, OutputFormat::Columns);
        assert!(!run.prediction.output.header);
        assert_eq!(run.prediction.models, vec!["logKow"]);
    }

    #[test]
    fn unsupported_set_key_is_rejected() {
        let err = merge(None, &["-s", "CCO", "-S", "output.colour=blue"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unsupported configuration key for --set: 'output.colour'"
        );

        let err = merge(None, &["-s", "CCO", "-S", "output.header"]).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(&dir, "[output]\nlayout = \"rows\"\n");
        let err = PartialPredictConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::ConfigFile { .. }));
    }

    #[test]
    fn input_file_options_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [input]
            smiles-label = "structure"
            separator = ","
            "#,
        );
        let run = merge(
            Some(path.as_path()),
            &["-i", "batch.csv", "--header-rows", "2", "--target-header-row", "2"],
        )
        .unwrap();

        let InputSource::File { path, options } = run.source else {
            panic!("expected a file source");
        };
        assert_eq!(path, PathBuf::from("batch.csv"));
        assert_eq!(options.header_rows, 2);
        assert_eq!(options.target_header_row, 2);
        assert_eq!(options.smiles_label, "structure");
        assert_eq!(options.separator, b',');
        assert_eq!(options.line_ending, b'\n');
        assert!(run.prediction.output.keep_input);

        let run = merge(None, &["-i", "batch.tsv", "--drop-input"]).unwrap();
        assert!(!run.prediction.output.keep_input);
    }

    #[test]
    fn a_record_source_is_required() {
        let err = merge(None, &["-m", "logKow"]).unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));
    }

    #[test]
    fn invalid_value_kinds_are_config_errors() {
        let err = merge(None, &["-s", "CCO", "--values", "qsarpred,colour"]).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn user_values_are_loaded_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let values_path = dir.path().join("user.csv");
        fs::write(&values_path, "smiles,model,value,error\nCCO,logKow,-0.31,0.1\n").unwrap();

        let run = merge(
            None,
            &["-s", "CCO", "--user-values", values_path.to_str().unwrap()],
        )
        .unwrap();
        assert_eq!(run.prediction.user_values.len(), 1);
        assert!(run.prediction.user_values.get("logKow", "CCO").is_some());
    }

    #[test]
    fn missing_user_values_file_is_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.csv");
        let err = merge(
            None,
            &["-s", "CCO", "--user-values", missing.to_str().unwrap()],
        )
        .unwrap_err();
        assert!(matches!(err, CliError::UserValues { ref path, .. } if *path == missing));
    }
}
