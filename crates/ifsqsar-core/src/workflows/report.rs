use crate::core::io::delimited::BatchInput;
use crate::core::models::result::{Estimate, Outcome, format_value};
use crate::engine::config::{OutputConfig, OutputFormat, ValueKind};
use crate::engine::error::EngineError;
use crate::engine::evaluator::{ModelOutcome, RecordEvaluation};
use serde::Serialize;
use std::collections::HashMap;

/// Replacement characters for separators found inside text cells, in preference order.
const SUBSTITUTES: [&str; 4] = [",", ";", "|", "~"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Text rendering; missing cells and NaN are blank.
    pub fn render(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Number(value) => format_value(*value),
            Cell::Text(text) => text.clone(),
        }
    }
}

/// Named cells of one record in column order.
pub fn record_cells(evaluation: &RecordEvaluation<'_>, values: &[ValueKind]) -> Vec<(String, Cell)> {
    let record = &evaluation.record;
    let mut cells = Vec::new();
    for &value in values.iter().filter(|v| v.is_record_level()) {
        let text = match value {
            ValueKind::InputSmiles => &record.input,
            ValueKind::NormalizedSmiles => &record.smiles,
            _ => &record.note,
        };
        cells.push((value.to_string(), Cell::Text(text.clone())));
    }

    let occupants: Vec<String> = record
        .assignment
        .reported()
        .map(|(role, index)| format!("{} {}", role, index + 1))
        .collect();
    let occupants = record.is_mixture.then_some(occupants.as_slice());
    for entry in &evaluation.outcomes {
        model_cells(entry, values, occupants, &mut cells);
    }
    cells
}

fn model_cells(
    entry: &ModelOutcome<'_>,
    values: &[ValueKind],
    occupants: Option<&[String]>,
    cells: &mut Vec<(String, Cell)>,
) {
    let model = entry.model;
    let per_occupant = occupants.filter(|_| model.is_mixture());
    let (endpoint, units, note, citation) = match &entry.outcome {
        Outcome::Evaluated(result) => (
            result.endpoint.as_str(),
            result.units.as_str(),
            result.note.as_str(),
            result.citation.as_str(),
        ),
        Outcome::NotApplicable { reason } => (
            model.endpoint(),
            model.units(),
            reason.as_str(),
            model.citation(),
        ),
        Outcome::NoStructure => ("", "", "", ""),
    };
    let blank = Estimate::without_domain(f64::NAN, f64::NAN);
    let estimates: Vec<Estimate> = match (entry.outcome.result(), per_occupant) {
        (Some(result), Some(labels)) => result.estimates.expand(labels.len()),
        (Some(result), None) => vec![result.estimates.scalar().copied().unwrap_or(blank)],
        (None, Some(labels)) => vec![blank; labels.len()],
        (None, None) => vec![blank],
    };

    for &value in values.iter().filter(|v| !v.is_record_level()) {
        let column = format!("{} {}", model.name(), value);
        let text = match value {
            ValueKind::Endpoint => endpoint,
            ValueKind::Units => units,
            ValueKind::DomainNote => note,
            ValueKind::Citation => citation,
            _ => {
                let cell = |estimate: &Estimate| match value {
                    ValueKind::Prediction => Cell::Number(estimate.value),
                    ValueKind::Error => Cell::Number(estimate.error),
                    _ => estimate
                        .uncertainty
                        .map_or(Cell::Missing, |ul| Cell::Text(ul.to_string())),
                };
                match per_occupant {
                    Some(labels) => {
                        for (label, estimate) in labels.iter().zip(&estimates) {
                            cells.push((format!("{} {}", column, label), cell(estimate)));
                        }
                    }
                    None => {
                        if let Some(estimate) = estimates.first() {
                            cells.push((column, cell(estimate)));
                        }
                    }
                }
                continue;
            }
        };
        cells.push((column, Cell::Text(text.to_string())));
    }
}

/// Batch results as a rectangular table.
///
/// Column order is the order of first appearance. A column first seen on a later record is
/// appended and earlier rows are back-filled with [`Cell::Missing`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl BatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_evaluations(evaluations: &[RecordEvaluation<'_>], values: &[ValueKind]) -> Self {
        let mut table = Self::new();
        for evaluation in evaluations {
            table.push_row(record_cells(evaluation, values));
        }
        table
    }

    pub fn push_row(&mut self, cells: Vec<(String, Cell)>) {
        let mut row = vec![Cell::Missing; self.columns.len()];
        for (name, cell) in cells {
            let position = match self.index.get(&name) {
                Some(&position) => position,
                None => {
                    let position = self.columns.len();
                    self.index.insert(name.clone(), position);
                    self.columns.push(name);
                    for earlier in &mut self.rows {
                        earlier.push(Cell::Missing);
                    }
                    row.push(Cell::Missing);
                    position
                }
            };
            row[position] = cell;
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let position = *self.index.get(column)?;
        self.rows.get(row)?.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Replaces the output separators inside `text` with the first two unused substitutes.
pub fn sanitize(text: &str, separator: &str, line_ending: &str) -> String {
    let mut remaining = SUBSTITUTES
        .into_iter()
        .filter(|s| *s != separator && *s != line_ending);
    let for_separator = remaining.next().unwrap_or_default();
    let for_line_ending = remaining.next().unwrap_or_default();

    let mut text = text.to_string();
    if !separator.is_empty() {
        text = text.replace(separator, for_separator);
    }
    if !line_ending.is_empty() {
        text = text.replace(line_ending, for_line_ending);
    }
    text
}

fn render_cell(cell: &Cell, output: &OutputConfig) -> String {
    sanitize(&cell.render(), &output.separator, &output.line_ending)
}

/// Header line (when enabled) followed by one line per record, without terminators.
fn row_lines(table: &BatchTable, output: &OutputConfig) -> Vec<String> {
    let mut lines = Vec::with_capacity(table.len() + 1);
    if output.header {
        let header: Vec<String> = table
            .columns()
            .iter()
            .map(|c| sanitize(c, &output.separator, &output.line_ending))
            .collect();
        lines.push(header.join(&output.separator));
    }
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|cell| render_cell(cell, output)).collect();
        lines.push(cells.join(&output.separator));
    }
    lines
}

fn terminate(lines: Vec<String>, line_ending: &str) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(&line);
        text.push_str(line_ending);
    }
    text
}

pub fn render_rows(table: &BatchTable, output: &OutputConfig) -> String {
    terminate(row_lines(table, output), &output.line_ending)
}

/// One line per column: the column name (when enabled) followed by every record's value.
pub fn render_columns(table: &BatchTable, output: &OutputConfig) -> String {
    let lines = table
        .columns()
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let mut fields = Vec::with_capacity(table.len() + 1);
            if output.header {
                fields.push(sanitize(name, &output.separator, &output.line_ending));
            }
            for row in table.rows() {
                fields.push(row.get(position).map(|c| render_cell(c, output)).unwrap_or_default());
            }
            fields.join(&output.separator)
        })
        .collect();
    terminate(lines, &output.line_ending)
}

pub fn render_json(table: &BatchTable) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(table)?)
}

/// Appends the rows rendering to the lines of the original input file.
///
/// The result header goes on the input's target header row; other header rows are padded
/// with empty cells so every line keeps the same column count.
pub fn render_with_input(table: &BatchTable, input: &BatchInput, output: &OutputConfig) -> String {
    let separator = output.separator.as_str();
    let results = row_lines(table, output);
    let header_rows = input.header_rows();
    let mut lines = input.lines();

    let mut offset = 0;
    if output.header {
        offset = 1;
        let padding = separator.repeat(table.columns().len().saturating_sub(1));
        let header = results.first().map(String::as_str).unwrap_or_default();
        for (i, line) in lines.iter_mut().take(header_rows).enumerate() {
            line.push_str(separator);
            if i + 1 == input.target_header_row() {
                line.push_str(header);
            } else {
                line.push_str(&padding);
            }
        }
    }
    for (i, line) in lines.iter_mut().enumerate().skip(header_rows) {
        if let Some(result) = results.get(i - header_rows + offset) {
            line.push_str(separator);
            line.push_str(result);
        }
    }
    terminate(lines, &output.line_ending)
}

/// Renders `table` in the configured format, merging the input file when requested.
pub fn render(
    table: &BatchTable,
    output: &OutputConfig,
    input: Option<&BatchInput>,
) -> Result<String, EngineError> {
    match (output.format, input) {
        (OutputFormat::Rows, Some(input)) if output.keep_input => {
            Ok(render_with_input(table, input, output))
        }
        (OutputFormat::Rows, _) => Ok(render_rows(table, output)),
        (OutputFormat::Columns, _) => Ok(render_columns(table, output)),
        (OutputFormat::Json, _) => render_json(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::delimited::BatchInputOptions;
    use crate::core::mixture::prepare;
    use crate::core::models::descriptor::{Calculation, ModelDescriptor, ModelInputs};
    use crate::core::models::result::{Estimates, UncertaintyLevel};
    use crate::core::molecule::BasicNormalizer;

    fn descriptor(name: &str, mixture: bool) -> ModelDescriptor {
        ModelDescriptor::builder(name)
            .mixture(mixture)
            .units("log units")
            .citation("Someone 2020")
            .build(|_: &ModelInputs<'_>| {
                Ok(Calculation::new(Estimate::without_domain(0.0, 0.0), ""))
            })
    }

    fn evaluated(model: &ModelDescriptor, estimates: Estimates, note: &str) -> Outcome {
        Outcome::Evaluated(model.result(estimates, note))
    }

    fn evaluation<'r>(input: &str, outcomes: Vec<(&'r ModelDescriptor, Outcome)>) -> RecordEvaluation<'r> {
        RecordEvaluation {
            record: prepare(input, &BasicNormalizer),
            outcomes: outcomes
                .into_iter()
                .map(|(model, outcome)| ModelOutcome { model, outcome })
                .collect(),
        }
    }

    fn output(format: OutputFormat) -> OutputConfig {
        OutputConfig {
            format,
            values: vec![
                ValueKind::InputSmiles,
                ValueKind::Prediction,
                ValueKind::UncertaintyLevel,
                ValueKind::DomainNote,
            ],
            header: true,
            separator: "\t".into(),
            line_ending: "\n".into(),
            keep_input: false,
        }
    }

    fn names(cells: &[(String, Cell)]) -> Vec<&str> {
        cells.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn single_records_get_scalar_columns() {
        let kow = descriptor("logKow", false);
        let estimate = Estimate::new(-0.31, UncertaintyLevel::Predicted(1), 0.4);
        let record = evaluation("CCO", vec![(&kow, evaluated(&kow, estimate.into(), "in the AD"))]);

        let cells = record_cells(&record, &output(OutputFormat::Rows).values);
        assert_eq!(
            names(&cells),
            vec!["insmi", "logKow qsarpred", "logKow UL", "logKow ULnote"]
        );
        assert_eq!(cells[1].1, Cell::Number(-0.31));
        assert_eq!(cells[2].1, Cell::Text("1".into()));
    }

    #[test]
    fn mixture_models_expand_per_reported_occupant() {
        let ksa = descriptor("logKsa", true);
        let kow = descriptor("logKow", false);
        let mirrored = Estimates::Scalar(Estimate::new(2.5, UncertaintyLevel::Predicted(2), 0.3));
        let record = evaluation(
            "{solute}CCO{solvent}O{component}CC",
            vec![
                (&ksa, evaluated(&ksa, mirrored, "")),
                (
                    &kow,
                    Outcome::NotApplicable {
                        reason: "not a mixture model".into(),
                    },
                ),
            ],
        );

        let cells = record_cells(&record, &[ValueKind::Prediction, ValueKind::DomainNote]);
        assert_eq!(
            names(&cells),
            vec![
                "logKsa qsarpred solute 1",
                "logKsa qsarpred component 1",
                "logKsa ULnote",
                "logKow qsarpred",
                "logKow ULnote",
            ]
        );
        assert_eq!(cells[0].1, Cell::Number(2.5));
        assert_eq!(cells[1].1, Cell::Number(2.5));
        assert_eq!(cells[4].1, Cell::Text("not a mixture model".into()));
    }

    #[test]
    fn later_columns_are_appended_and_back_filled() {
        let ksa = descriptor("logKsa", true);
        let per_solute = Estimates::PerOccupant(vec![Estimate::new(1.5, UncertaintyLevel::Predicted(0), 0.1)]);
        let single = evaluation(
            "CCO",
            vec![(&ksa, Outcome::NotApplicable { reason: "needs a solvent".into() })],
        );
        let mixture = evaluation("{solute}CCO{solvent}O", vec![(&ksa, evaluated(&ksa, per_solute, ""))]);

        let table = BatchTable::from_evaluations(&[single, mixture], &[ValueKind::Prediction]);
        assert_eq!(table.columns(), &["logKsa qsarpred", "logKsa qsarpred solute 1"]);
        assert_eq!(table.get(0, "logKsa qsarpred solute 1"), Some(&Cell::Missing));
        assert_eq!(table.get(1, "logKsa qsarpred"), Some(&Cell::Missing));
        assert_eq!(table.get(1, "logKsa qsarpred solute 1"), Some(&Cell::Number(1.5)));
        assert!(table.rows().iter().all(|row| row.len() == 2));
    }

    #[test]
    fn sanitize_uses_unused_substitutes() {
        assert_eq!(sanitize("a,b;c", ",", ";"), "a|b~c");
        assert_eq!(sanitize("a,b", "\t", "\n"), "a,b");
        assert_eq!(sanitize("a\tb\nc", "\t", "\n"), "a,b;c");
    }

    #[test]
    fn rows_render_blank_for_missing_values() {
        let kow = descriptor("logKow", false);
        let good = evaluation(
            "CCO",
            vec![(&kow, evaluated(&kow, Estimate::new(-0.31, UncertaintyLevel::Predicted(1), 0.4).into(), "x, y"))],
        );
        let bad = evaluation("C1CC", vec![(&kow, Outcome::NoStructure)]);
        let mut config = output(OutputFormat::Rows);
        config.separator = ",".into();
        let table = BatchTable::from_evaluations(&[good, bad], &config.values);

        assert_eq!(
            render_rows(&table, &config),
            "insmi,logKow qsarpred,logKow UL,logKow ULnote\nCCO,-0.31,1,x; y\nC1CC,,,\n"
        );
    }

    #[test]
    fn columns_render_one_line_per_column() {
        let kow = descriptor("logKow", false);
        let make = |input: &str, value: f64| {
            evaluation(
                input,
                vec![(&kow, evaluated(&kow, Estimate::without_domain(value, 0.0).into(), ""))],
            )
        };
        let table = BatchTable::from_evaluations(&[make("C", 1.0), make("CC", 1.5)], &[ValueKind::InputSmiles, ValueKind::Prediction]);
        let config = output(OutputFormat::Columns);
        assert_eq!(
            render_columns(&table, &config),
            "insmi\tC\tCC\nlogKow qsarpred\t1.0\t1.5\n"
        );
    }

    #[test]
    fn json_output_serializes_missing_as_null() {
        let mut table = BatchTable::new();
        table.push_row(vec![("a".into(), Cell::Number(1.0))]);
        table.push_row(vec![("b".into(), Cell::Text("x".into()))]);
        let json: serde_json::Value = serde_json::from_str(&render_json(&table).unwrap()).unwrap();
        assert_eq!(json["columns"], serde_json::json!(["a", "b"]));
        assert_eq!(json["rows"], serde_json::json!([[1.0, null], [null, "x"]]));
    }

    #[test]
    fn input_columns_are_kept_in_front() {
        let options = BatchInputOptions {
            header_rows: 2,
            target_header_row: 2,
            ..BatchInputOptions::default()
        };
        let text = "# units\t\nname\tsmiles\nethanol\tCCO\nwater\tO\n";
        let input = BatchInput::read_from(text.as_bytes(), &options, "mem").unwrap();

        let kow = descriptor("logKow", false);
        let make = |input: &str, value: f64| {
            evaluation(
                input,
                vec![(&kow, evaluated(&kow, Estimate::without_domain(value, 0.0).into(), ""))],
            )
        };
        let table = BatchTable::from_evaluations(
            &[make("CCO", -0.31), make("O", -1.38)],
            &[ValueKind::InputSmiles, ValueKind::Prediction],
        );
        let mut config = output(OutputFormat::Rows);
        config.keep_input = true;

        let rendered = render(&table, &config, Some(&input)).unwrap();
        assert_eq!(
            rendered,
            "# units\t\t\t\nname\tsmiles\tinsmi\tlogKow qsarpred\nethanol\tCCO\tCCO\t-0.31\nwater\tO\tO\t-1.38\n"
        );
    }
}
