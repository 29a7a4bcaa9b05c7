use super::result::{Estimate, UncertaintyLevel};
use crate::core::io::TableError;
use crate::core::molecule::StructureNormalizer;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const USER_VALUE_NOTE: &str = "user supplied value";

#[derive(Debug, Deserialize)]
struct UserValueRecord {
    smiles: String,
    model: String,
    value: f64,
    #[serde(default)]
    error: Option<f64>,
}

/// User-supplied model values that override calculation for matching structures.
///
/// Read from a comma-separated table with the columns `smiles`, `model`, `value` and an
/// optional `error`. Values are reported with the `U` Uncertainty Level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserValues {
    values: HashMap<(String, String), Estimate>,
}

impl UserValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let file = std::fs::File::open(path).map_err(|e| TableError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_reader(file, &path.to_string_lossy())
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<Self, TableError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut values = Self::new();
        for (index, record) in csv_reader.deserialize::<UserValueRecord>().enumerate() {
            let record = record.map_err(|e| TableError::Csv {
                path: source_name.to_string(),
                source: e,
            })?;
            if record.smiles.is_empty() || record.model.is_empty() {
                return Err(TableError::InvalidValue {
                    path: source_name.to_string(),
                    record: index + 1,
                    message: "smiles and model must not be empty".to_string(),
                });
            }
            values.insert(
                record.smiles,
                record.model,
                record.value,
                record.error.unwrap_or(f64::NAN),
            );
        }
        Ok(values)
    }

    pub fn insert(
        &mut self,
        smiles: impl Into<String>,
        model: impl Into<String>,
        value: f64,
        error: f64,
    ) {
        self.values.insert(
            (model.into(), smiles.into()),
            Estimate::new(value, UncertaintyLevel::User, error),
        );
    }

    /// Re-keys every entry by the normalizer's SMILES so lookups match prepared occupants.
    pub fn normalized(self, normalizer: &dyn StructureNormalizer) -> Self {
        let values = self
            .values
            .into_iter()
            .map(|((model, smiles), estimate)| {
                let normalized = normalizer.normalize(&smiles);
                let key = if normalized.is_success() {
                    normalized.smiles
                } else {
                    smiles
                };
                ((model, key), estimate)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, model: &str, smiles: &str) -> Option<Estimate> {
        self.values
            .get(&(model.to_string(), smiles.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::molecule::BasicNormalizer;
    use std::io::Write;

    #[test]
    fn reads_values_with_optional_errors() {
        let table = "smiles,model,value,error\nCCO,S,0.42,0.01\nCCO,L,1.485,\n";
        let values = UserValues::from_reader(table.as_bytes(), "mem").unwrap();

        assert_eq!(values.len(), 2);
        let s = values.get("S", "CCO").unwrap();
        assert_eq!(s.value, 0.42);
        assert_eq!(s.error, 0.01);
        assert_eq!(s.uncertainty, Some(UncertaintyLevel::User));
        assert!(values.get("L", "CCO").unwrap().error.is_nan());
        assert!(values.get("A", "CCO").is_none());
    }

    #[test]
    fn malformed_values_are_reported() {
        let table = "smiles,model,value\nCCO,S,abc\n";
        assert!(matches!(
            UserValues::from_reader(table.as_bytes(), "mem"),
            Err(TableError::Csv { .. })
        ));
    }

    #[test]
    fn keys_are_normalized_before_lookup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "smiles,model,value").unwrap();
        writeln!(file, " CCO ,B,0.48").unwrap();
        let values = UserValues::load(file.path())
            .unwrap()
            .normalized(&BasicNormalizer);
        assert_eq!(values.get("B", "CCO").unwrap().value, 0.48);
    }
}
