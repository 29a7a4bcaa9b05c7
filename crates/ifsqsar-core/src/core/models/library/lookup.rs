//! Reference-table models: Abraham solute descriptors, physical state, liquid molar volume
//! and gas-to-solvent system parameters.
//!
//! Every model here is a pure table lookup on the normalized SMILES. Structures outside the
//! table evaluate to the out-of-domain stand-in with an explanatory note, so downstream
//! models still run and flag the gap through their propagated domain notes.

use crate::core::io::TableError;
use crate::core::models::descriptor::{
    Calculation, ModelDescriptor, ModelError, ModelInputs, StoredValue,
};
use crate::core::models::registry::{ModelRegistry, RegistryError};
use crate::core::models::result::{Estimate, UncertaintyLevel};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const BUILTIN_REFERENCE: &str = include_str!("data/reference.toml");
const BUILTIN_SOURCE: &str = "<built-in reference data>";

const MEASURED_NOTE: &str = "experimental value used";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalState {
    Gas,
    Liquid,
    Solid,
}

impl PhysicalState {
    pub fn code(self) -> f64 {
        match self {
            PhysicalState::Gas => 0.0,
            PhysicalState::Liquid => 1.0,
            PhysicalState::Solid => 2.0,
        }
    }

    pub fn note(self) -> &'static str {
        match self {
            PhysicalState::Gas => "likely gas",
            PhysicalState::Liquid => "likely liquid",
            PhysicalState::Solid => "likely solid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SoluteEntry {
    #[serde(default)]
    pub name: String,
    pub smiles: String,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(rename = "E")]
    pub e: Option<f64>,
    #[serde(rename = "S")]
    pub s: Option<f64>,
    #[serde(rename = "A")]
    pub a: Option<f64>,
    #[serde(rename = "B")]
    pub b: Option<f64>,
    #[serde(rename = "L")]
    pub l: Option<f64>,
    pub state: Option<PhysicalState>,
    pub mv_liquid: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SolventEntry {
    #[serde(default)]
    pub name: String,
    pub smiles: String,
    #[serde(default)]
    pub citation: Option<String>,
    pub c: f64,
    pub e: f64,
    pub s: f64,
    pub a: f64,
    pub b: f64,
    pub l: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SoluteTable {
    #[serde(default)]
    pub citation: String,
    #[serde(default = "default_descriptor_error")]
    pub descriptor_error: f64,
    #[serde(default = "default_molar_volume_error")]
    pub molar_volume_error: f64,
    #[serde(default, rename = "entry")]
    pub entries: Vec<SoluteEntry>,
}

fn default_descriptor_error() -> f64 {
    0.02
}

fn default_molar_volume_error() -> f64 {
    0.5
}

impl Default for SoluteTable {
    fn default() -> Self {
        Self {
            citation: String::new(),
            descriptor_error: default_descriptor_error(),
            molar_volume_error: default_molar_volume_error(),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SolventTable {
    #[serde(default)]
    pub citation: String,
    #[serde(default, rename = "entry")]
    pub entries: Vec<SolventEntry>,
}

/// Measured solute and solvent values keyed by normalized SMILES.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceData {
    #[serde(default)]
    pub solutes: SoluteTable,
    #[serde(default)]
    pub solvents: SolventTable,
}

impl ReferenceData {
    pub fn builtin() -> Result<Self, TableError> {
        Self::parse(BUILTIN_REFERENCE, BUILTIN_SOURCE)
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path).map_err(|e| TableError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn parse(content: &str, source_name: &str) -> Result<Self, TableError> {
        let mut data: Self = toml::from_str(content).map_err(|e| TableError::Toml {
            path: source_name.to_string(),
            source: e,
        })?;
        let solute_citation = data.solutes.citation.clone();
        for entry in &mut data.solutes.entries {
            entry.citation.get_or_insert_with(|| solute_citation.clone());
        }
        let solvent_citation = data.solvents.citation.clone();
        for entry in &mut data.solvents.entries {
            entry.citation.get_or_insert_with(|| solvent_citation.clone());
        }
        debug!(
            solutes = data.solutes.entries.len(),
            solvents = data.solvents.entries.len(),
            "Loaded reference data from {}",
            source_name
        );
        Ok(data)
    }

    /// Appends `other`'s entries; later entries win for a repeated SMILES.
    pub fn merge(&mut self, other: ReferenceData) {
        self.solutes.entries.extend(other.solutes.entries);
        self.solvents.entries.extend(other.solvents.entries);
    }
}

fn missing_reference(
    model: &'static str,
) -> impl Fn(&ModelInputs<'_>) -> Result<Calculation, ModelError> + Send + Sync {
    move |_: &ModelInputs<'_>| {
        Ok(Calculation::new(
            Estimate::not_applicable(),
            format!("no reference value of {} available for this structure", model),
        ))
    }
}

fn measured(entry_citation: &Option<String>, estimate: Estimate, note: &str) -> StoredValue {
    StoredValue {
        estimate,
        note: note.to_string(),
        citation: entry_citation.clone().filter(|c| !c.is_empty()),
    }
}

type SoluteField = fn(&SoluteEntry) -> Option<f64>;

const SOLUTE_DESCRIPTORS: [(&str, &str, &str, SoluteField); 5] = [
    (
        "E",
        "Abraham PPLFER solute descriptor E - excess molar refraction",
        "(cm^3/mol)/10",
        |entry| entry.e,
    ),
    (
        "S",
        "Abraham PPLFER solute descriptor S - dipolarity/polarizability",
        "unitless",
        |entry| entry.s,
    ),
    (
        "A",
        "Abraham PPLFER solute descriptor A - hydrogen bond acidity",
        "unitless",
        |entry| entry.a,
    ),
    (
        "B",
        "Abraham PPLFER solute descriptor B - hydrogen bond basicity",
        "unitless",
        |entry| entry.b,
    ),
    (
        "L",
        "Abraham PPLFER solute descriptor L - log of hexadecane-air partition coefficient",
        "log L[a]/L[hxd]",
        |entry| entry.l,
    ),
];

type SolventField = fn(&SolventEntry) -> f64;

const SOLVENT_PARAMETERS: [(&str, &str, SolventField); 6] = [
    ("e", "PPLFER solvent system parameter e for gas-solvent partitioning", |entry| entry.e),
    ("s", "PPLFER solvent system parameter s for gas-solvent partitioning", |entry| entry.s),
    ("a", "PPLFER solvent system parameter a for gas-solvent partitioning", |entry| entry.a),
    ("b", "PPLFER solvent system parameter b for gas-solvent partitioning", |entry| entry.b),
    ("l", "PPLFER solvent system parameter l for gas-solvent partitioning", |entry| entry.l),
    ("c", "PPLFER solvent system constant c for gas-solvent partitioning", |entry| entry.c),
];

pub fn register(registry: &mut ModelRegistry, data: &ReferenceData) -> Result<(), RegistryError> {
    let solutes = &data.solutes;

    for (name, endpoint, units, field) in SOLUTE_DESCRIPTORS {
        let mut builder = ModelDescriptor::builder(name)
            .endpoint(endpoint)
            .units(units)
            .citation(&solutes.citation)
            .round_digits(3);
        for entry in &solutes.entries {
            if let Some(value) = field(entry) {
                builder = builder.stored(
                    &entry.smiles,
                    measured(
                        &entry.citation,
                        Estimate::new(value, UncertaintyLevel::Experimental, solutes.descriptor_error),
                        MEASURED_NOTE,
                    ),
                );
            }
        }
        registry.register(builder.build(missing_reference(name)))?;
    }

    let mut state = ModelDescriptor::builder("state")
        .endpoint("Physical state at 298K: 0 gas, 1 liquid, 2 solid")
        .units("state code")
        .citation(&solutes.citation)
        .round_digits(0);
    for entry in &solutes.entries {
        if let Some(phase) = entry.state {
            state = state.stored(
                &entry.smiles,
                measured(
                    &entry.citation,
                    Estimate::new(phase.code(), UncertaintyLevel::Experimental, f64::NAN),
                    phase.note(),
                ),
            );
        }
    }
    registry.register(state.build(missing_reference("state")))?;

    let mut molar_volume = ModelDescriptor::builder("MVliquid")
        .endpoint("Molar volume of the liquid or super-cooled liquid at 298K")
        .units("cm^3/mol")
        .citation(&solutes.citation)
        .round_digits(2);
    for entry in &solutes.entries {
        if let Some(value) = entry.mv_liquid {
            molar_volume = molar_volume.stored(
                &entry.smiles,
                measured(
                    &entry.citation,
                    Estimate::new(value, UncertaintyLevel::Experimental, solutes.molar_volume_error),
                    MEASURED_NOTE,
                ),
            );
        }
    }
    registry.register(molar_volume.build(missing_reference("MVliquid")))?;

    let solvents = &data.solvents;
    for (name, endpoint, field) in SOLVENT_PARAMETERS {
        let mut builder = ModelDescriptor::builder(name)
            .endpoint(endpoint)
            .units("unitless")
            .citation(&solvents.citation)
            .round_digits(3);
        for entry in &solvents.entries {
            builder = builder.stored(
                &entry.smiles,
                measured(
                    &entry.citation,
                    Estimate::new(field(entry), UncertaintyLevel::Experimental, 0.0),
                    MEASURED_NOTE,
                ),
            );
        }
        registry.register(builder.build(missing_reference(name)))?;
    }

    Ok(())
}
