use super::result::{Estimate, Estimates, EvaluationResult};
use crate::core::mixture::{Fraction, Role, RoleCounts};
use crate::core::molecule::Molecule;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("dependency '{0}' was not supplied")]
    MissingDependency(String),
    #[error("no {role} occupant at index {index}")]
    MissingOccupant { role: Role, index: usize },
    #[error("invalid model input: {0}")]
    InvalidInput(String),
    #[error("expected {expected} estimates (one per reported occupant), got {actual}")]
    ValueShape { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

impl Bounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    pub const fn at_least(min: usize) -> Self {
        Self::new(min, usize::MAX)
    }

    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max == usize::MAX {
            write!(f, "at least {}", self.min)
        } else if self.min == self.max {
            write!(f, "exactly {}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// Role cardinality constraints a record must satisfy before a model may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChemicalInputs {
    pub solute: Bounds,
    pub solvent: Bounds,
    pub component: Bounds,
    pub total: Bounds,
}

impl ChemicalInputs {
    /// Exactly one solute and nothing else.
    pub const fn single() -> Self {
        Self {
            solute: Bounds::new(1, 1),
            solvent: Bounds::none(),
            component: Bounds::none(),
            total: Bounds::new(1, 1),
        }
    }

    pub fn admits(&self, counts: RoleCounts) -> Result<(), String> {
        for (role, bounds) in [
            (Role::Solute, self.solute),
            (Role::Solvent, self.solvent),
            (Role::Component, self.component),
        ] {
            let n = counts.get(role);
            if !bounds.contains(n) {
                return Err(format!(
                    "model requires {} {} input(s), record has {}",
                    bounds, role, n
                ));
            }
        }
        if !self.total.contains(counts.total()) {
            return Err(format!(
                "model requires {} chemical input(s) in total, record has {}",
                self.total,
                counts.total()
            ));
        }
        Ok(())
    }
}

impl Default for ChemicalInputs {
    fn default() -> Self {
        Self::single()
    }
}

/// A consumed model and the highest Uncertainty Level rank it is expected to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub model: String,
    pub ceiling: u8,
}

impl Dependency {
    pub fn new(model: impl Into<String>, ceiling: u8) -> Self {
        Self {
            model: model.into(),
            ceiling,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDependencies {
    pub solute: Vec<Dependency>,
    pub solvent: Vec<Dependency>,
    pub component: Vec<Dependency>,
}

impl RoleDependencies {
    pub fn for_role(&self, role: Role) -> &[Dependency] {
        match role {
            Role::Solute => &self.solute,
            Role::Solvent => &self.solvent,
            Role::Component => &self.component,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &Dependency)> {
        Role::ALL
            .into_iter()
            .flat_map(move |role| self.for_role(role).iter().map(move |dep| (role, dep)))
    }

    pub fn is_empty(&self) -> bool {
        self.solute.is_empty() && self.solvent.is_empty() && self.component.is_empty()
    }
}

/// A reference value returned instead of a calculation for a known normalized SMILES.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub estimate: Estimate,
    pub note: String,
    pub citation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DependencyValue<'a> {
    pub estimate: Estimate,
    pub note: &'a str,
}

/// Dependency results gathered for one occupant, keyed by model name.
#[derive(Debug, Clone, Default)]
pub struct DependencyValues<'a> {
    entries: HashMap<&'a str, DependencyValue<'a>>,
}

impl<'a> DependencyValues<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: &'a str, estimate: Estimate, note: &'a str) {
        self.entries.insert(model, DependencyValue { estimate, note });
    }

    pub fn get(&self, model: &str) -> Result<DependencyValue<'a>, ModelError> {
        self.entries
            .get(model)
            .copied()
            .ok_or_else(|| ModelError::MissingDependency(model.to_string()))
    }

    pub fn estimate(&self, model: &str) -> Result<Estimate, ModelError> {
        self.get(model).map(|dep| dep.estimate)
    }

    pub fn value(&self, model: &str) -> Result<f64, ModelError> {
        self.get(model).map(|dep| dep.estimate.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OccupantInputs<'a> {
    pub smiles: &'a str,
    pub molecule: &'a Molecule,
    pub fraction: &'a Fraction,
    pub dependencies: DependencyValues<'a>,
}

/// Everything a model sees when it is invoked for one record slot.
#[derive(Debug, Clone, Default)]
pub struct ModelInputs<'a> {
    pub solutes: Vec<OccupantInputs<'a>>,
    pub solvents: Vec<OccupantInputs<'a>>,
    pub components: Vec<OccupantInputs<'a>>,
    /// Domain notes raised while gathering dependencies; models put them first in their note.
    pub propagated_notes: String,
    /// `true` when the model runs on a whole mixture record rather than one occupant.
    pub mixture: bool,
}

impl<'a> ModelInputs<'a> {
    pub fn occupants(&self, role: Role) -> &[OccupantInputs<'a>] {
        match role {
            Role::Solute => &self.solutes,
            Role::Solvent => &self.solvents,
            Role::Component => &self.components,
        }
    }

    pub fn occupant(&self, role: Role, index: usize) -> Result<&OccupantInputs<'a>, ModelError> {
        self.occupants(role)
            .get(index)
            .ok_or(ModelError::MissingOccupant { role, index })
    }

    pub fn solute(&self) -> Result<&OccupantInputs<'a>, ModelError> {
        self.occupant(Role::Solute, 0)
    }

    /// Number of estimates a per-occupant result must carry.
    pub fn reported_count(&self) -> usize {
        if self.mixture {
            self.solutes.len() + self.components.len()
        } else {
            1
        }
    }

    /// The single occupant's SMILES used for reference lookups, when not a mixture slot.
    pub fn lookup_smiles(&self) -> Option<&'a str> {
        if self.mixture {
            None
        } else {
            self.solutes.first().map(|occupant| occupant.smiles)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub estimates: Estimates,
    pub note: String,
}

impl Calculation {
    pub fn new(estimates: impl Into<Estimates>, note: impl Into<String>) -> Self {
        Self {
            estimates: estimates.into(),
            note: note.into(),
        }
    }
}

pub trait Model: Send + Sync {
    fn calculate(&self, inputs: &ModelInputs<'_>) -> Result<Calculation, ModelError>;
}

impl<F> Model for F
where
    F: Fn(&ModelInputs<'_>) -> Result<Calculation, ModelError> + Send + Sync,
{
    fn calculate(&self, inputs: &ModelInputs<'_>) -> Result<Calculation, ModelError> {
        self(inputs)
    }
}

/// Immutable description of a registered model.
pub struct ModelDescriptor {
    name: String,
    value_names: Vec<String>,
    version: u32,
    endpoint: String,
    units: String,
    citation: String,
    round_digits: u32,
    chemical_inputs: ChemicalInputs,
    dependencies: RoleDependencies,
    mixture: bool,
    default_group: bool,
    stored: HashMap<String, StoredValue>,
    model: Box<dyn Model>,
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("mixture", &self.mixture)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl ModelDescriptor {
    pub fn builder(name: impl Into<String>) -> ModelDescriptorBuilder {
        ModelDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_names(&self) -> &[String] {
        &self.value_names
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn citation(&self) -> &str {
        &self.citation
    }

    pub fn round_digits(&self) -> u32 {
        self.round_digits
    }

    pub fn chemical_inputs(&self) -> &ChemicalInputs {
        &self.chemical_inputs
    }

    pub fn dependencies(&self) -> &RoleDependencies {
        &self.dependencies
    }

    pub fn is_mixture(&self) -> bool {
        self.mixture
    }

    pub fn in_default_group(&self) -> bool {
        self.default_group
    }

    pub fn stored_value(&self, smiles: &str) -> Option<&StoredValue> {
        self.stored.get(smiles)
    }

    /// Wraps an estimate in this model's citation, units and endpoint.
    pub fn result(&self, estimates: impl Into<Estimates>, note: impl Into<String>) -> EvaluationResult {
        EvaluationResult {
            estimates: estimates.into(),
            note: note.into(),
            citation: self.citation.clone(),
            units: self.units.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn stored_result(&self, stored: &StoredValue) -> EvaluationResult {
        let mut result = self.result(stored.estimate, stored.note.clone());
        if let Some(citation) = &stored.citation {
            result.citation = citation.clone();
        }
        result
    }

    /// Applies the model to prepared inputs.
    ///
    /// Reference values for the occupant's normalized SMILES take precedence over the
    /// calculation. Calculated estimates are shape-checked against the reported occupant
    /// count and rounded to the model's precision.
    pub fn apply_model(&self, inputs: &ModelInputs<'_>) -> Result<EvaluationResult, ModelError> {
        if let Some(stored) = inputs.lookup_smiles().and_then(|s| self.stored.get(s)) {
            return Ok(self.stored_result(stored));
        }

        let calculation = self.model.calculate(inputs)?;
        if let Estimates::PerOccupant(list) = &calculation.estimates {
            let expected = inputs.reported_count();
            if list.len() != expected {
                return Err(ModelError::ValueShape {
                    expected,
                    actual: list.len(),
                });
            }
        }

        Ok(self.result(
            calculation.estimates.rounded(self.round_digits),
            calculation.note,
        ))
    }
}

pub struct ModelDescriptorBuilder {
    name: String,
    value_names: Vec<String>,
    version: u32,
    endpoint: String,
    units: String,
    citation: String,
    round_digits: u32,
    chemical_inputs: ChemicalInputs,
    dependencies: RoleDependencies,
    mixture: bool,
    default_group: bool,
    stored: HashMap<String, StoredValue>,
}

impl ModelDescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value_names: vec![name.clone()],
            name,
            version: 1,
            endpoint: String::new(),
            units: String::new(),
            citation: String::new(),
            round_digits: 2,
            chemical_inputs: ChemicalInputs::single(),
            dependencies: RoleDependencies::default(),
            mixture: false,
            default_group: false,
            stored: HashMap::new(),
        }
    }

    pub fn value_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_names = names.into_iter().map(Into::into).collect();
        self
    }
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }
    pub fn citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = citation.into();
        self
    }
    pub fn round_digits(mut self, digits: u32) -> Self {
        self.round_digits = digits;
        self
    }
    pub fn chemical_inputs(mut self, inputs: ChemicalInputs) -> Self {
        self.chemical_inputs = inputs;
        self
    }
    pub fn depends_on(mut self, role: Role, model: impl Into<String>, ceiling: u8) -> Self {
        let dependency = Dependency::new(model, ceiling);
        match role {
            Role::Solute => self.dependencies.solute.push(dependency),
            Role::Solvent => self.dependencies.solvent.push(dependency),
            Role::Component => self.dependencies.component.push(dependency),
        }
        self
    }
    pub fn solute_dependencies(mut self, deps: &[(&str, u8)]) -> Self {
        for (model, ceiling) in deps {
            self = self.depends_on(Role::Solute, *model, *ceiling);
        }
        self
    }
    pub fn mixture(mut self, mixture: bool) -> Self {
        self.mixture = mixture;
        self
    }
    pub fn default_group(mut self, included: bool) -> Self {
        self.default_group = included;
        self
    }
    pub fn stored(mut self, smiles: impl Into<String>, value: StoredValue) -> Self {
        self.stored.insert(smiles.into(), value);
        self
    }

    pub fn build(self, model: impl Model + 'static) -> ModelDescriptor {
        ModelDescriptor {
            name: self.name,
            value_names: self.value_names,
            version: self.version,
            endpoint: self.endpoint,
            units: self.units,
            citation: self.citation,
            round_digits: self.round_digits,
            chemical_inputs: self.chemical_inputs,
            dependencies: self.dependencies,
            mixture: self.mixture,
            default_group: self.default_group,
            stored: self.stored,
            model: Box::new(model),
        }
    }
}
