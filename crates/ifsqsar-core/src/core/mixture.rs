use super::molecule::{Molecule, StructureNormalizer};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Solute,
    Solvent,
    Component,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Solute, Role::Solvent, Role::Component];

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "solute" => Some(Role::Solute),
            "solvent" => Some(Role::Solvent),
            "component" => Some(Role::Component),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Solute => "solute",
            Role::Solvent => "solvent",
            Role::Component => "component",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Role::Solute => "Solute",
            Role::Solvent => "Solvent",
            Role::Component => "Component",
        }
    }

    fn default_fraction(self) -> Fraction {
        match self {
            Role::Solute => Fraction::new("u", "0"),
            Role::Solvent | Role::Component => Fraction::new("u", "1"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fraction annotation of a role occupant, kept as the `(type, value)` strings the user wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fraction {
    pub kind: String,
    pub value: String,
}

impl Fraction {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    pub fn numeric(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Occupant {
    pub input: String,
    pub smiles: String,
    pub molecule: Option<Molecule>,
    pub fraction: Fraction,
}

impl Occupant {
    pub fn is_valid(&self) -> bool {
        self.molecule.is_some() && !self.smiles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleCounts {
    pub solutes: usize,
    pub solvents: usize,
    pub components: usize,
}

impl RoleCounts {
    pub fn single() -> Self {
        Self {
            solutes: 1,
            ..Self::default()
        }
    }

    pub fn get(&self, role: Role) -> usize {
        match role {
            Role::Solute => self.solutes,
            Role::Solvent => self.solvents,
            Role::Component => self.components,
        }
    }

    pub fn total(&self) -> usize {
        self.solutes + self.solvents + self.components
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleAssignment {
    pub solutes: Vec<Occupant>,
    pub solvents: Vec<Occupant>,
    pub components: Vec<Occupant>,
}

impl RoleAssignment {
    pub fn occupants(&self, role: Role) -> &[Occupant] {
        match role {
            Role::Solute => &self.solutes,
            Role::Solvent => &self.solvents,
            Role::Component => &self.components,
        }
    }

    fn occupants_mut(&mut self, role: Role) -> &mut Vec<Occupant> {
        match role {
            Role::Solute => &mut self.solutes,
            Role::Solvent => &mut self.solvents,
            Role::Component => &mut self.components,
        }
    }

    pub fn occupant(&self, role: Role, index: usize) -> Option<&Occupant> {
        self.occupants(role).get(index)
    }

    pub fn counts(&self) -> RoleCounts {
        RoleCounts {
            solutes: self.solutes.len(),
            solvents: self.solvents.len(),
            components: self.components.len(),
        }
    }

    /// Occupants that receive their own output columns: solutes first, then components.
    pub fn reported(&self) -> impl Iterator<Item = (Role, usize)> + '_ {
        (0..self.solutes.len())
            .map(|i| (Role::Solute, i))
            .chain((0..self.components.len()).map(|i| (Role::Component, i)))
    }

    pub fn reported_count(&self) -> usize {
        self.solutes.len() + self.components.len()
    }

    pub fn all_valid(&self) -> bool {
        Role::ALL
            .iter()
            .flat_map(|role| self.occupants(*role))
            .all(Occupant::is_valid)
    }
}

/// A record ready for evaluation: either one chemical or a role-tagged mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRecord {
    pub input: String,
    pub smiles: String,
    pub note: String,
    pub is_mixture: bool,
    pub assignment: RoleAssignment,
}

impl PreparedRecord {
    /// `false` when any occupant failed structure normalization.
    pub fn structure_ok(&self) -> bool {
        self.assignment.all_valid()
    }
}

pub fn is_mixture(input: &str) -> bool {
    marker_spans(input).next().is_some()
}

/// Prepares one input record, dispatching on whether it contains role markers.
pub fn prepare(input: &str, normalizer: &dyn StructureNormalizer) -> PreparedRecord {
    if is_mixture(input) {
        parse_mixture(input, normalizer)
    } else {
        prepare_single(input, normalizer)
    }
}

pub fn prepare_single(input: &str, normalizer: &dyn StructureNormalizer) -> PreparedRecord {
    let normalized = normalizer.normalize(input);
    let occupant = Occupant {
        input: input.to_string(),
        smiles: normalized.smiles.clone(),
        molecule: normalized.molecule,
        fraction: Fraction::new("u", "1"),
    };
    PreparedRecord {
        input: input.to_string(),
        smiles: normalized.smiles,
        note: normalized.note,
        is_mixture: false,
        assignment: RoleAssignment {
            solutes: vec![occupant],
            ..RoleAssignment::default()
        },
    }
}

const INVALID_ROLE_NOTE: &str = "SMILES error: invalid component type specification";

/// Parses `{role[,type:value]}structure` segments into a role assignment.
///
/// Unknown roles and malformed fraction annotations are reported in the record note and never
/// abort parsing. The canonical form substitutes each occupant's normalized SMILES and numbers
/// occupants per role from 1, in input order.
pub fn parse_mixture(input: &str, normalizer: &dyn StructureNormalizer) -> PreparedRecord {
    let mut assignment = RoleAssignment::default();
    let mut notes: Vec<String> = Vec::new();
    let mut canonical = String::new();
    let mut pending: Option<(Role, Fraction)> = None;

    for segment in segments(input) {
        match segment {
            Segment::Marker(body) => {
                let mut parts = body.splitn(2, ',');
                let role_name = parts.next().unwrap_or_default().trim();
                let Some(role) = Role::from_marker(role_name) else {
                    notes.push(INVALID_ROLE_NOTE.to_string());
                    pending = None;
                    continue;
                };
                let fraction = match parts.next() {
                    Some(spec) => match spec.split_once(':') {
                        Some((kind, value)) => Fraction::new(kind.trim(), value.trim()),
                        None => {
                            notes.push(format!(
                                "SMILES error: invalid fraction specification '{}'",
                                spec
                            ));
                            role.default_fraction()
                        }
                    },
                    None => role.default_fraction(),
                };
                pending = Some((role, fraction));
            }
            Segment::Structure(text) => {
                let Some((role, fraction)) = pending.take() else {
                    // A structure without a valid marker is itself an invalid role.
                    notes.push(INVALID_ROLE_NOTE.to_string());
                    continue;
                };
                let normalized = normalizer.normalize(text);
                let occupants = assignment.occupants_mut(role);
                occupants.push(Occupant {
                    input: text.to_string(),
                    smiles: normalized.smiles.clone(),
                    molecule: normalized.molecule,
                    fraction,
                });
                canonical.push_str(&format!(
                    "{{{} {}}}{}",
                    role,
                    occupants.len(),
                    normalized.smiles
                ));
                if !normalized.note.is_empty() {
                    notes.push(format!(
                        "Notes for {} ({}): {}",
                        role.title(),
                        text,
                        normalized.note
                    ));
                }
            }
        }
    }

    PreparedRecord {
        input: input.to_string(),
        smiles: canonical,
        note: notes.join(", "),
        is_mixture: true,
        assignment,
    }
}

enum Segment<'a> {
    Marker(&'a str),
    Structure(&'a str),
}

fn marker_spans(input: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let open = cursor + input.get(cursor..)?.find('{')?;
        let close = open + input[open..].find('}')?;
        cursor = close + 1;
        Some((open, close + 1))
    })
}

fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for (start, end) in marker_spans(input) {
        if start > last {
            segments.push(Segment::Structure(&input[last..start]));
        }
        segments.push(Segment::Marker(&input[start + 1..end - 1]));
        last = end;
    }
    if last < input.len() {
        segments.push(Segment::Structure(&input[last..]));
    }
    segments
}
