use crate::core::mixture::Role;
use crate::core::models::result::Outcome;
use std::collections::HashMap;
use std::fmt;

/// Where a model is evaluated within one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// A single occupant viewed as a one-chemical record.
    Occupant { role: Role, index: usize },
    /// The whole mixture record.
    Mixture,
}

impl Slot {
    pub const fn single() -> Self {
        Slot::Occupant {
            role: Role::Solute,
            index: 0,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Occupant { role, index } => write!(f, "{} {}", role, index + 1),
            Slot::Mixture => f.write_str("mixture"),
        }
    }
}

/// Per-record memo of every `(model, slot)` outcome. Never shared across records.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<(String, Slot), Outcome>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: &str, slot: Slot, outcome: Outcome) {
        self.entries.insert((model.to_string(), slot), outcome);
    }

    pub fn get(&self, model: &str, slot: Slot) -> Option<&Outcome> {
        self.entries.get(&(model.to_string(), slot))
    }

    pub fn contains(&self, model: &str, slot: Slot) -> bool {
        self.get(model, slot).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
