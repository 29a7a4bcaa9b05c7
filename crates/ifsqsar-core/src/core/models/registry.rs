use super::descriptor::ModelDescriptor;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RegistryError {
    #[error("A model named '{0}' is already registered")]
    DuplicateModel(String),
    #[error("Unknown model '{name}'{}", required_by(.requested_by))]
    UnknownModel {
        name: String,
        requested_by: Option<String>,
    },
    #[error("Unknown model group '{0}'")]
    UnknownGroup(String),
}

fn required_by(requested_by: &Option<String>) -> String {
    requested_by
        .as_ref()
        .map(|r| format!(" (required by '{}')", r))
        .unwrap_or_default()
}

/// Convenience groups used to expand model lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelGroup {
    /// Models flagged for the default report.
    Default,
    /// Every single-chemical model.
    Pure,
    /// Every mixture-aware model.
    Mixture,
    All,
}

impl ModelGroup {
    pub fn contains(self, descriptor: &ModelDescriptor) -> bool {
        match self {
            ModelGroup::Default => descriptor.in_default_group(),
            ModelGroup::Pure => !descriptor.is_mixture(),
            ModelGroup::Mixture => descriptor.is_mixture(),
            ModelGroup::All => true,
        }
    }
}

impl FromStr for ModelGroup {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(ModelGroup::Default),
            "pure" => Ok(ModelGroup::Pure),
            "mixture" => Ok(ModelGroup::Mixture),
            "all" => Ok(ModelGroup::All),
            other => Err(RegistryError::UnknownGroup(other.to_string())),
        }
    }
}

impl fmt::Display for ModelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelGroup::Default => "default",
            ModelGroup::Pure => "pure",
            ModelGroup::Mixture => "mixture",
            ModelGroup::All => "all",
        })
    }
}

/// Name-indexed model descriptors in registration order.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ModelDescriptor) -> Result<(), RegistryError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateModel(descriptor.name().to_string()));
        }
        self.index
            .insert(descriptor.name().to_string(), self.models.len());
        self.models.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ModelDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.models[i])
            .ok_or_else(|| RegistryError::UnknownModel {
                name: name.to_string(),
                requested_by: None,
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn list_by_tag(&self, group: ModelGroup) -> Vec<&ModelDescriptor> {
        self.models.iter().filter(|m| group.contains(m)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Expands a user model list where each entry is a model name or a group name.
    ///
    /// Duplicates are dropped, keeping the first occurrence.
    pub fn expand(&self, entries: &[impl AsRef<str>]) -> Result<Vec<String>, RegistryError> {
        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let expanded: Vec<String> = if self.contains(entry) {
                vec![entry.to_string()]
            } else {
                match entry.parse::<ModelGroup>() {
                    Ok(group) => self
                        .list_by_tag(group)
                        .into_iter()
                        .map(|m| m.name().to_string())
                        .collect(),
                    Err(_) => {
                        return Err(RegistryError::UnknownModel {
                            name: entry.to_string(),
                            requested_by: None,
                        });
                    }
                }
            };
            for name in expanded {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::descriptor::{Calculation, ModelInputs};
    use crate::core::models::result::Estimate;

    fn stub(name: &str, mixture: bool, default_group: bool) -> ModelDescriptor {
        ModelDescriptor::builder(name)
            .mixture(mixture)
            .default_group(default_group)
            .build(|_: &ModelInputs<'_>| {
                Ok(Calculation::new(Estimate::without_domain(0.0, 0.0), ""))
            })
    }

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(stub("Vf", false, false)).unwrap();
        registry.register(stub("logKow", false, true)).unwrap();
        registry.register(stub("logKsa", true, true)).unwrap();
        registry
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        assert_eq!(
            registry.register(stub("Vf", false, false)),
            Err(RegistryError::DuplicateModel("Vf".into()))
        );
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn unknown_names_are_errors() {
        assert!(matches!(
            registry().get("logKxy"),
            Err(RegistryError::UnknownModel { name, .. }) if name == "logKxy"
        ));
    }

    #[test]
    fn groups_preserve_registration_order() {
        let registry = registry();
        let names = |group: ModelGroup| -> Vec<String> {
            registry
                .list_by_tag(group)
                .into_iter()
                .map(|m| m.name().to_string())
                .collect()
        };
        assert_eq!(names(ModelGroup::Pure), vec!["Vf", "logKow"]);
        assert_eq!(names(ModelGroup::Mixture), vec!["logKsa"]);
        assert_eq!(names(ModelGroup::Default), vec!["logKow", "logKsa"]);
    }

    #[test]
    fn expand_mixes_names_and_groups_without_duplicates() {
        let registry = registry();
        let expanded = registry.expand(&["logKsa", "pure", "Vf"]).unwrap();
        assert_eq!(expanded, vec!["logKsa", "Vf", "logKow"]);
        assert!(registry.expand(&["nonsense"]).is_err());
    }
}
