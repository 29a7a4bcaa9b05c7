//! The shipped model library.
//!
//! Registration order is the listing order: structure models, reference lookups, PPLFER meta
//! models, then mixture models.

pub mod lookup;
pub mod mixture;
pub mod pplfer;
pub mod volume;

pub use lookup::ReferenceData;

use super::registry::{ModelRegistry, RegistryError};
use crate::core::io::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed to load reference data: {0}")]
    Reference(#[from] TableError),
    #[error("Failed to register built-in models: {0}")]
    Registry(#[from] RegistryError),
}

/// Builds the registry of every shipped model backed by `reference`.
pub fn registry_with(reference: &ReferenceData) -> Result<ModelRegistry, RegistryError> {
    let mut registry = ModelRegistry::new();
    volume::register(&mut registry)?;
    lookup::register(&mut registry, reference)?;
    pplfer::register(&mut registry)?;
    mixture::register(&mut registry)?;
    Ok(registry)
}

impl ModelRegistry {
    /// The shipped library with the built-in reference data.
    pub fn builtin() -> Result<Self, LibraryError> {
        let reference = ReferenceData::builtin()?;
        Ok(registry_with(&reference)?)
    }
}
