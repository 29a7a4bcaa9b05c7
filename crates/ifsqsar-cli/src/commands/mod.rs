pub mod models;
pub mod predict;

use crate::error::{CliError, Result};
use ifsqsar::core::models::library::{self, ReferenceData};
use ifsqsar::core::models::registry::ModelRegistry;
use ifsqsar::engine::error::EngineError;
use std::path::Path;
use tracing::info;

/// Builds the model registry, merging an optional reference data file over the built-in tables.
fn load_registry(reference_data: Option<&Path>) -> Result<ModelRegistry> {
    let mut reference = ReferenceData::builtin().map_err(EngineError::from)?;
    if let Some(path) = reference_data {
        info!("Merging reference data from {:?}", path);
        let extra = ReferenceData::load(path).map_err(|source| CliError::ReferenceData {
            path: path.to_path_buf(),
            source,
        })?;
        reference.merge(extra);
    }
    let registry = library::registry_with(&reference).map_err(EngineError::from)?;
    info!(models = registry.len(), "Model registry loaded.");
    Ok(registry)
}
