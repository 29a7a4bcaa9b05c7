use super::error::EngineError;
use crate::core::models::registry::{ModelRegistry, RegistryError};
use std::collections::HashSet;
use tracing::debug;

/// Orders the dependency closure of `requested` so every dependency precedes its consumers.
///
/// Depth-first post-order from each requested model in request order. Resolved models are
/// never revisited; a model reached again while still on the active path is a cycle.
pub fn resolve(
    registry: &ModelRegistry,
    requested: &[impl AsRef<str>],
) -> Result<Vec<String>, EngineError> {
    let mut walk = Walk {
        registry,
        order: Vec::new(),
        done: HashSet::new(),
        path: Vec::new(),
    };
    for name in requested {
        walk.visit(name.as_ref(), None)?;
    }
    debug!(
        requested = requested.len(),
        resolved = walk.order.len(),
        "Resolved model dependencies"
    );
    Ok(walk.order)
}

/// Checks that every declared dependency is registered and the dependency graph is acyclic.
pub fn validate_registry(registry: &ModelRegistry) -> Result<(), EngineError> {
    let names: Vec<&str> = registry.iter().map(|m| m.name()).collect();
    resolve(registry, &names)?;
    debug!(models = names.len(), "Model registry validated");
    Ok(())
}

struct Walk<'r> {
    registry: &'r ModelRegistry,
    order: Vec<String>,
    done: HashSet<&'r str>,
    path: Vec<&'r str>,
}

impl<'r> Walk<'r> {
    fn visit(&mut self, name: &str, requested_by: Option<&str>) -> Result<(), EngineError> {
        let descriptor = self
            .registry
            .get(name)
            .map_err(|_| RegistryError::UnknownModel {
                name: name.to_string(),
                requested_by: requested_by.map(str::to_string),
            })?;
        let name = descriptor.name();
        if self.done.contains(name) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|n| *n == name) {
            let mut path: Vec<String> = self.path[start..].iter().map(|n| n.to_string()).collect();
            path.push(name.to_string());
            return Err(EngineError::CyclicDependency { path });
        }

        self.path.push(name);
        for (_, dependency) in descriptor.dependencies().iter() {
            self.visit(&dependency.model, Some(name))?;
        }
        self.path.pop();

        self.done.insert(name);
        self.order.push(name.to_string());
        Ok(())
    }
}
