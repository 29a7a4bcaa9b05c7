pub mod descriptor;
pub mod library;
pub mod registry;
pub mod result;
pub mod uncertainty;
pub mod user_values;

pub use descriptor::{
    Bounds, Calculation, ChemicalInputs, Dependency, DependencyValues, Model, ModelDescriptor,
    ModelError, ModelInputs, OccupantInputs, StoredValue,
};
pub use registry::{ModelGroup, ModelRegistry, RegistryError};
pub use result::{Estimate, Estimates, EvaluationResult, Outcome, UncertaintyLevel};
pub use user_values::UserValues;
