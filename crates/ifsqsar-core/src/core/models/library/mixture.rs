//! Mixture-aware models evaluated on whole records.

use crate::core::mixture::Role;
use crate::core::models::descriptor::{
    Bounds, Calculation, ChemicalInputs, ModelDescriptor, ModelError, ModelInputs,
};
use crate::core::models::registry::{ModelRegistry, RegistryError};
use crate::core::models::result::{Estimate, Estimates, UncertaintyLevel};
use crate::core::models::uncertainty::{aggregate, base_error_scale, join_notes};

const SOLUTE_DESCRIPTORS: [&str; 5] = ["E", "S", "A", "B", "L"];
const SOLVENT_PARAMETERS: [&str; 5] = ["e", "s", "a", "b", "l"];

/// Solvent-air partitioning of every solute into the single solvent:
/// `logKsa = c + eE + sS + aA + bB + lL`.
fn solvent_air_partitioning(inputs: &ModelInputs<'_>) -> Result<Calculation, ModelError> {
    let solvent = &inputs.occupant(Role::Solvent, 0)?.dependencies;
    let constant = solvent.estimate("c")?;
    let parameters = SOLVENT_PARAMETERS
        .iter()
        .map(|name| solvent.estimate(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut estimates = Vec::with_capacity(inputs.solutes.len());
    let mut notes = Vec::with_capacity(inputs.solutes.len());
    for (index, solute) in inputs.solutes.iter().enumerate() {
        let descriptors = SOLUTE_DESCRIPTORS
            .iter()
            .map(|name| solute.dependencies.estimate(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut value = constant.value;
        let mut variance = constant.error.powi(2);
        for (descriptor, parameter) in descriptors.iter().zip(&parameters) {
            value += parameter.value * descriptor.value;
            variance += (parameter.value * descriptor.error).powi(2)
                + (descriptor.value * parameter.error).powi(2);
        }

        let levels: Vec<(&str, Option<UncertaintyLevel>)> = SOLUTE_DESCRIPTORS
            .iter()
            .zip(&descriptors)
            .filter(|(name, _)| **name != "E")
            .map(|(name, estimate)| (*name, estimate.uncertainty))
            .collect();
        let aggregate = aggregate(&levels);
        let error = variance.sqrt() * base_error_scale(aggregate.level);
        estimates.push(Estimate::new(value, aggregate.level, error));
        notes.push(if inputs.solutes.len() > 1 {
            format!("solute {}: {}", index + 1, aggregate.note)
        } else {
            aggregate.note
        });
    }

    let note = join_notes(
        std::iter::once(inputs.propagated_notes.as_str()).chain(notes.iter().map(String::as_str)),
        "; ",
    );
    Ok(Calculation::new(Estimates::PerOccupant(estimates), note))
}

/// Fraction-weighted mean liquid molar volume of the components.
fn mixture_molar_volume(inputs: &ModelInputs<'_>) -> Result<Calculation, ModelError> {
    let mut weights = Vec::with_capacity(inputs.components.len());
    for (index, component) in inputs.components.iter().enumerate() {
        match component.fraction.numeric() {
            Some(weight) if weight >= 0.0 => weights.push(weight),
            _ => {
                return Ok(Calculation::new(
                    Estimate::without_domain(f64::NAN, f64::NAN),
                    format!(
                        "component {} has a non-numeric or negative fraction '{}'",
                        index + 1,
                        component.fraction.value
                    ),
                ));
            }
        }
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Ok(Calculation::new(
            Estimate::without_domain(f64::NAN, f64::NAN),
            "component fractions sum to zero",
        ));
    }

    let mut value = 0.0;
    let mut variance = 0.0;
    let mut levels = Vec::with_capacity(weights.len());
    for (component, weight) in inputs.components.iter().zip(&weights) {
        let volume = component.dependencies.estimate("MVliquid")?;
        let share = weight / total;
        value += share * volume.value;
        variance += (share * volume.error).powi(2);
        levels.push(("MVliquid", volume.uncertainty));
    }
    let level = aggregate(&levels).level;

    Ok(Calculation::new(
        Estimate::new(value, level, variance.sqrt()),
        inputs.propagated_notes.clone(),
    ))
}

pub fn register(registry: &mut ModelRegistry) -> Result<(), RegistryError> {
    let mut partitioning = ModelDescriptor::builder("logKsa")
        .endpoint("Log of solvent-air partition coefficient of each solute into the solvent, predicted by PPLFER at 298K")
        .units("log L[a]/L[s]")
        .citation(
            "Abraham, M. H.; Smith, R. E.; Luchtefeld, R.; Boorem, A. J.; Luo, R.; Acree, W. E., \
             Prediction of solubility of drugs and other compounds in organic solvents. \
             J Pharm Sci 2010, 99 (3), 1500-1515.",
        )
        .round_digits(2)
        .mixture(true)
        .default_group(true)
        .chemical_inputs(ChemicalInputs {
            solute: Bounds::at_least(1),
            solvent: Bounds::new(1, 1),
            component: Bounds::none(),
            total: Bounds::at_least(2),
        });
    for descriptor in SOLUTE_DESCRIPTORS {
        partitioning = partitioning.depends_on(Role::Solute, descriptor, 3);
    }
    for parameter in SOLVENT_PARAMETERS.iter().chain(&["c"]) {
        partitioning = partitioning.depends_on(Role::Solvent, *parameter, 1);
    }
    registry.register(partitioning.build(solvent_air_partitioning))?;

    registry.register(
        ModelDescriptor::builder("MVmixture")
            .endpoint("Fraction-weighted mean liquid molar volume of the mixture components")
            .units("cm^3/mol")
            .citation("Ideal mixing of component liquid molar volumes")
            .round_digits(2)
            .mixture(true)
            .default_group(true)
            .chemical_inputs(ChemicalInputs {
                solute: Bounds::none(),
                solvent: Bounds::none(),
                component: Bounds::at_least(2),
                total: Bounds::at_least(2),
            })
            .depends_on(Role::Component, "MVliquid", 2)
            .build(mixture_molar_volume),
    )?;
    Ok(())
}
