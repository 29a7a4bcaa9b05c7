use super::cache::{ResultCache, Slot};
use super::error::EngineError;
use super::resolver;
use crate::core::mixture::{Occupant, PreparedRecord, Role, RoleCounts};
use crate::core::models::descriptor::{
    DependencyValues, ModelDescriptor, ModelError, ModelInputs, OccupantInputs,
};
use crate::core::models::registry::ModelRegistry;
use crate::core::models::result::{Estimate, Outcome};
use crate::core::models::user_values::{USER_VALUE_NOTE, UserValues};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace, warn};

/// Requested models together with their resolved evaluation order.
///
/// Resolved once per batch and reused for every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPlan {
    requested: Vec<String>,
    order: Vec<String>,
}

impl EvaluationPlan {
    pub fn new(registry: &ModelRegistry, requested: Vec<String>) -> Result<Self, EngineError> {
        let order = resolver::resolve(registry, &requested)?;
        Ok(Self { requested, order })
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }
}

/// The outcome of one requested model on one record.
#[derive(Debug, Clone)]
pub struct ModelOutcome<'r> {
    pub model: &'r ModelDescriptor,
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct RecordEvaluation<'r> {
    pub record: PreparedRecord,
    /// Requested models in request order.
    pub outcomes: Vec<ModelOutcome<'r>>,
}

impl<'r> RecordEvaluation<'r> {
    pub fn outcome(&self, model: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|entry| entry.model.name() == model)
            .map(|entry| &entry.outcome)
    }
}

pub struct Evaluator<'r, 'u> {
    registry: &'r ModelRegistry,
    user_values: &'u UserValues,
}

impl<'r, 'u> Evaluator<'r, 'u> {
    pub fn new(registry: &'r ModelRegistry, user_values: &'u UserValues) -> Self {
        Self {
            registry,
            user_values,
        }
    }

    /// Evaluates the plan against one prepared record with a fresh result cache.
    pub fn evaluate(
        &self,
        plan: &EvaluationPlan,
        record: PreparedRecord,
    ) -> Result<RecordEvaluation<'r>, EngineError> {
        let requested = plan
            .requested()
            .iter()
            .map(|name| self.registry.get(name))
            .collect::<Result<Vec<_>, _>>()?;

        if !record.structure_ok() {
            warn!(input = %record.input, note = %record.note, "Structure normalization failed");
            let outcomes = requested
                .into_iter()
                .map(|model| ModelOutcome {
                    model,
                    outcome: Outcome::NoStructure,
                })
                .collect();
            return Ok(RecordEvaluation { record, outcomes });
        }

        let root = if record.is_mixture {
            Slot::Mixture
        } else {
            Slot::single()
        };
        let demand = self.propagate_demand(plan, &record, root)?;

        let mut cache = ResultCache::new();
        for name in plan.order() {
            let Some(slots) = demand.get(name.as_str()) else {
                continue;
            };
            let descriptor = self.registry.get(name)?;
            for &slot in slots {
                if cache.contains(name, slot) {
                    continue;
                }
                let outcome = self.evaluate_slot(descriptor, &record, slot, &cache)?;
                trace!(model = %name, %slot, "Evaluated model");
                cache.insert(name, slot, outcome);
            }
        }
        debug!(input = %record.input, cached = cache.len(), "Evaluated record");

        let outcomes = requested
            .into_iter()
            .map(|model| ModelOutcome {
                model,
                outcome: cache
                    .get(model.name(), root)
                    .cloned()
                    .unwrap_or(Outcome::NoStructure),
            })
            .collect();
        Ok(RecordEvaluation { record, outcomes })
    }

    fn propagate_demand<'p>(
        &self,
        plan: &'p EvaluationPlan,
        record: &PreparedRecord,
        root: Slot,
    ) -> Result<HashMap<&'p str, BTreeSet<Slot>>, EngineError> {
        let mut demand: HashMap<&'p str, BTreeSet<Slot>> = HashMap::new();
        for name in plan.requested() {
            demand.entry(name.as_str()).or_default().insert(root);
        }

        let counts = record.assignment.counts();
        for name in plan.order().iter().rev() {
            let Some(slots) = demand.get(name.as_str()).cloned() else {
                continue;
            };
            let descriptor = self.registry.get(name)?;
            for slot in slots {
                if descriptor
                    .chemical_inputs()
                    .admits(slot_counts(record, slot))
                    .is_err()
                {
                    continue;
                }
                for (role, dependency) in descriptor.dependencies().iter() {
                    let targets: Vec<Slot> = match slot {
                        Slot::Mixture => (0..counts.get(role))
                            .map(|index| Slot::Occupant { role, index })
                            .collect(),
                        Slot::Occupant { .. } if role == Role::Solute => vec![slot],
                        Slot::Occupant { .. } => Vec::new(),
                    };
                    let Some(key) = plan
                        .order()
                        .iter()
                        .find(|n| **n == dependency.model)
                        .map(String::as_str)
                    else {
                        continue;
                    };
                    demand.entry(key).or_default().extend(targets);
                }
            }
        }
        Ok(demand)
    }

    fn evaluate_slot(
        &self,
        descriptor: &ModelDescriptor,
        record: &PreparedRecord,
        slot: Slot,
        cache: &ResultCache,
    ) -> Result<Outcome, EngineError> {
        if let Err(reason) = descriptor.chemical_inputs().admits(slot_counts(record, slot)) {
            return Ok(Outcome::NotApplicable { reason });
        }

        let inputs = match slot {
            Slot::Occupant { role, index } => {
                let Some(occupant) = record.assignment.occupant(role, index) else {
                    return Ok(Outcome::NotApplicable {
                        reason: format!("record has no {} {}", role, index + 1),
                    });
                };
                if let Some(estimate) = self.user_values.get(descriptor.name(), &occupant.smiles) {
                    return Ok(Outcome::Evaluated(
                        descriptor.result(estimate, USER_VALUE_NOTE),
                    ));
                }
                let Some(view) = occupant_inputs(occupant, descriptor, Role::Solute, slot, cache)
                else {
                    return Ok(Outcome::NoStructure);
                };
                ModelInputs {
                    propagated_notes: propagated_notes(descriptor, std::slice::from_ref(&view)),
                    solutes: vec![view],
                    ..ModelInputs::default()
                }
            }
            Slot::Mixture => {
                let mut inputs = ModelInputs {
                    mixture: true,
                    ..ModelInputs::default()
                };
                let mut notes = Vec::new();
                for role in Role::ALL {
                    let mut views = Vec::new();
                    for (index, occupant) in record.assignment.occupants(role).iter().enumerate() {
                        let occupant_slot = Slot::Occupant { role, index };
                        let Some(view) =
                            occupant_inputs(occupant, descriptor, role, occupant_slot, cache)
                        else {
                            return Ok(Outcome::NoStructure);
                        };
                        views.push(view);
                    }
                    let note = propagated_notes(descriptor, &views);
                    if !note.is_empty() {
                        notes.push(note);
                    }
                    match role {
                        Role::Solute => inputs.solutes = views,
                        Role::Solvent => inputs.solvents = views,
                        Role::Component => inputs.components = views,
                    }
                }
                inputs.propagated_notes = notes.join(", ");
                inputs
            }
        };

        descriptor
            .apply_model(&inputs)
            .map(Outcome::Evaluated)
            .map_err(|source| match source {
                ModelError::ValueShape { expected, actual } => EngineError::ValueShape {
                    model: descriptor.name().to_string(),
                    expected,
                    actual,
                },
                source => EngineError::Model {
                    model: descriptor.name().to_string(),
                    record: record.input.clone(),
                    source,
                },
            })
    }
}

/// Role counts seen by a model at `slot`; an occupant slot looks like a one-chemical record.
fn slot_counts(record: &PreparedRecord, slot: Slot) -> RoleCounts {
    match slot {
        Slot::Mixture => record.assignment.counts(),
        Slot::Occupant { .. } => RoleCounts::single(),
    }
}

/// Gathers the dependencies `descriptor` declares for `role` from the cache at `slot`.
///
/// Missing or not-applicable dependencies become the out-of-domain stand-in.
fn occupant_inputs<'a>(
    occupant: &'a Occupant,
    descriptor: &'a ModelDescriptor,
    role: Role,
    slot: Slot,
    cache: &'a ResultCache,
) -> Option<OccupantInputs<'a>> {
    let molecule = occupant.molecule.as_ref()?;
    let mut dependencies = DependencyValues::new();
    for dependency in descriptor.dependencies().for_role(role) {
        let (estimate, note) = match cache.get(&dependency.model, slot) {
            Some(outcome) => outcome.as_dependency(),
            None => (Estimate::not_applicable(), ""),
        };
        dependencies.insert(&dependency.model, estimate, note);
    }
    Some(OccupantInputs {
        smiles: &occupant.smiles,
        molecule,
        fraction: &occupant.fraction,
        dependencies,
    })
}

fn propagated_notes(descriptor: &ModelDescriptor, views: &[OccupantInputs<'_>]) -> String {
    let mut notes: Vec<String> = Vec::new();
    for view in views {
        for dependency in descriptor.dependencies().iter().map(|(_, dep)| dep) {
            let Ok(value) = view.dependencies.get(&dependency.model) else {
                continue;
            };
            let Some(rank) = value.estimate.uncertainty.and_then(|ul| ul.rank()) else {
                continue;
            };
            if rank > dependency.ceiling {
                let note = format!("{} UL {} exceeds {}", dependency.model, rank, dependency.ceiling);
                if !notes.contains(&note) {
                    notes.push(note);
                }
            }
        }
    }
    notes.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mixture::prepare;
    use crate::core::models::descriptor::{Bounds, Calculation, ChemicalInputs};
    use crate::core::models::result::{Estimates, UncertaintyLevel};
    use crate::core::molecule::BasicNormalizer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted(name: &str, calls: Arc<AtomicUsize>, rank: u8) -> ModelDescriptor {
        ModelDescriptor::builder(name).build(
            move |inputs: &ModelInputs<'_>| -> Result<Calculation, ModelError> {
                calls.fetch_add(1, Ordering::SeqCst);
                let atoms = inputs.solute()?.molecule.heavy_atoms().count() as f64;
                Ok(Calculation::new(
                    Estimate::new(atoms, UncertaintyLevel::Predicted(rank), 0.1),
                    "",
                ))
            },
        )
    }

    fn summing(name: &str, deps: &[&str]) -> ModelDescriptor {
        let deps: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
        let mut builder = ModelDescriptor::builder(name);
        for dep in &deps {
            builder = builder.depends_on(Role::Solute, dep.as_str(), 1);
        }
        builder.build(move |inputs: &ModelInputs<'_>| -> Result<Calculation, ModelError> {
            let solute = inputs.solute()?;
            let mut total = 0.0;
            for dep in &deps {
                total += solute.dependencies.value(dep)?;
            }
            Ok(Calculation::new(
                Estimate::new(total, UncertaintyLevel::Predicted(0), 0.0),
                inputs.propagated_notes.clone(),
            ))
        })
    }

    fn partition() -> ModelDescriptor {
        ModelDescriptor::builder("Ksa")
            .mixture(true)
            .chemical_inputs(ChemicalInputs {
                solute: Bounds::at_least(1),
                solvent: Bounds::new(1, 1),
                component: Bounds::none(),
                total: Bounds::at_least(2),
            })
            .depends_on(Role::Solute, "X", 3)
            .depends_on(Role::Solvent, "X", 3)
            .build(|inputs: &ModelInputs<'_>| -> Result<Calculation, ModelError> {
                let solvent = inputs.occupant(Role::Solvent, 0)?.dependencies.value("X")?;
                let list = inputs
                    .solutes
                    .iter()
                    .map(|s| {
                        s.dependencies
                            .value("X")
                            .map(|x| Estimate::new(x - solvent, UncertaintyLevel::Predicted(1), 0.0))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Calculation::new(Estimates::PerOccupant(list), ""))
            })
    }

    fn registry(calls: &Arc<AtomicUsize>) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(counted("X", calls.clone(), 2)).unwrap();
        registry.register(summing("P", &["X"])).unwrap();
        registry.register(summing("Q", &["X", "P"])).unwrap();
        registry.register(partition()).unwrap();
        registry
    }

    fn evaluate<'r>(
        registry: &'r ModelRegistry,
        user_values: &'r UserValues,
        models: &[&str],
        input: &str,
    ) -> RecordEvaluation<'r> {
        let plan = EvaluationPlan::new(registry, models.iter().map(|m| m.to_string()).collect())
            .unwrap();
        Evaluator::new(registry, user_values)
            .evaluate(&plan, prepare(input, &BasicNormalizer))
            .unwrap()
    }

    fn value(outcome: Option<&Outcome>) -> f64 {
        outcome.unwrap().result().unwrap().estimates.scalar().unwrap().value
    }

    #[test]
    fn shared_dependencies_are_computed_once_per_occupant() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let users = UserValues::new();

        let evaluation = evaluate(&registry, &users, &["P", "Q"], "CCO");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(value(evaluation.outcome("P")), 3.0);
        assert_eq!(value(evaluation.outcome("Q")), 6.0);

        calls.store(0, Ordering::SeqCst);
        evaluate(&registry, &users, &["Ksa"], "{solute}CCO{solute}CCCC{solvent}O");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dependency_ceiling_violations_are_propagated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let users = UserValues::new();

        let evaluation = evaluate(&registry, &users, &["P"], "CC");
        let result = evaluation.outcome("P").unwrap().result().unwrap();
        assert_eq!(result.note, "X UL 2 exceeds 1");
    }

    #[test]
    fn mixture_models_see_each_role_occupant() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let users = UserValues::new();

        let evaluation = evaluate(&registry, &users, &["Ksa"], "{solute}CCO{solute}CCCC{solvent}O");
        let result = evaluation.outcome("Ksa").unwrap().result().unwrap();
        let values: Vec<f64> = result.estimates.expand(2).iter().map(|e| e.value).collect();
        assert_eq!(values, vec![2.0, 3.0]);
    }

    #[test]
    fn cardinality_mismatch_is_not_applicable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let users = UserValues::new();

        let single = evaluate(&registry, &users, &["Ksa"], "CCO");
        assert!(matches!(
            single.outcome("Ksa"),
            Some(Outcome::NotApplicable { reason }) if reason.contains("solvent")
        ));

        let mixture = evaluate(&registry, &users, &["P"], "{solute}CCO{solvent}O");
        assert!(matches!(mixture.outcome("P"), Some(Outcome::NotApplicable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn user_values_override_at_occupant_slots() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let mut users = UserValues::new();
        users.insert("CCO", "X", 10.0, 0.5);

        let evaluation = evaluate(&registry, &users, &["X", "P"], "CCO");
        let x = evaluation.outcome("X").unwrap().result().unwrap();
        assert_eq!(x.note, USER_VALUE_NOTE);
        assert_eq!(
            x.estimates.scalar().unwrap().uncertainty,
            Some(UncertaintyLevel::User)
        );
        assert_eq!(value(evaluation.outcome("P")), 10.0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_structures_yield_no_structure_for_every_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&calls);
        let users = UserValues::new();

        let evaluation = evaluate(&registry, &users, &["P", "Ksa"], "C1CC");
        assert_eq!(evaluation.outcomes.len(), 2);
        assert!(evaluation
            .outcomes
            .iter()
            .all(|entry| entry.outcome == Outcome::NoStructure));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrong_estimate_count_is_fatal() {
        let mut registry = ModelRegistry::new();
        registry
            .register(
                ModelDescriptor::builder("bad")
                    .mixture(true)
                    .chemical_inputs(ChemicalInputs {
                        solute: Bounds::at_least(1),
                        solvent: Bounds::at_least(0),
                        component: Bounds::none(),
                        total: Bounds::at_least(1),
                    })
                    .build(|_: &ModelInputs<'_>| {
                        Ok(Calculation::new(Estimates::PerOccupant(Vec::new()), ""))
                    }),
            )
            .unwrap();
        let users = UserValues::new();
        let plan = EvaluationPlan::new(&registry, vec!["bad".into()]).unwrap();
        let err = Evaluator::new(&registry, &users)
            .evaluate(&plan, prepare("{solute}CCO{solvent}O", &BasicNormalizer))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::ValueShape { expected: 1, actual: 0, .. }
        ));
    }
}
