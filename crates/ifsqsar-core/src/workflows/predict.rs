use super::report::BatchTable;
use crate::core::mixture::prepare;
use crate::core::models::registry::ModelRegistry;
use crate::core::molecule::StructureNormalizer;
use crate::engine::config::PredictionConfig;
use crate::engine::error::EngineError;
use crate::engine::evaluator::{EvaluationPlan, Evaluator, RecordEvaluation};
use crate::engine::progress::{Progress, ProgressReporter};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct Prediction<'r> {
    pub evaluations: Vec<RecordEvaluation<'r>>,
    pub table: BatchTable,
}

/// Applies the configured models to every input record.
///
/// Records are independent: a structure failure blanks that record's outputs and the
/// batch continues. Only model invariant violations abort the run.
#[instrument(skip_all, name = "predict_workflow", fields(records = inputs.len()))]
pub fn run<'r>(
    inputs: &[String],
    registry: &'r ModelRegistry,
    normalizer: &dyn StructureNormalizer,
    config: &PredictionConfig,
    reporter: &ProgressReporter,
) -> Result<Prediction<'r>, EngineError> {
    let plan = plan(registry, config)?;
    let user_values = config.user_values.clone().normalized(normalizer);
    info!(
        requested = plan.requested().len(),
        resolved = plan.order().len(),
        user_values = user_values.len(),
        "Model dependencies resolved."
    );
    reporter.report(Progress::ModelsResolved {
        requested: plan.requested().len(),
        resolved: plan.order().len(),
    });

    reporter.start_batch(inputs.len());
    let evaluator = Evaluator::new(registry, &user_values);

    #[cfg(not(feature = "parallel"))]
    let iterator = inputs.iter().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = inputs.par_iter().enumerate();

    let evaluations = iterator
        .map(|(index, input)| -> Result<RecordEvaluation<'r>, EngineError> {
            let evaluation = evaluator.evaluate(&plan, prepare(input.trim(), normalizer))?;
            reporter.record_evaluated(index, input, evaluation.record.structure_ok());
            Ok(evaluation)
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    let summary = reporter.finish_batch();

    let table = BatchTable::from_evaluations(&evaluations, &config.output.values);
    info!(
        records = summary.records,
        failed = summary.failed_structures,
        columns = table.columns().len(),
        "Prediction complete."
    );
    Ok(Prediction { evaluations, table })
}

/// Evaluates one record without progress reporting.
#[instrument(skip_all, name = "predict_record", fields(input = input))]
pub fn run_record<'r>(
    input: &str,
    registry: &'r ModelRegistry,
    normalizer: &dyn StructureNormalizer,
    config: &PredictionConfig,
) -> Result<RecordEvaluation<'r>, EngineError> {
    let plan = plan(registry, config)?;
    let user_values = config.user_values.clone().normalized(normalizer);
    Evaluator::new(registry, &user_values).evaluate(&plan, prepare(input.trim(), normalizer))
}

fn plan(registry: &ModelRegistry, config: &PredictionConfig) -> Result<EvaluationPlan, EngineError> {
    let models = registry.expand(&config.models)?;
    EvaluationPlan::new(registry, models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::result::Outcome;
    use crate::core::molecule::BasicNormalizer;
    use crate::engine::config::{OutputFormat, PredictionConfigBuilder, ValueKind};
    use crate::engine::progress::BatchSummary;
    use crate::workflows::report::Cell;
    use std::sync::Mutex;

    fn config(models: &[&str]) -> PredictionConfig {
        PredictionConfigBuilder::new()
            .models(models.iter().copied())
            .format(OutputFormat::Rows)
            .values(vec![ValueKind::InputSmiles, ValueKind::Prediction])
            .build()
            .unwrap()
    }

    #[test]
    fn batch_reports_each_record_and_the_failed_structures() {
        let registry = ModelRegistry::builtin().unwrap();
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        let inputs = vec!["CCO".to_string(), "O".to_string(), "C1CC".to_string()];

        let prediction = run(&inputs, &registry, &BasicNormalizer, &config(&["logKow"]), &reporter)
            .unwrap();
        drop(reporter);
        let events = events.into_inner().unwrap();

        assert!(matches!(
            events.first(),
            Some(Progress::ModelsResolved { requested: 1, .. })
        ));
        assert_eq!(events[1], Progress::BatchStarted { records: 3 });
        let mut records: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Progress::RecordEvaluated {
                    index,
                    input,
                    structure_ok,
                } => Some((*index, input.as_str(), *structure_ok)),
                _ => None,
            })
            .collect();
        records.sort();
        assert_eq!(records, vec![(0, "CCO", true), (1, "O", true), (2, "C1CC", false)]);
        assert_eq!(
            events.last(),
            Some(&Progress::BatchFinished(BatchSummary {
                records: 3,
                failed_structures: 1
            }))
        );

        assert_eq!(prediction.table.len(), 3);
        assert_eq!(
            prediction.table.get(2, "logKow qsarpred").map(Cell::render),
            Some(String::new())
        );
    }

    #[test]
    fn unknown_models_fail_before_evaluation() {
        let registry = ModelRegistry::builtin().unwrap();
        let err = run(
            &["CCO".to_string()],
            &registry,
            &BasicNormalizer,
            &config(&["logKxy"]),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Registry { .. }));
    }

    #[test]
    fn single_record_uses_stored_reference_values() {
        let registry = ModelRegistry::builtin().unwrap();
        let evaluation = run_record(" O ", &registry, &BasicNormalizer, &config(&["Vf"])).unwrap();
        let Some(Outcome::Evaluated(result)) = evaluation.outcome("Vf") else {
            panic!("Vf should evaluate for water");
        };
        assert_eq!(result.estimates.scalar().unwrap().value, 0.1673);
        assert_eq!(evaluation.record.input, "O");
    }
}
