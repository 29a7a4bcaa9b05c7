use super::load_registry;
use crate::cli::PredictArgs;
use crate::config::{InputSource, PartialPredictConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ifsqsar::{
    core::io::delimited::BatchInput,
    core::molecule::BasicNormalizer,
    engine::progress::ProgressReporter,
    engine::resolver::validate_registry,
    workflows,
};
use std::io::Write;
use tracing::{info, warn};

pub fn run(args: PredictArgs, show_progress: bool) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialPredictConfig::from_file(path)?,
        None => PartialPredictConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let run = partial_config.merge_with_cli(&args)?;

    let registry = load_registry(run.reference_data.as_deref())?;
    validate_registry(&registry)?;

    let (records, batch) = match &run.source {
        InputSource::Records(records) => (records.clone(), None),
        InputSource::File { path, options } => {
            info!("Reading batch input from {:?}", path);
            let batch =
                BatchInput::read_from_path(path, options).map_err(|source| CliError::InputTable {
                    path: path.clone(),
                    source,
                })?;
            (batch.smiles(), Some(batch))
        }
    };

    let progress_handler = if show_progress {
        CliProgressHandler::new()
    } else {
        CliProgressHandler::hidden()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core prediction workflow...");
    let prediction = workflows::predict::run(
        &records,
        &registry,
        &BasicNormalizer,
        &run.prediction,
        &reporter,
    )?;
    let failed = progress_handler.failed_structures();
    if failed > 0 {
        warn!(
            failed,
            records = records.len(),
            "Some structures could not be normalized; their model outputs are blank."
        );
    }
    let text =
        workflows::report::render(&prediction.table, &run.prediction.output, batch.as_ref())?;

    match &run.output_path {
        Some(path) => {
            std::fs::write(path, text).map_err(|source| CliError::OutputWrite {
                path: path.clone(),
                source,
            })?;
            info!(
                records = prediction.table.len(),
                "Results written to {:?}", path
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
