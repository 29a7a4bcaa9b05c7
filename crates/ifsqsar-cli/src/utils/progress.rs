use ifsqsar::engine::progress::{BatchSummary, Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

const BAR_TEMPLATE: &str =
    "{prefix:>12} [{bar:40.cyan/blue}] {pos}/{len} records {msg} ({elapsed_precise})";

/// Record counter drawn on stderr while a batch is evaluated.
///
/// The bar advances once per evaluated record and its message shows how many
/// records so far had a structure that could not be normalized.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    failed: Arc<AtomicUsize>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target)
            .with_style(Self::bar_style())
            .with_prefix("Resolving");
        Self {
            pb: Arc::new(Mutex::new(pb)),
            failed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Records seen so far whose structure failed.
    pub fn failed_structures(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();
        let failed = self.failed.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::ModelsResolved {
                    requested,
                    resolved,
                } => {
                    pb.set_message(format!("{} models ({} requested)", resolved, requested));
                }
                Progress::BatchStarted { records } => {
                    failed.store(0, Ordering::Relaxed);
                    pb.reset();
                    pb.set_length(records as u64);
                    pb.set_prefix("Evaluating");
                    pb.set_message(failed_message(0));
                }
                Progress::RecordEvaluated {
                    structure_ok, ..
                } => {
                    if !structure_ok {
                        let count = failed.fetch_add(1, Ordering::Relaxed) + 1;
                        pb.set_message(failed_message(count));
                    }
                    pb.inc(1);
                }
                Progress::BatchFinished(summary) => {
                    pb.set_prefix("Done");
                    pb.finish_with_message(summary_message(summary));
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn failed_message(failed: usize) -> String {
    match failed {
        0 => String::new(),
        1 => "(1 failed structure)".to_string(),
        n => format!("({} failed structures)", n),
    }
}

fn summary_message(summary: BatchSummary) -> String {
    if summary.failed_structures == 0 {
        format!("✓ all {} structures normalized", summary.records)
    } else {
        format!(
            "✓ {} of {} structures failed",
            summary.failed_structures, summary.records
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn record(index: usize, structure_ok: bool) -> Progress {
        Progress::RecordEvaluated {
            index,
            input: "C".into(),
            structure_ok,
        }
    }

    #[test]
    fn handler_starts_with_an_empty_batch() {
        let handler = CliProgressHandler::hidden();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert_eq!(pb.prefix(), "Resolving");
        assert_eq!(handler.failed_structures(), 0);
    }

    #[test]
    fn bar_counts_records_and_failed_structures() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::ModelsResolved {
            requested: 1,
            resolved: 4,
        });
        assert_eq!(handler.pb.lock().unwrap().message(), "4 models (1 requested)");

        callback(Progress::BatchStarted { records: 3 });
        callback(record(0, true));
        callback(record(1, false));
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(3));
            assert_eq!(pb.position(), 2);
            assert_eq!(pb.message(), "(1 failed structure)");
        }
        callback(record(2, false));
        assert_eq!(handler.failed_structures(), 2);
        assert_eq!(
            handler.pb.lock().unwrap().message(),
            "(2 failed structures)"
        );

        callback(Progress::BatchFinished(BatchSummary {
            records: 3,
            failed_structures: 2,
        }));
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ 2 of 3 structures failed");
    }

    #[test]
    fn a_new_batch_resets_the_failed_count() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        callback(Progress::BatchStarted { records: 1 });
        callback(record(0, false));
        callback(Progress::BatchStarted { records: 2 });

        assert_eq!(handler.failed_structures(), 0);
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 0);
        assert_eq!(pb.message(), "");
    }

    #[test]
    fn callback_counts_records_from_many_threads() {
        let handler = CliProgressHandler::hidden();
        let callback = Arc::new(handler.get_callback());
        callback(Progress::BatchStarted { records: 20 });

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let callback = callback.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        callback(record(worker * 5 + i, i != 0));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(handler.pb.lock().unwrap().position(), 20);
        assert_eq!(handler.failed_structures(), 4);
    }

    #[test]
    fn summary_reads_cleanly_without_failures() {
        assert_eq!(
            summary_message(BatchSummary {
                records: 5,
                failed_structures: 0
            }),
            "✓ all 5 structures normalized"
        );
    }
}
