use std::sync::atomic::{AtomicUsize, Ordering};

/// Record counts of one finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub records: usize,
    /// Records whose structure could not be normalized; their model outputs are blank.
    pub failed_structures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    ModelsResolved { requested: usize, resolved: usize },
    BatchStarted { records: usize },
    /// Emitted once per record, in completion order when records run in parallel.
    RecordEvaluated {
        index: usize,
        input: String,
        structure_ok: bool,
    },
    BatchFinished(BatchSummary),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards batch events to an optional callback and tallies evaluated records.
///
/// Shared by reference across the workers of one batch.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
    evaluated: AtomicUsize,
    failed: AtomicUsize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
            ..Self::default()
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Resets the tally and announces a batch of `records` inputs.
    pub fn start_batch(&self, records: usize) {
        self.evaluated.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.report(Progress::BatchStarted { records });
    }

    pub fn record_evaluated(&self, index: usize, input: &str, structure_ok: bool) {
        self.evaluated.fetch_add(1, Ordering::Relaxed);
        if !structure_ok {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if self.callback.is_some() {
            self.report(Progress::RecordEvaluated {
                index,
                input: input.to_string(),
                structure_ok,
            });
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            records: self.evaluated.load(Ordering::Relaxed),
            failed_structures: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Announces the end of the batch and returns its tally.
    pub fn finish_batch(&self) -> BatchSummary {
        let summary = self.summary();
        self.report(Progress::BatchFinished(summary));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn batch_events_carry_record_outcomes() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        reporter.start_batch(2);
        reporter.record_evaluated(0, "CCO", true);
        reporter.record_evaluated(1, "C1CC", false);
        let summary = reporter.finish_batch();
        drop(reporter);

        assert_eq!(
            summary,
            BatchSummary {
                records: 2,
                failed_structures: 1
            }
        );
        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                Progress::BatchStarted { records: 2 },
                Progress::RecordEvaluated {
                    index: 0,
                    input: "CCO".into(),
                    structure_ok: true
                },
                Progress::RecordEvaluated {
                    index: 1,
                    input: "C1CC".into(),
                    structure_ok: false
                },
                Progress::BatchFinished(summary),
            ]
        );
    }

    #[test]
    fn tally_is_shared_across_threads_and_reset_per_batch() {
        let reporter = ProgressReporter::new();
        reporter.start_batch(40);
        thread::scope(|scope| {
            for worker in 0..4 {
                let reporter = &reporter;
                scope.spawn(move || {
                    for i in 0..10 {
                        reporter.record_evaluated(worker * 10 + i, "O", i % 5 != 0);
                    }
                });
            }
        });
        assert_eq!(
            reporter.summary(),
            BatchSummary {
                records: 40,
                failed_structures: 8
            }
        );

        reporter.start_batch(1);
        assert_eq!(reporter.summary(), BatchSummary::default());
    }

    #[test]
    fn reporter_without_callback_still_counts() {
        let reporter = ProgressReporter::new();
        reporter.record_evaluated(0, "", false);
        assert_eq!(reporter.finish_batch().failed_structures, 1);
    }
}
