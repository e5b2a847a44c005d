//! Progress reporting for long-running ingestion batches.
//!
//! The CLI uses `IndicatifReporter` for user-visible progress bars.
//! Library callers can use `NoopReporter` or provide their own implementation.

use indicatif::{ProgressBar, ProgressStyle};

/// Trait for reporting progress of batch operations.
pub trait ProgressReporter: Send + Sync {
    /// Begin a new task with an optional total count.
    fn start(&self, task: &str, total: Option<u64>);

    /// One archive finished (successfully or not).
    fn archive_done(&self, done: u64, total: u64, identifier: &str);

    /// Mark the current task as finished.
    fn finish(&self);

    /// Display an informational message.
    fn message(&self, msg: &str);
}

/// No-op reporter for library callers that don't need progress output.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn start(&self, _task: &str, _total: Option<u64>) {}
    fn archive_done(&self, _done: u64, _total: u64, _identifier: &str) {}
    fn finish(&self) {}
    fn message(&self, _msg: &str) {}
}

/// Reporter backed by `indicatif` progress bars for CLI use.
#[derive(Debug)]
pub struct IndicatifReporter {
    bar: ProgressBar,
}

impl Default for IndicatifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatifReporter {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn start(&self, task: &str, total: Option<u64>) {
        if let Some(total) = total {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("=> "),
            );
        } else {
            self.bar.set_length(0);
            self.bar.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg} {pos} items").unwrap(),
            );
        }
        self.bar.set_message(task.to_string());
        self.bar.reset();
    }

    fn archive_done(&self, done: u64, _total: u64, identifier: &str) {
        self.bar.set_position(done);
        self.bar.set_message(identifier.to_string());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn message(&self, msg: &str) {
        self.bar.println(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_reporter_is_silent() {
        let reporter = NoopReporter;
        reporter.start("test", Some(100));
        reporter.archive_done(1, 100, "a.hip");
        reporter.message("hello");
        reporter.finish();
    }

    #[test]
    fn indicatif_reporter_lifecycle() {
        let reporter = IndicatifReporter::new();
        reporter.start("ingesting", Some(10));
        reporter.archive_done(5, 10, "fire.hip");
        reporter.archive_done(10, 10, "ocean.hip");
        reporter.finish();
    }
}
