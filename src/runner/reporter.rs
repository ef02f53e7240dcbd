//! Progress reporting for crawl runs.
//!
//! A thread-safe accumulator of run counters plus an error-tag histogram.
//! All writes go through one lock; log lines have no ordering guarantee
//! relative to counter updates.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::error_handling::ErrorType;

#[derive(Debug)]
struct ReporterState {
    processed: usize,
    errors: usize,
    skipped: usize,
    retries: usize,
    last_update: Instant,
    last_processed: usize,
    error_types: HashMap<ErrorType, usize>,
}

/// Thread-safe progress reporter for user-facing run summaries.
pub struct ProgressReporter {
    start_time: Instant,
    total_urls: usize,
    verbose: bool,
    state: Mutex<ReporterState>,
}

impl ProgressReporter {
    pub fn new(total_urls: usize, verbose: bool) -> Self {
        Self {
            start_time: Instant::now(),
            total_urls,
            verbose,
            state: Mutex::new(ReporterState {
                processed: 0,
                errors: 0,
                skipped: 0,
                retries: 0,
                last_update: Instant::now(),
                last_processed: 0,
                error_types: HashMap::new(),
            }),
        }
    }

    /// Updates the rolling progress line.
    pub fn update_progress(&self, processed: usize, errors: usize, skipped: usize) {
        let mut state = self.state.lock().expect("reporter lock poisoned");

        let now = Instant::now();
        let elapsed = self.start_time.elapsed();
        let since_last = now.duration_since(state.last_update).as_secs_f64();
        let instant_rate = if since_last > 0.0 {
            (processed.saturating_sub(state.last_processed)) as f64 / since_last
        } else {
            0.0
        };

        state.processed = processed;
        state.errors = errors;
        state.skipped = skipped;
        state.last_update = now;
        state.last_processed = processed;

        let avg_rate = if elapsed.as_secs_f64() > 0.0 {
            processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let percent = if self.total_urls > 0 {
            processed as f64 / self.total_urls as f64 * 100.0
        } else {
            0.0
        };

        print!(
            "\rProgress: {}/{} ({:.1}%) | Errors: {} | Skipped: {} | Avg: {:.1}/s | Current: {:.1}/s | Elapsed: {}s",
            processed,
            self.total_urls,
            percent,
            errors,
            skipped,
            avg_rate,
            instant_rate,
            elapsed.as_secs()
        );
    }

    /// Logs an error line (verbose mode only).
    pub fn log_error(&self, message: &str) {
        if self.verbose {
            println!("\nError: {message}");
        }
    }

    /// Logs an informational line (verbose mode only).
    pub fn log_info(&self, message: &str) {
        if self.verbose {
            println!("\n{message}");
        }
    }

    /// Logs a success line (verbose mode only).
    pub fn log_success(&self, message: &str) {
        if self.verbose {
            println!("\n{message}");
        }
    }

    /// Records one occurrence of an error tag.
    pub fn record_error(&self, error_type: ErrorType) {
        let mut state = self.state.lock().expect("reporter lock poisoned");
        *state.error_types.entry(error_type).or_insert(0) += 1;
    }

    /// Counts one retry attempt.
    pub fn increment_retries(&self) {
        let mut state = self.state.lock().expect("reporter lock poisoned");
        state.retries += 1;
    }

    /// Returns the retry count recorded so far.
    pub fn retries(&self) -> usize {
        self.state.lock().expect("reporter lock poisoned").retries
    }

    /// Returns a copy of the error-tag histogram.
    pub fn error_breakdown(&self) -> HashMap<ErrorType, usize> {
        self.state
            .lock()
            .expect("reporter lock poisoned")
            .error_types
            .clone()
    }

    /// Prints the final totals, elapsed time, average rate, and error
    /// breakdown.
    pub fn finish(&self) {
        let state = self.state.lock().expect("reporter lock poisoned");
        let elapsed = self.start_time.elapsed();

        println!(
            "\nCompleted: {} processed, {} errors, {} skipped, {} retries in {}s",
            state.processed,
            state.errors,
            state.skipped,
            state.retries,
            elapsed.as_secs()
        );

        if state.processed > 0 && elapsed.as_secs_f64() > 0.0 {
            println!(
                "Average rate: {:.2} URLs/second",
                state.processed as f64 / elapsed.as_secs_f64()
            );
        }

        if state.errors > 0 && !state.error_types.is_empty() {
            println!("Error breakdown:");
            let mut entries: Vec<_> = state.error_types.iter().collect();
            entries.sort_by_key(|(tag, _)| tag.as_str());
            for (tag, count) in entries {
                println!("  - {}: {}", tag.as_str(), count);
            }
        }
    }
}
