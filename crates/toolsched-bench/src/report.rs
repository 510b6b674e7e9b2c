//! Result aggregation and persistence
//!
//! A single-owner aggregator task receives completed items over a channel
//! and is the only writer of the running counters and the output artifact.
//! The full accumulated result list is rewritten after every item, so a
//! partially completed (or aborted) run always leaves a consistent file
//! behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use toolsched_core::logging::Logger;

/// Reporting errors (artifact naming, summarize mode)
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One trial's outcome under one scheduling mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecord {
    pub answer: String,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    #[serde(rename = "judgeReason")]
    pub judge_reason: String,
    #[serde(rename = "latencyMs")]
    pub latency_ms: f64,
}

/// One completed dataset item: both arms plus the original question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkItem {
    pub question: String,
    #[serde(rename = "scheduledResult")]
    pub scheduled: TrialRecord,
    #[serde(rename = "unscheduledResult")]
    pub unscheduled: TrialRecord,
}

/// Running counters over the completed items
#[derive(Debug, Clone, Default)]
pub struct AggregateSummary {
    pub processed: usize,
    pub scheduled_correct: usize,
    pub unscheduled_correct: usize,
    pub scheduled_total_ms: f64,
    pub unscheduled_total_ms: f64,
}

impl AggregateSummary {
    fn absorb(&mut self, item: &BenchmarkItem) {
        self.processed += 1;
        if item.scheduled.is_correct {
            self.scheduled_correct += 1;
        }
        if item.unscheduled.is_correct {
            self.unscheduled_correct += 1;
        }
        self.scheduled_total_ms += item.scheduled.latency_ms;
        self.unscheduled_total_ms += item.unscheduled.latency_ms;
    }

    /// Accuracy of the scheduled arm, percent
    pub fn scheduled_accuracy(&self) -> f64 {
        percentage(self.scheduled_correct, self.processed)
    }

    /// Accuracy of the unscheduled arm, percent
    pub fn unscheduled_accuracy(&self) -> f64 {
        percentage(self.unscheduled_correct, self.processed)
    }

    /// Mean latency of the scheduled arm, milliseconds
    pub fn scheduled_mean_ms(&self) -> f64 {
        mean(self.scheduled_total_ms, self.processed)
    }

    /// Mean latency of the unscheduled arm, milliseconds
    pub fn unscheduled_mean_ms(&self) -> f64 {
        mean(self.unscheduled_total_ms, self.processed)
    }

    /// Latency delta of scheduling, percent of the unscheduled mean
    pub fn latency_delta_percent(&self) -> f64 {
        let unscheduled = self.unscheduled_mean_ms();
        if unscheduled <= 0.0 {
            return 0.0;
        }
        (self.scheduled_mean_ms() - unscheduled).abs() / unscheduled * 100.0
    }

    /// Whether scheduling made the run faster on average
    pub fn scheduler_is_faster(&self) -> bool {
        self.scheduled_mean_ms() < self.unscheduled_mean_ms()
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Cadence of the live console summary
const PROGRESS_EVERY: usize = 5;

/// Single-owner aggregator task
pub struct Aggregator;

impl Aggregator {
    /// Spawn the aggregator. Returns the sender workers feed and the handle
    /// resolving to the final summary once every sender is dropped.
    pub fn spawn(
        output_path: PathBuf,
        total_items: usize,
        logger: Arc<dyn Logger>,
    ) -> (mpsc::Sender<BenchmarkItem>, JoinHandle<AggregateSummary>) {
        let (tx, mut rx) = mpsc::channel::<BenchmarkItem>(total_items.max(1));

        let handle = tokio::spawn(async move {
            let mut results: Vec<BenchmarkItem> = Vec::new();
            let mut summary = AggregateSummary::default();

            while let Some(item) = rx.recv().await {
                summary.absorb(&item);
                results.push(item);

                if let Err(e) = write_results(&output_path, &results) {
                    logger.error(&format!("[Aggregator] Flush failed: {}", e));
                }

                if summary.processed % PROGRESS_EVERY == 0 || summary.processed == total_items {
                    print_progress(&summary, total_items);
                }
            }

            summary
        });

        (tx, handle)
    }
}

fn write_results(path: &Path, results: &[BenchmarkItem]) -> Result<(), ReportError> {
    // Overwrite-on-each-flush: the artifact always holds the full list
    let serialized = serde_json::to_string_pretty(results)?;
    std::fs::write(path, serialized)?;
    Ok(())
}

fn print_progress(summary: &AggregateSummary, total_items: usize) {
    let faster_or_slower = if summary.scheduler_is_faster() {
        "faster"
    } else {
        "slower"
    };
    let diff = (summary.scheduled_mean_ms() - summary.unscheduled_mean_ms()).abs();

    println!("=== LIVE BENCHMARK METRICS ===");
    println!("Processed: {}/{}\n", summary.processed, total_items);
    println!("Accuracy with scheduler: {:.2}%", summary.scheduled_accuracy());
    println!(
        "Accuracy without scheduler: {:.2}%\n",
        summary.unscheduled_accuracy()
    );
    println!("Avg Time (Scheduler): {:.2}ms", summary.scheduled_mean_ms());
    println!(
        "Avg Time (No Scheduler): {:.2}ms",
        summary.unscheduled_mean_ms()
    );
    println!(
        "Difference: {:.2}ms ({:.2}% {} with scheduler)",
        diff,
        summary.latency_delta_percent(),
        faster_or_slower
    );
}

/// Choose the next artifact path: a zero-padded sequence counter plus a
/// timestamp, so runs never collide
pub fn next_output_path(dir: impl AsRef<Path>) -> Result<PathBuf, ReportError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let existing = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .ends_with(".json")
        })
        .count();

    let timestamp = chrono::Local::now().format("%H-%M-%S-%m-%d-%Y");
    Ok(dir.join(format!("{:05}-{}.json", existing, timestamp)))
}

/// Print the summary block and the compact correctness tuple list for a
/// finished result file
pub fn summarize(path: impl AsRef<Path>) -> Result<(), ReportError> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let items: Vec<BenchmarkItem> = serde_json::from_str(&raw)?;

    if items.is_empty() {
        println!("Result file contains no items.");
        return Ok(());
    }

    let mut summary = AggregateSummary::default();
    for item in &items {
        summary.absorb(item);
    }

    println!("\n--- Summary for {} ---", path.as_ref().display());
    println!("Total Questions: {}", summary.processed);
    println!("\nAccuracy:");
    println!(
        "  Scheduler:    {:.2}% ({}/{})",
        summary.scheduled_accuracy(),
        summary.scheduled_correct,
        summary.processed
    );
    println!(
        "  No Scheduler: {:.2}% ({}/{})",
        summary.unscheduled_accuracy(),
        summary.unscheduled_correct,
        summary.processed
    );
    println!("\nAverage Time:");
    println!("  Scheduler:    {:.2}ms", summary.scheduled_mean_ms());
    println!("  No Scheduler: {:.2}ms", summary.unscheduled_mean_ms());
    println!(
        "  Difference:   {:.2}% {} with scheduler",
        summary.latency_delta_percent(),
        if summary.scheduler_is_faster() {
            "faster"
        } else {
            "slower"
        }
    );

    let tuples = items
        .iter()
        .map(|item| {
            format!(
                "({},{})",
                item.scheduled.is_correct, item.unscheduled.is_correct
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    println!("\n({})", tuples);

    Ok(())
}
