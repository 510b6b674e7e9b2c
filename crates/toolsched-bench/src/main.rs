//! Benchmark harness entry point
//!
//! Drives a dataset of question/answer pairs through the agent twice per
//! item (scheduling on/off), judges both answers, and persists incremental
//! results. `--summarize` replays a finished result file instead.

mod dataset;
mod judge;
mod report;
mod runner;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use toolsched_core::agent::AgentService;
use toolsched_core::config::AgentConfig;
use toolsched_core::logging::{ConsoleLogger, Logger, SharedLogger};

use judge::OpenRouterJudge;
use runner::{BenchmarkRunner, ServiceTrialRunner, DEFAULT_CONCURRENCY};

#[derive(Debug)]
struct Args {
    dataset: PathBuf,
    out_dir: PathBuf,
    concurrency: usize,
    deadline_secs: Option<u64>,
    summarize: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut dataset = PathBuf::from("dataset.json");
    let mut out_dir = PathBuf::from("benchmark-results");
    let mut concurrency = DEFAULT_CONCURRENCY;
    let mut deadline_secs: Option<u64> = None;
    let mut summarize: Option<PathBuf> = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--dataset" => {
                let val = it.next().ok_or("--dataset requires a path")?;
                dataset = PathBuf::from(val);
            }
            "--out-dir" => {
                let val = it.next().ok_or("--out-dir requires a path")?;
                out_dir = PathBuf::from(val);
            }
            "--concurrency" => {
                let val = it.next().ok_or("--concurrency requires a number")?;
                concurrency = val
                    .parse::<usize>()
                    .map_err(|e| format!("parse --concurrency: {}", e))?;
            }
            "--deadline-secs" => {
                let val = it.next().ok_or("--deadline-secs requires a number")?;
                deadline_secs = Some(
                    val.parse::<u64>()
                        .map_err(|e| format!("parse --deadline-secs: {}", e))?,
                );
            }
            "--summarize" => {
                let val = it.next().ok_or("--summarize requires a result file")?;
                summarize = Some(PathBuf::from(val));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => return Err(format!("Unknown arg: {} (use --help)", other)),
        }
    }

    Ok(Args {
        dataset,
        out_dir,
        concurrency,
        deadline_secs,
        summarize,
    })
}

fn print_help() {
    println!(
        "toolsched-bench - A/B benchmark for the tool-scheduling middleware

USAGE:
    toolsched-bench [OPTIONS]

OPTIONS:
    --dataset <path>        Dataset JSON file (default: dataset.json)
    --out-dir <dir>         Result directory (default: benchmark-results)
    --concurrency <n>       Worker-pool size (default: {})
    --deadline-secs <n>     Hard deadline for the whole run
    --summarize <file>      Summarize a finished result file and exit
    -h, --help              Show this help",
        DEFAULT_CONCURRENCY
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args()?;

    if let Some(path) = args.summarize {
        report::summarize(path)?;
        return Ok(());
    }

    let logger: SharedLogger = Arc::new(ConsoleLogger::with_prefix("[Bench]"));

    let config = AgentConfig::load();
    config.log_warnings(logger.as_ref());

    let api_key = std::env::var("OPENROUTER_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        logger.warn("OPENROUTER_API_KEY is not set; the judge will mark every trial incorrect");
    }

    let questions = dataset::load_dataset(&args.dataset)?;
    let output_path = report::next_output_path(&args.out_dir)?;

    println!(
        "Starting benchmark with concurrency {}. Output file: {}",
        args.concurrency,
        output_path.display()
    );

    let service = AgentService::from_config(&config, Arc::clone(&logger));
    let trial_runner = Arc::new(ServiceTrialRunner::new(service));
    let judge = Arc::new(OpenRouterJudge::new(api_key, Arc::clone(&logger)));

    let mut runner = BenchmarkRunner::new(trial_runner, judge, Arc::clone(&logger))
        .with_concurrency(args.concurrency);
    if let Some(secs) = args.deadline_secs {
        runner = runner.with_deadline(Duration::from_secs(secs));
    }

    let summary = runner.run(questions, output_path.clone()).await;

    println!(
        "\nBenchmark finished: {} item(s) -> {}",
        summary.processed,
        output_path.display()
    );
    if summary.processed > 0 {
        report::summarize(&output_path)?;
    }

    Ok(())
}
