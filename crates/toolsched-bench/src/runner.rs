//! Benchmark runner
//!
//! A fixed-size pool of workers pulls items from a shared queue until it is
//! exhausted. Each worker completes one item end to end (both trials
//! concurrently, then judging, then handing the item to the aggregator)
//! before taking the next, so the in-flight ceiling equals the pool size,
//! not the dataset size. A single failed item never stops the batch.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;

use toolsched_core::agent::AgentService;
use toolsched_core::logging::Logger;

use crate::dataset::Question;
use crate::judge::Judge;
use crate::report::{AggregateSummary, Aggregator, BenchmarkItem, TrialRecord};

/// Default worker-pool size
pub const DEFAULT_CONCURRENCY: usize = 12;

/// Seam for executing one trial of one item
#[async_trait]
pub trait TrialRunner: Send + Sync {
    /// Run the agent once over the prompt, with scheduling on or off
    async fn run_trial(&self, prompt: &str, scheduling: bool) -> Result<String, String>;
}

/// Production trial runner: one in-process agent request per trial
pub struct ServiceTrialRunner {
    service: AgentService,
}

impl ServiceTrialRunner {
    pub fn new(service: AgentService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TrialRunner for ServiceTrialRunner {
    async fn run_trial(&self, prompt: &str, scheduling: bool) -> Result<String, String> {
        // The service maps its own failures to textual answers
        Ok(self.service.answer(prompt, scheduling).await)
    }
}

/// Drives the dataset through both arms and aggregates the results
pub struct BenchmarkRunner {
    runner: Arc<dyn TrialRunner>,
    judge: Arc<dyn Judge>,
    concurrency: usize,
    deadline: Option<Duration>,
    logger: Arc<dyn Logger>,
}

impl BenchmarkRunner {
    /// Create a runner with the default pool size and no deadline
    pub fn new(runner: Arc<dyn TrialRunner>, judge: Arc<dyn Judge>, logger: Arc<dyn Logger>) -> Self {
        Self {
            runner,
            judge,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
            logger,
        }
    }

    /// Set the worker-pool size
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set a hard deadline for the whole run. Items not finished when it
    /// expires are abandoned; persisted results stay intact.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Run the whole dataset, persisting to `output_path` after every item
    pub async fn run(&self, questions: Vec<Question>, output_path: PathBuf) -> AggregateSummary {
        let total = questions.len();
        let queue: Arc<Mutex<VecDeque<Question>>> = Arc::new(Mutex::new(questions.into()));

        let (tx, aggregator) =
            Aggregator::spawn(output_path, total, Arc::clone(&self.logger));

        let mut workers = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let runner = Arc::clone(&self.runner);
            let judge = Arc::clone(&self.judge);
            let logger = Arc::clone(&self.logger);
            workers.push(tokio::spawn(async move {
                worker_loop(queue, tx, runner, judge, logger).await;
            }));
        }
        drop(tx);

        match self.deadline {
            Some(limit) => {
                let drained = tokio::time::timeout(limit, async {
                    for handle in workers.iter_mut() {
                        let _ = handle.await;
                    }
                })
                .await;
                if drained.is_err() {
                    self.logger.warn(
                        "[BenchmarkRunner] Deadline reached; abandoning remaining items",
                    );
                    for handle in &workers {
                        handle.abort();
                    }
                }
            }
            None => {
                for handle in workers.iter_mut() {
                    let _ = handle.await;
                }
            }
        }

        match aggregator.await {
            Ok(summary) => summary,
            Err(e) => {
                self.logger
                    .error(&format!("[BenchmarkRunner] Aggregator lost: {}", e));
                AggregateSummary::default()
            }
        }
    }
}

async fn worker_loop(
    queue: Arc<Mutex<VecDeque<Question>>>,
    tx: mpsc::Sender<BenchmarkItem>,
    runner: Arc<dyn TrialRunner>,
    judge: Arc<dyn Judge>,
    logger: Arc<dyn Logger>,
) {
    loop {
        let question = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        let Some(question) = question else { break };

        let item = process_item(&question, &runner, &judge, &logger).await;
        if tx.send(item).await.is_err() {
            break;
        }
    }
}

async fn process_item(
    question: &Question,
    runner: &Arc<dyn TrialRunner>,
    judge: &Arc<dyn Judge>,
    logger: &Arc<dyn Logger>,
) -> BenchmarkItem {
    // Both arms run over the identical, link-augmented prompt
    let prompt = question.enhanced_prompt();

    let (scheduled, unscheduled) = tokio::join!(
        run_one(runner, judge, &prompt, true, question, logger),
        run_one(runner, judge, &prompt, false, question, logger),
    );

    BenchmarkItem {
        question: question.prompt.clone(),
        scheduled,
        unscheduled,
    }
}

async fn run_one(
    runner: &Arc<dyn TrialRunner>,
    judge: &Arc<dyn Judge>,
    prompt: &str,
    scheduling: bool,
    question: &Question,
    logger: &Arc<dyn Logger>,
) -> TrialRecord {
    let start = Instant::now();
    match runner.run_trial(prompt, scheduling).await {
        Ok(answer) => {
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            let verdict = judge
                .validate(&answer, &question.answer, &question.prompt)
                .await;
            TrialRecord {
                answer,
                is_correct: verdict.is_correct,
                judge_reason: verdict.reason,
                latency_ms,
            }
        }
        Err(e) => {
            // Catch-log-continue: the batch keeps running
            logger.error(&format!(
                "[BenchmarkRunner] Trial failed ({}scheduler): {}",
                if scheduling { "" } else { "no " },
                e
            ));
            TrialRecord {
                answer: "ERROR".to_string(),
                is_correct: false,
                judge_reason: "Error".to_string(),
                latency_ms: 0.0,
            }
        }
    }
}
