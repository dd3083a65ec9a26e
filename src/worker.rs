//! Resolver worker.
//!
//! One worker per endpoint. It drains the endpoint's queue one hostname at
//! a time, compares each answer against the endpoint's baseline and hands
//! anything interesting to the sink. A failed lookup is recorded against
//! the job and the worker moves on.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::answer::{AnswerSet, equals};
use crate::baseline::Baseline;
use crate::dispatch::ResolutionJob;
use crate::error::LookupError;
use crate::sink::{ResolutionResult, ResultSink};
use crate::stats::EndpointStats;
use crate::transport::{Lookup, lookup_with_attempts};

/// How an answer compares to the endpoint's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No addresses at all.
    Empty,
    /// Exactly the sinkhole the endpoint returns for nonexistent names.
    MatchesBaseline,
    /// A real answer worth reporting.
    Divergent,
}

pub fn classify(answers: &AnswerSet, baseline: &Baseline) -> Verdict {
    if answers.is_empty() {
        Verdict::Empty
    } else if equals(answers, baseline) {
        Verdict::MatchesBaseline
    } else {
        Verdict::Divergent
    }
}

/// A job whose lookup failed on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub hostname: Arc<str>,
    pub provider: Arc<str>,
    pub endpoint: SocketAddr,
    pub error: LookupError,
}

/// Everything a worker did, returned when its queue is closed and drained.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub stats: EndpointStats,
    pub divergent: Vec<ResolutionResult>,
    pub failures: Vec<JobFailure>,
}

pub struct Worker {
    provider: Arc<str>,
    endpoint: SocketAddr,
    baseline: Baseline,
    lookup: Arc<dyn Lookup>,
    sink: Arc<dyn ResultSink>,
    attempts: usize,
}

impl Worker {
    pub fn new(
        provider: Arc<str>,
        endpoint: SocketAddr,
        baseline: Baseline,
        lookup: Arc<dyn Lookup>,
        sink: Arc<dyn ResultSink>,
        attempts: usize,
    ) -> Self {
        Self {
            provider,
            endpoint,
            baseline,
            lookup,
            sink,
            attempts,
        }
    }

    /// Process jobs until the queue is closed and empty.
    pub async fn run(self, mut jobs: mpsc::Receiver<ResolutionJob>) -> WorkerReport {
        let mut report = WorkerReport::default();

        while let Some(job) = jobs.recv().await {
            self.process(job, &mut report).await;
        }

        tracing::debug!(
            provider = %self.provider,
            endpoint = %self.endpoint,
            jobs = report.stats.jobs,
            forwarded = report.stats.forwarded,
            failed = report.stats.failed,
            "queue drained"
        );

        report
    }

    async fn process(&self, job: ResolutionJob, report: &mut WorkerReport) {
        let start_time = Instant::now();
        let result =
            lookup_with_attempts(&*self.lookup, self.endpoint, &job.hostname, self.attempts).await;
        let elapsed = start_time.elapsed();

        let answers = match result {
            Ok(answers) => answers,
            Err(error) => {
                tracing::warn!(
                    provider = %self.provider,
                    endpoint = %self.endpoint,
                    hostname = %job.hostname,
                    %error,
                    "lookup failed"
                );
                report.stats.record_failed(elapsed);
                report.failures.push(JobFailure {
                    hostname: job.hostname,
                    provider: self.provider.clone(),
                    endpoint: self.endpoint,
                    error,
                });
                return;
            }
        };

        match classify(&answers, &self.baseline) {
            Verdict::Empty => report.stats.record_empty(elapsed),
            Verdict::MatchesBaseline => {
                tracing::debug!(
                    endpoint = %self.endpoint,
                    hostname = %job.hostname,
                    "answer matches sinkhole"
                );
                report.stats.record_matched_baseline(elapsed);
            }
            Verdict::Divergent => {
                let result = ResolutionResult {
                    hostname: job.hostname,
                    provider: self.provider.clone(),
                    endpoint: self.endpoint,
                    answers,
                };
                self.sink.record(&result);
                report.stats.record_forwarded(elapsed);
                report.divergent.push(result);
            }
        }
    }
}
