//! Session orchestration.
//!
//! A session owns one task per endpoint. Each task learns its endpoint's
//! baseline, reports it back, and then works through the endpoint's queue.
//! The orchestrator waits for every baseline, dispatches hostnames to the
//! endpoints that came up, closes every queue and joins every task.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::baseline::{Baseline, BaselineProber};
use crate::config::SessionConfig;
use crate::dispatch::{Dispatcher, ResolutionJob};
use crate::error::{ConfigError, ProbeError};
use crate::registry::Provider;
use crate::report::{EndpointHealth, Report};
use crate::sink::ResultSink;
use crate::state::{EndpointState, Lifecycle};
use crate::transport::Lookup;
use crate::worker::{Worker, WorkerReport};

/// A configured probing run over a fixed set of providers.
pub struct Session {
    providers: Vec<Provider>,
    config: SessionConfig,
    lookup: Arc<dyn Lookup>,
    sink: Arc<dyn ResultSink>,
}

impl Session {
    pub fn new(
        providers: Vec<Provider>,
        config: SessionConfig,
        lookup: Arc<dyn Lookup>,
        sink: Arc<dyn ResultSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if providers.is_empty() {
            return Err(ConfigError::EmptyProviderSet);
        }
        if let Some(empty) = providers.iter().find(|p| p.endpoints.is_empty()) {
            return Err(ConfigError::EmptyProvider(empty.label.to_string()));
        }

        Ok(Self {
            providers,
            config,
            lookup,
            sink,
        })
    }

    pub fn endpoint_count(&self) -> usize {
        self.providers.iter().map(|p| p.endpoints.len()).sum()
    }

    /// Probe every endpoint, resolve every hostname at one endpoint of
    /// every provider, and report.
    pub async fn run<S: AsRef<str>>(self, hostnames: &[S]) -> Report {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut tasks = JoinSet::new();
        let mut slots = Vec::with_capacity(self.endpoint_count());

        for provider in &self.providers {
            for &endpoint in &provider.endpoints {
                let (job_tx, job_rx) = mpsc::channel(self.config.queue_depth);
                let (ready_tx, ready_rx) = oneshot::channel();

                let task = EndpointTask {
                    provider: provider.label.clone(),
                    endpoint,
                    lookup: self.lookup.clone(),
                    sink: self.sink.clone(),
                    config: self.config.clone(),
                    rng: StdRng::seed_from_u64(rng.random()),
                };
                let index = slots.len();
                tasks.spawn(async move { (index, task.run(ready_tx, job_rx).await) });

                slots.push(Slot {
                    provider: provider.label.clone(),
                    endpoint,
                    ready: Some(ready_rx),
                    queue: Some(job_tx),
                    health: EndpointHealth::Lost,
                    outcome: None,
                });
            }
        }

        // Every baseline is in before the first job goes out.
        for slot in &mut slots {
            let Some(ready) = slot.ready.take() else {
                continue;
            };
            match ready.await {
                Ok(Ok(baseline)) => slot.health = EndpointHealth::Established { baseline },
                Ok(Err(error)) => {
                    slot.queue = None;
                    slot.health = EndpointHealth::ProbeAborted { error };
                }
                Err(_) => {
                    tracing::error!(
                        provider = %slot.provider,
                        endpoint = %slot.endpoint,
                        "endpoint task ended before reporting a baseline"
                    );
                    slot.queue = None;
                }
            }
        }

        let ready = slots.iter().filter(|s| s.queue.is_some()).count();
        tracing::info!(
            endpoints = slots.len(),
            ready,
            aborted = slots.len() - ready,
            "baselines complete"
        );

        let mut dispatcher = Dispatcher::new(rng);
        for provider in &self.providers {
            let queues = slots
                .iter_mut()
                .filter(|s| s.provider == provider.label)
                .filter_map(|s| Some((s.endpoint, s.queue.take()?)))
                .collect();
            dispatcher.add_provider(provider.label.clone(), queues);
        }

        let mut report = Report::new(hostnames);
        for hostname in hostnames {
            let hostname = hostname.as_ref();
            for provider in dispatcher.dispatch(hostname).await {
                tracing::warn!(hostname, %provider, "no endpoint available");
                report.add_unroutable(hostname, provider);
            }
        }
        dispatcher.close();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index].outcome = Some(outcome),
                Err(err) => tracing::error!(error = %err, "endpoint task failed"),
            }
        }

        for slot in slots {
            let (state, worker) = slot
                .outcome
                .unwrap_or((EndpointState::Aborted, WorkerReport::default()));
            report.add_endpoint(slot.provider, slot.endpoint, state, slot.health, worker);
        }

        report
    }
}

/// Orchestrator-side bookkeeping for one endpoint.
struct Slot {
    provider: Arc<str>,
    endpoint: SocketAddr,
    ready: Option<oneshot::Receiver<Result<Baseline, ProbeError>>>,
    queue: Option<mpsc::Sender<ResolutionJob>>,
    health: EndpointHealth,
    outcome: Option<(EndpointState, WorkerReport)>,
}

/// The life of one endpoint: probe, then serve its queue.
struct EndpointTask {
    provider: Arc<str>,
    endpoint: SocketAddr,
    lookup: Arc<dyn Lookup>,
    sink: Arc<dyn ResultSink>,
    config: SessionConfig,
    rng: StdRng,
}

impl EndpointTask {
    async fn run(
        mut self,
        ready: oneshot::Sender<Result<Baseline, ProbeError>>,
        jobs: mpsc::Receiver<ResolutionJob>,
    ) -> (EndpointState, WorkerReport) {
        let mut lifecycle = Lifecycle::new(&*self.provider, self.endpoint);
        lifecycle.advance(EndpointState::BaselineProbing);

        let prober = BaselineProber::new(
            &*self.lookup,
            self.config.probe_count,
            self.config.attempts,
            self.config.baseline_policy,
        );
        let baseline = match prober.probe(self.endpoint, &mut self.rng).await {
            Ok(baseline) => baseline,
            Err(error) => {
                tracing::warn!(
                    provider = %self.provider,
                    endpoint = %self.endpoint,
                    unreachable = error.is_unreachable(),
                    %error,
                    "baseline probe failed, endpoint aborted"
                );
                lifecycle.advance(EndpointState::Aborted);
                let _ = ready.send(Err(error));
                return (lifecycle.state(), WorkerReport::default());
            }
        };

        tracing::info!(
            provider = %self.provider,
            endpoint = %self.endpoint,
            baseline = %baseline,
            "baseline established"
        );
        lifecycle.advance(EndpointState::Ready);
        let _ = ready.send(Ok(baseline.clone()));

        let worker = Worker::new(
            self.provider,
            self.endpoint,
            baseline,
            self.lookup,
            self.sink,
            self.config.attempts,
        );
        let report = worker.run(jobs).await;
        lifecycle.advance(EndpointState::Terminated);

        (lifecycle.state(), report)
    }
}
