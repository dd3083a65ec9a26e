//! The end-of-session report.

use rustc_hash::FxHashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::baseline::Baseline;
use crate::error::ProbeError;
use crate::sink::ResolutionResult;
use crate::state::EndpointState;
use crate::stats::EndpointStats;
use crate::worker::{JobFailure, WorkerReport};

/// Whether an endpoint ever got to take jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointHealth {
    /// Baseline learned; the endpoint took jobs.
    Established { baseline: Baseline },
    /// Baseline probing failed; no jobs were routed here.
    ProbeAborted { error: ProbeError },
    /// The endpoint's task died before reporting a baseline.
    Lost,
}

impl EndpointHealth {
    pub fn is_established(&self) -> bool {
        matches!(self, EndpointHealth::Established { .. })
    }
}

#[derive(Debug, Clone)]
pub struct EndpointReport {
    pub provider: Arc<str>,
    pub endpoint: SocketAddr,
    pub state: EndpointState,
    pub health: EndpointHealth,
    pub stats: EndpointStats,
}

/// Everything learned about one input hostname.
#[derive(Debug, Clone, Default)]
pub struct HostnameReport {
    pub hostname: Arc<str>,
    pub divergent: Vec<ResolutionResult>,
    pub failures: Vec<JobFailure>,
    /// Providers that had no endpoint left to ask.
    pub unroutable: Vec<Arc<str>>,
}

impl HostnameReport {
    pub fn has_divergence(&self) -> bool {
        !self.divergent.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    pub hostnames: Vec<HostnameReport>,
    pub endpoints: Vec<EndpointReport>,
    index: FxHashMap<Arc<str>, usize>,
}

impl Report {
    /// An empty report with one entry per distinct hostname, in input order.
    pub fn new<S: AsRef<str>>(hostnames: &[S]) -> Self {
        let mut report = Self::default();
        for hostname in hostnames {
            report.entry(hostname.as_ref());
        }
        report
    }

    fn entry(&mut self, hostname: &str) -> &mut HostnameReport {
        let index = match self.index.get(hostname) {
            Some(&index) => index,
            None => {
                let hostname: Arc<str> = Arc::from(hostname);
                self.hostnames.push(HostnameReport {
                    hostname: hostname.clone(),
                    ..Default::default()
                });
                self.index.insert(hostname, self.hostnames.len() - 1);
                self.hostnames.len() - 1
            }
        };
        &mut self.hostnames[index]
    }

    pub fn add_unroutable(&mut self, hostname: &str, provider: Arc<str>) {
        self.entry(hostname).unroutable.push(provider);
    }

    /// Record an endpoint and fold its worker's results into the
    /// per-hostname entries.
    pub fn add_endpoint(
        &mut self,
        provider: Arc<str>,
        endpoint: SocketAddr,
        state: EndpointState,
        health: EndpointHealth,
        worker: WorkerReport,
    ) {
        for result in worker.divergent {
            let hostname = result.hostname.clone();
            self.entry(&hostname).divergent.push(result);
        }
        for failure in worker.failures {
            let hostname = failure.hostname.clone();
            self.entry(&hostname).failures.push(failure);
        }
        self.endpoints.push(EndpointReport {
            provider,
            endpoint,
            state,
            health,
            stats: worker.stats,
        });
    }

    pub fn hostname(&self, hostname: &str) -> Option<&HostnameReport> {
        self.index.get(hostname).map(|&i| &self.hostnames[i])
    }

    /// The same address may serve more than one provider, each with its
    /// own worker, so endpoints are looked up per provider.
    pub fn endpoint(&self, provider: &str, endpoint: SocketAddr) -> Option<&EndpointReport> {
        self.endpoints
            .iter()
            .find(|e| &*e.provider == provider && e.endpoint == endpoint)
    }

    /// Hostnames with at least one divergent answer.
    pub fn divergent(&self) -> impl Iterator<Item = &HostnameReport> {
        self.hostnames.iter().filter(|h| h.has_divergence())
    }

    pub fn degraded_endpoints(&self) -> impl Iterator<Item = &EndpointReport> {
        self.endpoints.iter().filter(|e| !e.health.is_established())
    }

    pub fn total_forwarded(&self) -> u64 {
        self.endpoints.iter().map(|e| e.stats.forwarded).sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hostnames:")?;
        for host in &self.hostnames {
            if !host.has_divergence() && host.failures.is_empty() && host.unroutable.is_empty() {
                writeln!(f, "  {} no divergence", host.hostname)?;
                continue;
            }
            writeln!(f, "  {}", host.hostname)?;
            for result in &host.divergent {
                writeln!(
                    f,
                    "    {} {} {}",
                    result.provider, result.endpoint, result.answers
                )?;
            }
            for failure in &host.failures {
                writeln!(
                    f,
                    "    {} {} FAILED {}",
                    failure.provider, failure.endpoint, failure.error
                )?;
            }
            for provider in &host.unroutable {
                writeln!(f, "    {} UNROUTABLE", provider)?;
            }
        }

        writeln!(f, "endpoints:")?;
        for endpoint in &self.endpoints {
            write!(
                f,
                "  {} {} {}",
                endpoint.provider, endpoint.endpoint, endpoint.state
            )?;
            match &endpoint.health {
                EndpointHealth::Established { baseline } => writeln!(
                    f,
                    " baseline={} jobs={} forwarded={} suppressed={} failed={} avg={:.2}ms",
                    baseline,
                    endpoint.stats.jobs,
                    endpoint.stats.forwarded,
                    endpoint.stats.suppressed(),
                    endpoint.stats.failed,
                    endpoint.stats.avg_lookup_ms()
                )?,
                EndpointHealth::ProbeAborted { error } => writeln!(f, " {}", error)?,
                EndpointHealth::Lost => writeln!(f, " task lost")?,
            }
        }

        Ok(())
    }
}
