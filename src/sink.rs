//! Where divergent results go.
//!
//! Workers call into the sink concurrently, so implementations serialize
//! their own writes.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use crate::answer::AnswerSet;

/// A hostname that resolved at an endpoint to something other than
/// nothing and other than the endpoint's sinkhole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub hostname: Arc<str>,
    pub provider: Arc<str>,
    pub endpoint: SocketAddr,
    pub answers: AnswerSet,
}

pub trait ResultSink: Send + Sync {
    fn record(&self, result: &ResolutionResult);
}

/// Emits each result as a log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn record(&self, result: &ResolutionResult) {
        tracing::info!(
            hostname = %result.hostname,
            provider = %result.provider,
            endpoint = %result.endpoint,
            answers = %result.answers,
            "result"
        );
    }
}

/// Keeps results in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    results: Mutex<Vec<ResolutionResult>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ResolutionResult> {
        let Ok(results) = self.results.lock() else {
            return Vec::new();
        };
        results.clone()
    }

    pub fn len(&self) -> usize {
        self.results.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn record(&self, result: &ResolutionResult) {
        let Ok(mut results) = self.results.lock() else {
            return;
        };
        results.push(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(hostname: &str) -> ResolutionResult {
        ResolutionResult {
            hostname: hostname.into(),
            provider: "honest".into(),
            endpoint: "8.8.8.8:53".parse().unwrap(),
            answers: ["93.184.216.34".parse::<std::net::IpAddr>().unwrap()]
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.record(&result("a.example"));
        sink.record(&result("b.example"));

        let results = sink.results();
        assert_eq!(results.len(), 2);
        assert_eq!(&*results[0].hostname, "a.example");
        assert_eq!(&*results[1].hostname, "b.example");
    }

    #[test]
    fn memory_sink_is_shareable_across_threads() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        sink.record(&result(&format!("h{i}-{j}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.len(), 100);
    }
}
