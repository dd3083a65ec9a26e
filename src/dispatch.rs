//! Job dispatch.
//!
//! Every hostname goes to every provider, landing on one endpoint of that
//! provider picked uniformly at random. Queues are bounded, so a slow
//! endpoint pushes back on the producer instead of piling up work.

use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One hostname queued to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionJob {
    pub hostname: Arc<str>,
}

struct Queue {
    endpoint: SocketAddr,
    sender: mpsc::Sender<ResolutionJob>,
}

struct Route {
    provider: Arc<str>,
    queues: Vec<Queue>,
}

/// Routes hostnames onto per-endpoint queues.
pub struct Dispatcher<R> {
    routes: Vec<Route>,
    rng: R,
}

impl<R: Rng> Dispatcher<R> {
    pub fn new(rng: R) -> Self {
        Self {
            routes: Vec::new(),
            rng,
        }
    }

    /// Register a provider and the queues of its usable endpoints.
    ///
    /// A provider with no queues is still registered; everything sent to
    /// it is reported back as unroutable.
    pub fn add_provider(
        &mut self,
        provider: Arc<str>,
        queues: Vec<(SocketAddr, mpsc::Sender<ResolutionJob>)>,
    ) {
        self.routes.push(Route {
            provider,
            queues: queues
                .into_iter()
                .map(|(endpoint, sender)| Queue { endpoint, sender })
                .collect(),
        });
    }

    /// Queue `hostname` once per provider, waiting while the chosen queue
    /// is full.
    ///
    /// Returns the providers that could not take the job because none of
    /// their endpoints is accepting work.
    pub async fn dispatch(&mut self, hostname: &str) -> Vec<Arc<str>> {
        let hostname: Arc<str> = Arc::from(hostname);
        let mut unroutable = Vec::new();

        for route in &mut self.routes {
            let mut job = ResolutionJob {
                hostname: hostname.clone(),
            };

            loop {
                if route.queues.is_empty() {
                    unroutable.push(route.provider.clone());
                    break;
                }

                let index = self.rng.random_range(0..route.queues.len());
                match route.queues[index].sender.send(job).await {
                    Ok(()) => break,
                    Err(mpsc::error::SendError(returned)) => {
                        // The worker is gone; stop routing to it and pick again.
                        let queue = route.queues.swap_remove(index);
                        tracing::warn!(
                            provider = %route.provider,
                            endpoint = %queue.endpoint,
                            "endpoint queue closed, rerouting"
                        );
                        job = returned;
                    }
                }
            }
        }

        unroutable
    }

    /// Close every queue. Workers finish what is queued and exit.
    pub fn close(self) {
        drop(self.routes);
    }
}
