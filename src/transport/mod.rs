//! Transport layer for talking to the resolvers under test.
//!
//! Queries go out over UDP; a truncated UDP answer is retried over TCP.
//! The [`Lookup`] trait is the seam the rest of the crate resolves through,
//! so sessions can be driven by something other than the network.

pub mod tcp;
pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;

use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::answer::AnswerSet;
use crate::dns::{DnsQuery, RCODE_NOERROR, RCODE_NXDOMAIN};
use crate::error::LookupError;

/// Transport protocol identifier for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// Resolves the IN A records of a name at one specific endpoint.
pub trait Lookup: Send + Sync {
    fn lookup<'a>(
        &'a self,
        endpoint: SocketAddr,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AnswerSet, LookupError>>;
}

/// Network DNS client.
///
/// Every exchange, including a TCP fallback, is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct DnsClient {
    timeout: Duration,
}

impl DnsClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve(&self, endpoint: SocketAddr, name: &str) -> Result<AnswerSet, LookupError> {
        let id: u16 = rand::random();
        let query = DnsQuery::address(id, name).ok_or_else(|| LookupError::InvalidName {
            name: name.to_string(),
        })?;
        let bytes = query.to_bytes();
        let start_time = Instant::now();

        let (protocol, response) = match udp::exchange(endpoint, &bytes, id, self.timeout).await? {
            udp::UdpReply::Response(response) => (Protocol::Udp, response),
            udp::UdpReply::Truncated => {
                let response = tcp::exchange(endpoint, &bytes, id, self.timeout).await?;
                (Protocol::Tcp, response)
            }
        };

        let rcode = response.rcode();
        if rcode != RCODE_NOERROR && rcode != RCODE_NXDOMAIN {
            return Err(LookupError::Rcode { endpoint, rcode });
        }

        let answers = response.addresses();
        tracing::debug!(
            protocol = protocol.as_str(),
            %endpoint,
            qname = name,
            rcode,
            answers = answers.len(),
            elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0,
            "resolved"
        );

        Ok(answers)
    }
}

impl Lookup for DnsClient {
    fn lookup<'a>(
        &'a self,
        endpoint: SocketAddr,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AnswerSet, LookupError>> {
        Box::pin(self.resolve(endpoint, name))
    }
}

/// Run `lookup` up to `attempts` times, returning the first answer or the
/// last error. Names that cannot be encoded are not retried.
pub async fn lookup_with_attempts(
    lookup: &dyn Lookup,
    endpoint: SocketAddr,
    name: &str,
    attempts: usize,
) -> Result<AnswerSet, LookupError> {
    let mut attempt = 1;

    loop {
        match lookup.lookup(endpoint, name).await {
            Ok(answers) => return Ok(answers),
            Err(err @ LookupError::InvalidName { .. }) => return Err(err),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                tracing::debug!(
                    %endpoint,
                    qname = name,
                    attempt,
                    error = %err,
                    "lookup failed, retrying"
                );
                attempt += 1;
            }
        }
    }
}
