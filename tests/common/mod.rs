//! Shared fixtures: an in-memory resolver network and loopback DNS servers.

#![allow(dead_code)]

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, UdpSocket};

use dnsdiverge::dns::{DnsQuery, DnsResponse, FLAG_TC};
use dnsdiverge::transport::MAX_DNS_PACKET_SIZE;
use dnsdiverge::transport::tcp::{read_dns_message, write_dns_message};
use dnsdiverge::{AnswerSet, Lookup, LookupError};

pub fn set(addrs: &[&str]) -> AnswerSet {
    addrs.iter().map(|a| a.parse::<IpAddr>().unwrap()).collect()
}

pub fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

/// Random probe labels are single labels; real hostnames have a dot.
pub fn is_probe(name: &str) -> bool {
    !name.contains('.')
}

type Behaviour = Arc<dyn Fn(&str) -> Result<AnswerSet, LookupError> + Send + Sync>;

/// A set of pretend resolvers, each answering by a closure.
///
/// Endpoints without a behaviour time out.
#[derive(Default)]
pub struct FakeNetwork {
    behaviours: HashMap<SocketAddr, Behaviour>,
    /// Extra scheduler yields before a probe at this endpoint completes.
    slow_probes: HashMap<SocketAddr, usize>,
    calls: Mutex<Vec<(SocketAddr, String)>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint<F>(mut self, endpoint: SocketAddr, behaviour: F) -> Self
    where
        F: Fn(&str) -> Result<AnswerSet, LookupError> + Send + Sync + 'static,
    {
        self.behaviours.insert(endpoint, Arc::new(behaviour));
        self
    }

    /// Make every probe at `endpoint` yield `yields` times before answering.
    pub fn slow_probes(mut self, endpoint: SocketAddr, yields: usize) -> Self {
        self.slow_probes.insert(endpoint, yields);
        self
    }

    /// Every query asked of the network, in the order it was asked.
    pub fn calls(&self) -> Vec<(SocketAddr, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Hostnames (probes excluded) asked of `endpoint`, in order.
    pub fn jobs_at(&self, endpoint: SocketAddr) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, name)| *e == endpoint && !is_probe(name))
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn probes_at(&self, endpoint: SocketAddr) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, name)| *e == endpoint && is_probe(name))
            .count()
    }
}

impl Lookup for FakeNetwork {
    fn lookup<'a>(
        &'a self,
        endpoint: SocketAddr,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AnswerSet, LookupError>> {
        self.calls.lock().unwrap().push((endpoint, name.to_string()));
        let answer = match self.behaviours.get(&endpoint) {
            Some(behaviour) => (**behaviour)(name),
            None => Err(LookupError::Timeout { endpoint }),
        };
        let yields = match self.slow_probes.get(&endpoint) {
            Some(&yields) if is_probe(name) => yields,
            _ => 0,
        };
        Box::pin(async move {
            for _ in 0..=yields {
                tokio::task::yield_now().await;
            }
            answer
        })
    }
}

/// A loopback UDP DNS server answering every A query with `answer(name)`.
pub async fn spawn_udp_server<F>(answer: F) -> SocketAddr
where
    F: Fn(&str) -> Vec<Ipv4Addr> + Send + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let local = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                continue;
            };
            let Some(query) = DnsQuery::parse(&buf[..len]) else {
                continue;
            };
            let response = DnsResponse::answer(&query, &answer(query.domain.as_str()));
            let _ = socket.send_to(&response.to_bytes(), src).await;
        }
    });

    local
}

/// A loopback server that always truncates over UDP and answers in full
/// over TCP on the same port.
///
/// The UDP reply carries 40 filler records with TC set, minus its last
/// `cut` bytes.
pub async fn spawn_truncating_server(addrs: Vec<Ipv4Addr>, cut: usize) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let local = socket.local_addr().unwrap();
    let listener = TcpListener::bind(local).await.unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                continue;
            };
            let Some(query) = DnsQuery::parse(&buf[..len]) else {
                continue;
            };
            let filler: Vec<Ipv4Addr> = (0..40).map(|i| Ipv4Addr::new(203, 0, 113, i)).collect();
            let mut response = DnsResponse::answer(&query, &filler);
            response.flags |= FLAG_TC;
            let mut bytes = response.to_bytes();
            bytes.truncate(bytes.len() - cut);
            let _ = socket.send_to(&bytes, src).await;
        }
    });

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                continue;
            };
            let addrs = addrs.clone();
            tokio::spawn(async move {
                let Ok(message) = read_dns_message(&mut stream).await else {
                    return;
                };
                let Some(query) = DnsQuery::parse(&message) else {
                    return;
                };
                let response = DnsResponse::answer(&query, &addrs);
                let _ = write_dns_message(&mut stream, &response.to_bytes()).await;
            });
        }
    });

    local
}

/// A loopback server that answers every query with `rcode`.
pub async fn spawn_rcode_server(rcode: u8) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let local = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                continue;
            };
            let Some(query) = DnsQuery::parse(&buf[..len]) else {
                continue;
            };
            let response = DnsResponse::error(&query, rcode);
            let _ = socket.send_to(&response.to_bytes(), src).await;
        }
    });

    local
}

/// A bound UDP socket that never replies. Keep it alive for the test.
pub async fn silent_endpoint() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let local = socket.local_addr().unwrap();
    (socket, local)
}
