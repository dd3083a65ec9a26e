//! UDP transport for DNS queries.
//!
//! Each exchange uses its own ephemeral socket connected to the endpoint,
//! so the kernel filters out datagrams from anyone else. Replies are still
//! matched on the 16-bit query ID; strays are ignored.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::dns::{DnsResponse, FLAG_QR, FLAG_TC, HEADER_LEN};
use crate::error::LookupError;

use super::MAX_DNS_PACKET_SIZE;

/// What came back over UDP.
#[derive(Debug)]
pub enum UdpReply {
    Response(DnsResponse),
    /// The TC bit was set. The body may be cut mid-record, so it is not
    /// parsed; the caller retries over TCP.
    Truncated,
}

/// Send `query` to `endpoint` and wait for the response with ID `id`.
pub async fn exchange(
    endpoint: SocketAddr,
    query: &[u8],
    id: u16,
    timeout: Duration,
) -> Result<UdpReply, LookupError> {
    tokio::time::timeout(timeout, send_and_receive(endpoint, query, id))
        .await
        .map_err(|_| LookupError::Timeout { endpoint })?
}

async fn send_and_receive(
    endpoint: SocketAddr,
    query: &[u8],
    id: u16,
) -> Result<UdpReply, LookupError> {
    let local: SocketAddr = if endpoint.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| LookupError::io(endpoint, &e))?;
    socket
        .connect(endpoint)
        .await
        .map_err(|e| LookupError::io(endpoint, &e))?;
    socket
        .send(query)
        .await
        .map_err(|e| LookupError::io(endpoint, &e))?;

    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let len = socket
            .recv(&mut buf)
            .await
            .map_err(|e| LookupError::io(endpoint, &e))?;

        if len < HEADER_LEN {
            continue;
        }

        let response_id = u16::from_be_bytes([buf[0], buf[1]]);
        if response_id != id {
            tracing::debug!(
                %endpoint,
                expected = id,
                got = response_id,
                "ignoring stray UDP response"
            );
            continue;
        }

        let flags = u16::from_be_bytes([buf[2], buf[3]]);
        if flags & FLAG_QR == 0 {
            continue;
        }
        if flags & FLAG_TC != 0 {
            return Ok(UdpReply::Truncated);
        }

        let response =
            DnsResponse::parse(&buf[..len]).ok_or(LookupError::Malformed { endpoint })?;
        return Ok(UdpReply::Response(response));
    }
}
