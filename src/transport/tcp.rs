//! TCP transport for DNS queries.
//!
//! Used when a UDP answer comes back truncated. TCP DNS messages are
//! prefixed with a 2-byte big-endian length; one connection per exchange.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::dns::DnsResponse;
use crate::error::LookupError;

/// Send `query` to `endpoint` over TCP and read the response.
pub async fn exchange(
    endpoint: SocketAddr,
    query: &[u8],
    id: u16,
    timeout: Duration,
) -> Result<DnsResponse, LookupError> {
    let message = tokio::time::timeout(timeout, async {
        let mut stream = TcpStream::connect(endpoint).await?;
        write_dns_message(&mut stream, query).await?;
        read_dns_message(&mut stream).await
    })
    .await
    .map_err(|_| LookupError::Timeout { endpoint })?
    .map_err(|e| LookupError::io(endpoint, &e))?;

    let response = DnsResponse::parse(&message).ok_or(LookupError::Malformed { endpoint })?;
    if response.id != id || !response.is_response() {
        return Err(LookupError::Malformed { endpoint });
    }

    Ok(response)
}

/// Write one length-prefixed DNS message.
pub async fn write_dns_message<S: AsyncWrite + Unpin>(
    stream: &mut S,
    message: &[u8],
) -> io::Result<()> {
    let len = u16::try_from(message.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "DNS message too long"))?;

    let mut framed = Vec::with_capacity(2 + message.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(message);
    stream.write_all(&framed).await
}

/// Read one length-prefixed DNS message, returning it without the prefix.
pub async fn read_dns_message<S: AsyncRead + Unpin>(stream: &mut S) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let msg_len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; msg_len];
    stream.read_exact(&mut buf).await?;

    Ok(buf)
}
