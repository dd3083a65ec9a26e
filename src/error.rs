//! Error types.
//!
//! Configuration errors are fatal and surface before any probing starts.
//! Everything that happens on the wire is attributed to an endpoint and
//! ends up in the session report instead of tearing the session down.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Top level error for the binary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Rejected configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no providers selected")]
    EmptyProviderSet,

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider '{0}' has no endpoints")]
    EmptyProvider(String),

    #[error("provider '{label}': malformed endpoint '{value}'")]
    MalformedEndpoint { label: String, value: String },

    #[error("malformed provider override '{0}' (expected LABEL=ADDR[,ADDR...])")]
    MalformedOverride(String),

    #[error("{0} must be greater than zero")]
    InvalidKnob(&'static str),

    #[error("no hostnames given")]
    NoHostnames,
}

/// A single DNS exchange that did not produce an answer set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{endpoint} did not answer in time")]
    Timeout { endpoint: SocketAddr },

    #[error("{endpoint}: {message}")]
    Io {
        endpoint: SocketAddr,
        kind: io::ErrorKind,
        message: String,
    },

    #[error("{endpoint} sent a malformed response")]
    Malformed { endpoint: SocketAddr },

    #[error("{endpoint} answered with rcode {rcode}")]
    Rcode { endpoint: SocketAddr, rcode: u8 },

    #[error("'{name}' is not a valid DNS name")]
    InvalidName { name: String },
}

impl LookupError {
    pub fn io(endpoint: SocketAddr, err: &io::Error) -> Self {
        Self::Io {
            endpoint,
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// True when the endpoint could not be talked to at all, as opposed to
    /// answering with something we did not like.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Io { kind, .. } => matches!(
                kind,
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::HostUnreachable
                    | io::ErrorKind::NetworkUnreachable
                    | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}

/// Sinkhole detection failed for an endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("baseline probe for '{label}' failed: {source}")]
pub struct ProbeError {
    pub label: String,
    #[source]
    pub source: LookupError,
}

impl ProbeError {
    pub fn is_unreachable(&self) -> bool {
        self.source.is_unreachable()
    }
}
