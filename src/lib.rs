//! dnsdiverge - find hostnames whose DNS answers differ between resolver
//! providers, once each resolver's sinkhole answers are filtered out.

pub mod answer;
pub mod baseline;
pub mod config;
pub mod dispatch;
pub mod dns;
pub mod error;
pub mod registry;
pub mod report;
pub mod session;
pub mod sink;
pub mod state;
pub mod stats;
pub mod transport;
pub mod worker;

pub use answer::{AnswerSet, equals};
pub use config::SessionConfig;
pub use error::{ConfigError, Error, LookupError, ProbeError};
pub use registry::{Provider, ProviderRegistry};
pub use report::Report;
pub use session::Session;
pub use sink::{LogSink, MemorySink, ResolutionResult, ResultSink};
pub use transport::{DnsClient, Lookup};
