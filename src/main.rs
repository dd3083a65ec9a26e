use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use dnsdiverge::baseline::BaselinePolicy;
use dnsdiverge::registry::DEFAULT_SELECTION;
use dnsdiverge::{ConfigError, DnsClient, Error, LogSink, ProviderRegistry, Session, SessionConfig};

#[derive(Parser)]
#[command(name = "dnsdiverge")]
#[command(about = "Find hostnames whose DNS answers diverge between resolver providers", long_about = None)]
struct Args {
    /// Hostnames to resolve
    hostnames: Vec<String>,

    /// Read more hostnames from a file, one per line ('-' for stdin)
    #[arg(short = 'f', long)]
    hostnames_file: Option<String>,

    /// Provider to query (repeatable) [default: honest, bt]
    #[arg(short, long = "provider")]
    providers: Vec<String>,

    /// Define or replace a provider: LABEL=ADDR[,ADDR...] (repeatable)
    #[arg(short, long = "endpoints")]
    endpoints: Vec<String>,

    /// Job queue capacity per endpoint
    #[arg(long, default_value = "3")]
    queue_depth: usize,

    /// Nonexistent names queried per endpoint to detect sinkholes
    #[arg(long, default_value = "5")]
    probes: usize,

    /// Tries per lookup before giving up on it
    #[arg(long, default_value = "2")]
    attempts: usize,

    /// Timeout per DNS exchange, in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Seed for endpoint selection and probe names
    #[arg(long)]
    seed: Option<u64>,

    /// How probe answers become a baseline
    #[arg(long, value_enum, default_value_t = Policy::FirstNonEmpty)]
    baseline: Policy,

    /// Log every query
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    FirstNonEmpty,
    Consensus,
}

impl From<Policy> for BaselinePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::FirstNonEmpty => BaselinePolicy::FirstNonEmpty,
            Policy::Consensus => BaselinePolicy::Consensus,
        }
    }
}

fn read_hostnames(args: &Args) -> Result<Vec<String>, Error> {
    let mut hostnames = args.hostnames.clone();

    if let Some(path) = &args.hostnames_file {
        let contents = if path == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(path)?
        };

        hostnames.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    if hostnames.is_empty() {
        return Err(ConfigError::NoHostnames.into());
    }
    Ok(hostnames)
}

async fn run(args: Args) -> Result<(), Error> {
    let hostnames = read_hostnames(&args)?;

    let mut registry = ProviderRegistry::with_defaults();
    for spec in &args.endpoints {
        registry.apply_override(spec)?;
    }

    let selection: Vec<String> = if args.providers.is_empty() {
        DEFAULT_SELECTION.iter().map(|s| s.to_string()).collect()
    } else {
        args.providers.clone()
    };
    let providers = registry.select(&selection)?;

    let config = SessionConfig {
        queue_depth: args.queue_depth,
        probe_count: args.probes,
        attempts: args.attempts,
        timeout: Duration::from_millis(args.timeout_ms),
        seed: args.seed,
        baseline_policy: args.baseline.into(),
    };
    let lookup = Arc::new(DnsClient::new(config.timeout));
    let session = Session::new(providers, config, lookup, Arc::new(LogSink))?;

    tracing::info!(
        hostnames = hostnames.len(),
        providers = %selection.join(","),
        endpoints = session.endpoint_count(),
        "starting session"
    );

    let report = session.run(&hostnames).await;
    print!("{}", report);

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(error = %err, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "aborted");
            ExitCode::FAILURE
        }
    }
}
