use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dohscan::dns::{DEFAULT_QUERY_NAME, RecordType};
use dohscan::scan::{self, ScanConfig};
use dohscan::{CandidateReader, Error, QuerySpec, Result, ScanSummary};

#[derive(Parser)]
#[command(name = "dohscan")]
#[command(about = "Find hosts that answer DNS-over-HTTPS queries", long_about = None)]
struct Args {
    /// File with one `host,suffix` candidate per line
    input: PathBuf,

    /// Directory to write the result files to
    output_dir: PathBuf,

    /// Number of concurrent workers
    #[arg(short = 'n', long, default_value = "100")]
    num_threads: usize,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Name to query for
    #[arg(long, default_value = DEFAULT_QUERY_NAME)]
    query_name: String,

    /// Record type to query for (A, AAAA, TYPE65, ...)
    #[arg(long, default_value = "A")]
    record_type: RecordType,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Log every probe outcome
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> ScanConfig {
        let mut config = ScanConfig::new(&self.output_dir);
        config.workers = self.num_threads;
        config.probe.timeout = Duration::from_secs(self.timeout);
        config.probe.insecure = self.insecure;
        config.query = QuerySpec {
            name: self.query_name.clone(),
            record_type: self.record_type,
        };
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dohscan=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on Ctrl-C. If the handler can't be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn run(args: Args) -> Result<ScanSummary> {
    let config = args.config();

    let file = File::open(&args.input).map_err(|source| Error::Input {
        path: args.input.clone(),
        source,
    })?;
    let mut reader = CandidateReader::new(BufReader::new(file));
    let candidates: Vec<_> = reader.by_ref().collect();
    if let Some(source) = reader.take_error() {
        return Err(Error::Input {
            path: args.input.clone(),
            source,
        });
    }
    if reader.skipped() > 0 {
        warn!("skipped {} malformed input lines", reader.skipped());
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;

    rt.block_on(scan::run(&config, candidates, shutdown_signal()))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(summary) => {
            if summary.interrupted {
                info!(
                    "Interrupted: {} of {} candidates recorded",
                    summary.produced,
                    summary.total.unwrap_or_default()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
