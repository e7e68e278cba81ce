//! Scan orchestration.
//!
//! Wires the dispatcher to the partitioner, reports progress, and handles
//! early shutdown.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};

use crate::candidate::Candidate;
use crate::classifier::{Classifier, QuerySpec};
use crate::dispatch::{DEFAULT_POOL_SIZE, Dispatcher};
use crate::error::Result;
use crate::partition::Partitioner;
use crate::probe::{ProbeConfig, Prober};
use crate::stats::ScanStats;

/// Configuration for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory receiving the two partition files.
    pub output_dir: PathBuf,
    /// Upper bound on concurrent classifications.
    pub workers: usize,
    pub probe: ProbeConfig,
    pub query: QuerySpec,
    /// How often to log a progress line; zero is treated as 1ms.
    pub progress_interval: Duration,
}

impl ScanConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            workers: DEFAULT_POOL_SIZE,
            probe: ProbeConfig::default(),
            query: QuerySpec::default(),
            progress_interval: Duration::from_secs(5),
        }
    }
}

/// Outcome of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Candidate count, if known up front.
    pub total: Option<usize>,
    /// Verdicts produced and written.
    pub produced: u64,
    pub capable: u64,
    pub incapable: u64,
    /// True if the shutdown signal fired before all candidates were done.
    pub interrupted: bool,
}

/// Classify every candidate and write the verdicts under `config.output_dir`.
///
/// Output files are created before any probing starts. When `shutdown`
/// completes first, in-flight probes are abandoned and the summary is
/// returned with `interrupted` set; lines already written stay valid.
pub async fn run<I, S>(config: &ScanConfig, candidates: I, shutdown: S) -> Result<ScanSummary>
where
    I: IntoIterator<Item = Candidate>,
    I::IntoIter: Send + 'static,
    S: Future<Output = ()>,
{
    let mut partitioner = Partitioner::create(&config.output_dir).await?;
    let prober = Prober::new(&config.probe)?;
    let dispatcher = Dispatcher::new(
        Classifier::new(prober, config.query.clone()),
        config.workers,
    );

    let candidates = candidates.into_iter();
    let total = candidates.size_hint().1;
    let mut verdicts = dispatcher.run(candidates);

    match total {
        Some(total) => info!(
            "Beginning {} queries using {} workers",
            total,
            verdicts.pool_size()
        ),
        None => info!("Beginning queries using {} workers", verdicts.pool_size()),
    }
    info!(
        "Query: {} {} (timeout {:?})",
        config.query.name, config.query.record_type, config.probe.timeout
    );

    let stats = Arc::new(ScanStats::new());
    let reporter = tokio::spawn(report_progress(
        stats.clone(),
        total,
        config.progress_interval,
    ));

    tokio::pin!(shutdown);
    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break Ok(true),
            verdict = verdicts.next() => match verdict {
                Some(verdict) => {
                    if let Err(e) = partitioner.record(&verdict).await {
                        break Err(e);
                    }
                    stats.record(verdict.is_doh_capable);
                }
                None => break Ok(false),
            },
        }
    };
    reporter.abort();
    let interrupted = outcome?;

    let produced = if interrupted {
        let produced = verdicts.cancel();
        warn!(
            "Exiting early after {} verdicts. Results written so far remain valid.",
            produced
        );
        produced
    } else {
        verdicts.produced()
    };

    let summary = ScanSummary {
        total,
        produced,
        capable: partitioner.capable_lines(),
        incapable: partitioner.incapable_lines(),
        interrupted,
    };

    info!(
        "Done: {} processed, {} capable -> {}, {} incapable -> {}",
        summary.produced,
        summary.capable,
        partitioner.paths().capable.display(),
        summary.incapable,
        partitioner.paths().incapable.display()
    );

    Ok(summary)
}

const MIN_PROGRESS_PERIOD: Duration = Duration::from_millis(1);

/// `tokio::time::interval` panics on a zero period.
fn progress_period(every: Duration) -> Duration {
    every.max(MIN_PROGRESS_PERIOD)
}

async fn report_progress(stats: Arc<ScanStats>, total: Option<usize>, every: Duration) {
    let mut interval = tokio::time::interval(progress_period(every));
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        let snapshot = stats.snapshot();
        let total = total.map_or_else(|| "?".to_string(), |t| t.to_string());
        info!(
            "[progress] processed={}/{} capable={} incapable={} elapsed={:.0}s rate={:.1}/s",
            snapshot.processed,
            total,
            snapshot.capable,
            snapshot.incapable,
            snapshot.elapsed_secs,
            snapshot.rate_per_sec
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_progress_period_is_clamped() {
        assert_eq!(progress_period(Duration::ZERO), MIN_PROGRESS_PERIOD);
        assert_eq!(progress_period(Duration::from_secs(5)), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn reporter_runs_with_zero_period() {
        let reporter = tokio::spawn(report_progress(
            Arc::new(ScanStats::new()),
            Some(1),
            Duration::ZERO,
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!reporter.is_finished());
        reporter.abort();
    }
}
