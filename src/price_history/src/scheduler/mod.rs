//! Ingestion scheduler: acquire, append, rebuild, export.
//!
//! ## Cycle
//! 1. Every configured source is asked for an observation concurrently. A failing
//!    source, or one that does not answer within the fetch timeout, is logged and
//!    counts as "no observation this cycle"; it never stops the others.
//! 2. Obtained observations are appended one after another on a blocking thread.
//!    A rejected or failed append is logged and not retried until the next cycle.
//! 3. Once every append has finished, the store is rebuilt once and the series are
//!    handed to the sink.
//!
//! ## Run loop
//! `Idle -> Running(cycle) -> Idle`. Cycles never overlap: the trigger is only
//! awaited again after the previous cycle returned. A shutdown signal observed while
//! idle or while sources are still being fetched stops the loop without writing
//! anything; once appends have started the cycle is allowed to finish.

pub mod trigger;

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Context;
use futures::future::join_all;
use indexmap::IndexMap;
use price_feed::{
    io::sink::SeriesSink,
    models::{
        observation::Observation,
        source_target::{ProviderKind, SourceTarget},
    },
    providers::{PriceProvider, ProviderError, build_provider},
};
use tracing::{error, info, warn};

use crate::{
    config::TrackerConfig,
    errors::StoreError,
    reconstruct::{Reconstruction, rebuild},
    scheduler::trigger::Trigger,
    store::SnapshotStore,
};

/// Longest a single source may take to answer before it counts as failed.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// One configured source bound to the provider that serves it.
struct BoundSource {
    target: SourceTarget,
    provider: Arc<dyn PriceProvider>,
}

/// Outcome of a single acquisition attempt.
enum Acquired {
    Observation(Observation),
    NoData,
    Failed,
}

/// Counters and results of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Sources asked for a price.
    pub attempted: usize,
    /// Observations written to the store.
    pub appended: usize,
    /// Sources that answered without a price.
    pub no_data: usize,
    /// Sources whose acquisition failed or timed out.
    pub acquisition_failures: usize,
    /// Observations rejected as invalid.
    pub rejected: usize,
    /// Appends that failed on I/O.
    pub append_failures: usize,
    /// Rebuild output; `None` when the rebuild itself failed.
    pub reconstruction: Option<Reconstruction>,
    /// `true` when the sink refused the rebuilt series.
    pub sink_failed: bool,
}

/// Drives repeated ingestion cycles against one store.
pub struct IngestionScheduler<S> {
    store: Arc<SnapshotStore>,
    sources: Vec<BoundSource>,
    sink: S,
    fetch_timeout: Duration,
}

impl<S> IngestionScheduler<S>
where
    S: SeriesSink + Send + Sync,
    S::Output: std::fmt::Debug,
{
    /// Creates a scheduler without sources.
    pub fn new(store: Arc<SnapshotStore>, sink: S) -> Self {
        Self {
            store,
            sources: Vec::new(),
            sink,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Adds a source, served by `provider`. Sources are polled in insertion order.
    pub fn with_source(mut self, target: SourceTarget, provider: Arc<dyn PriceProvider>) -> Self {
        self.sources.push(BoundSource { target, provider });
        self
    }

    /// Overrides [`DEFAULT_FETCH_TIMEOUT`].
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builds a scheduler for every source in `cfg`.
    ///
    /// Sources of the same kind share one provider instance, and with it one rate
    /// limiter.
    pub fn from_config(cfg: &TrackerConfig, sink: S) -> anyhow::Result<Self> {
        let store = Arc::new(SnapshotStore::new(&cfg.store_path));
        let mut providers: IndexMap<ProviderKind, Arc<dyn PriceProvider>> = IndexMap::new();
        let mut scheduler =
            Self::new(store, sink).with_fetch_timeout(Duration::from_secs(cfg.fetch_timeout_secs));

        for target in &cfg.sources {
            let provider = match providers.get(&target.kind) {
                Some(p) => Arc::clone(p),
                None => {
                    let p: Arc<dyn PriceProvider> = Arc::from(
                        build_provider(target.kind)
                            .with_context(|| format!("build provider for {:?}", target.kind))?,
                    );
                    providers.insert(target.kind, Arc::clone(&p));
                    p
                }
            };
            scheduler = scheduler.with_source(target.clone(), provider);
        }

        info!(
            sources = scheduler.sources.len(),
            providers = providers.len(),
            store = %cfg.store_path.display(),
            "scheduler configured"
        );
        Ok(scheduler)
    }

    /// Number of configured sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Store this scheduler writes to.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs one complete cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let acquired = self.acquire_all().await;
        self.commit_and_publish(acquired).await
    }

    /// Runs cycles whenever `trigger` fires until `shutdown` resolves.
    ///
    /// Returns the number of completed cycles.
    pub async fn run<T, F>(&self, trigger: &mut T, shutdown: F) -> usize
    where
        T: Trigger + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0usize;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested while idle");
                    break;
                }
                _ = trigger.wait() => {}
            }

            info!(cycle = cycles + 1, sources = self.sources.len(), "cycle started");
            let acquired = tokio::select! {
                _ = &mut shutdown => {
                    warn!("shutdown requested during acquisition; abandoning cycle");
                    break;
                }
                acquired = self.acquire_all() => acquired,
            };

            let report = self.commit_and_publish(acquired).await;
            cycles += 1;
            info!(
                cycle = cycles,
                appended = report.appended,
                failures = report.acquisition_failures + report.append_failures,
                "cycle finished"
            );
        }

        cycles
    }

    async fn acquire_all(&self) -> Vec<Acquired> {
        let limit = self.fetch_timeout;
        let fetches = self.sources.iter().map(|s| async move {
            match tokio::time::timeout(limit, s.provider.fetch(&s.target)).await {
                Ok(Ok(Some(obs))) => Acquired::Observation(obs),
                Ok(Ok(None)) => {
                    info!(source = %s.target.id, target = %s.target.target, "no price this cycle");
                    Acquired::NoData
                }
                Ok(Err(e)) => {
                    log_acquisition_failure(&s.target, &e);
                    Acquired::Failed
                }
                Err(_) => {
                    warn!(
                        source = %s.target.id,
                        target = %s.target.target,
                        timeout_secs = limit.as_secs_f64(),
                        "source did not answer in time; skipping source"
                    );
                    Acquired::Failed
                }
            }
        });
        join_all(fetches).await
    }

    async fn commit_and_publish(&self, acquired: Vec<Acquired>) -> CycleReport {
        let mut report = CycleReport {
            attempted: acquired.len(),
            ..CycleReport::default()
        };

        let mut observations = Vec::new();
        for outcome in acquired {
            match outcome {
                Acquired::Observation(obs) => observations.push(obs),
                Acquired::NoData => report.no_data += 1,
                Acquired::Failed => report.acquisition_failures += 1,
            }
        }

        let pending = observations.len();
        let store = Arc::clone(&self.store);
        let results = tokio::task::spawn_blocking(move || {
            observations
                .iter()
                .map(|obs| (obs.source.clone(), obs.entity.clone(), store.append(obs)))
                .collect::<Vec<_>>()
        })
        .await;

        match results {
            Ok(results) => {
                for (source, entity, res) in results {
                    match res {
                        Ok(_) => report.appended += 1,
                        Err(e @ StoreError::InvalidObservation { .. }) => {
                            warn!(%source, %entity, error = %e, "observation discarded");
                            report.rejected += 1;
                        }
                        Err(e) => {
                            error!(%source, %entity, error = %e, "append failed");
                            report.append_failures += 1;
                        }
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "append task aborted");
                report.append_failures += pending;
            }
        }

        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || rebuild(&store)).await {
            Ok(Ok(reconstruction)) => {
                match self.sink.write(&reconstruction.series).await {
                    Ok(out) => info!(output = ?out, "series handed to sink"),
                    Err(e) => {
                        error!(error = %e, "sink rejected series");
                        report.sink_failed = true;
                    }
                }
                report.reconstruction = Some(reconstruction);
            }
            Ok(Err(e)) => error!(error = %e, "rebuild failed"),
            Err(e) => error!(error = %e, "rebuild task aborted"),
        }

        report
    }
}

fn log_acquisition_failure(target: &SourceTarget, e: &ProviderError) {
    warn!(source = %target.id, target = %target.target, error = %e, "acquisition failed; skipping source");
}
