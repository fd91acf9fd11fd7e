//! Refresh cycle orchestration
//!
//! One refresh fans out every service probe, both storage listings and the
//! explorer calls at once, applies each probe result as it settles, and only
//! completes when everything has settled. Automatic ticks and manual
//! triggers share [`Orchestrator::refresh`]; a refresh already in flight
//! makes a new one a no-op.

use crate::aggregation::{SampleStats, UploadSeries, build_transaction_series};
use crate::config::Config;
use crate::errors::Result;
use crate::health::HealthTracker;
use crate::snapshot::{ConsensusOverview, DashboardSnapshot, NetworkOverview, RefreshTrigger};
use crate::telemetry::{
    ChartPoint, Clock, ConsensusMetadata, FileSample, FileScope, NetworkStats, ProbeResult,
    ServiceId,
};
use crate::transport::{ExplorerSource, FileSource, ServiceProber};

use chrono::Local;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Allows at most one refresh at a time.
#[derive(Debug, Default)]
pub struct RefreshGate {
    in_flight: AtomicBool,
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a refresh is already running.
    pub fn try_begin(&self) -> Option<RefreshGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Clears the gate when the refresh finishes.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    gate: &'a RefreshGate,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

/// Manual refresh control, the programmatic "Refresh Now" button.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    sender: mpsc::Sender<()>,
    gate: Arc<RefreshGate>,
}

impl RefreshHandle {
    /// Request a refresh. Returns false while one is already running, like a
    /// disabled button.
    pub fn trigger(&self) -> bool {
        if self.gate.is_in_flight() {
            return false;
        }
        self.sender.try_send(()).is_ok()
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_in_flight()
    }
}

pub struct Orchestrator {
    config: Config,
    prober: Arc<dyn ServiceProber>,
    files: Arc<dyn FileSource>,
    explorer: Arc<dyn ExplorerSource>,
    clock: Arc<dyn Clock>,
    tracker: Mutex<HealthTracker>,
    gate: Arc<RefreshGate>,
    latest: RwLock<Option<DashboardSnapshot>>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        prober: Arc<dyn ServiceProber>,
        files: Arc<dyn FileSource>,
        explorer: Arc<dyn ExplorerSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            prober,
            files,
            explorer,
            clock,
            tracker: Mutex::new(HealthTracker::new()),
            gate: Arc::new(RefreshGate::new()),
            latest: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_refreshing(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Most recent completed snapshot.
    pub async fn latest(&self) -> Option<DashboardSnapshot> {
        self.latest.read().await.clone()
    }

    /// Manual trigger handle and the receiver to pass to [`Orchestrator::run`].
    pub fn refresh_handle(&self) -> (RefreshHandle, mpsc::Receiver<()>) {
        let (sender, receiver) = mpsc::channel(1);
        let handle = RefreshHandle {
            sender,
            gate: Arc::clone(&self.gate),
        };
        (handle, receiver)
    }

    /// Run one refresh cycle. Returns `None` if another cycle is in flight.
    #[instrument(skip(self), fields(network = %self.config.profile.network))]
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Option<DashboardSnapshot> {
        let Some(_guard) = self.gate.try_begin() else {
            debug!("Refresh already in flight, skipping {:?} trigger", trigger);
            return None;
        };

        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        debug!("Starting refresh cycle {}", cycle_id);

        self.tracker.lock().await.begin_refresh(&ServiceId::ALL);

        let probes = join_all(
            ServiceId::ALL
                .into_iter()
                .map(|service| self.probe_and_record(service)),
        );
        let (_, (broad, scoped), (stats, chart, metadata)) =
            tokio::join!(probes, self.fetch_listings(), self.fetch_explorer());

        let now = self.clock.now();

        let sample_stats = broad
            .as_ref()
            .ok()
            .and_then(|sample| SampleStats::from_records(&sample.rows, sample.total_count));

        let uploads = if self.config.profile.has_storage() {
            UploadSeries::from_sources(broad, scoped, &now.with_timezone(&Local))
        } else {
            UploadSeries::unavailable(format!(
                "Storage data only available on networks with a storage API, not on {}",
                self.config.profile.display_name
            ))
        };
        if let UploadSeries::Unavailable { reason } = &uploads {
            warn!("Upload series unavailable: {}", reason);
        }

        let overview = stats.as_ref().ok().map(NetworkOverview::from);
        let consensus = metadata.as_ref().ok().map(ConsensusOverview::from);
        let transactions = match chart {
            Ok(points) => {
                let today_count = stats.as_ref().ok().and_then(|s| s.transactions_today);
                build_transaction_series(&points, today_count, now.date_naive())
            }
            Err(e) => {
                warn!("Failed to fetch transaction chart: {}", e);
                Vec::new()
            }
        };

        let (statuses, summary) = {
            let tracker = self.tracker.lock().await;
            (tracker.statuses(), tracker.summarize())
        };

        let snapshot = DashboardSnapshot {
            cycle_id,
            trigger,
            network: self.config.profile.network,
            completed_at: now,
            duration_ms: started.elapsed().as_millis() as u64,
            statuses,
            summary,
            uploads,
            sample_stats,
            overview,
            consensus,
            transactions,
        };

        info!(
            "Refresh {} complete in {}ms - {}",
            cycle_id, snapshot.duration_ms, snapshot.summary.message
        );

        *self.latest.write().await = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Probe one service and apply the result as soon as it settles.
    async fn probe_and_record(&self, service: ServiceId) {
        let result = match self.prober.probe(service).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Probe for {} failed: {}", service, e);
                ProbeResult::Down
            }
        };

        let now = self.clock.now();
        self.tracker.lock().await.record_probe(service, result, now);
    }

    async fn fetch_listings(&self) -> (Result<FileSample>, Result<FileSample>) {
        if !self.config.profile.has_storage() {
            return (Ok(FileSample::default()), Ok(FileSample::default()));
        }

        let (broad, scoped) = tokio::join!(
            self.files
                .fetch_file_sample(FileScope::Network, self.config.broad_sample_limit),
            self.files
                .fetch_file_sample(FileScope::Caller, self.config.scoped_sample_limit),
        );

        if let Err(e) = &broad {
            warn!("Failed to fetch network file sample: {}", e);
        }
        if let Err(e) = &scoped {
            warn!("Failed to fetch caller file sample: {}", e);
        }

        (broad, scoped)
    }

    async fn fetch_explorer(
        &self,
    ) -> (
        Result<NetworkStats>,
        Result<Vec<ChartPoint>>,
        Result<ConsensusMetadata>,
    ) {
        let (stats, chart, metadata) = tokio::join!(
            self.explorer.fetch_network_stats(),
            self.explorer.fetch_transaction_chart(),
            self.explorer.fetch_consensus_metadata(),
        );

        if let Err(e) = &stats {
            warn!("Failed to fetch network stats: {}", e);
        }
        if let Err(e) = &metadata {
            warn!("Failed to fetch consensus metadata: {}", e);
        }

        (stats, chart, metadata)
    }

    /// Refresh on the configured interval and on manual triggers until
    /// `shutdown` resolves. Ticks that arrive during a refresh are dropped.
    pub async fn run<S>(self: Arc<Self>, mut manual: mpsc::Receiver<()>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        info!(
            "Starting refresh loop on {} every {}s",
            self.config.profile.display_name,
            self.config.refresh_interval.as_secs()
        );

        let mut ticker = interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.spawn_refresh(RefreshTrigger::Automatic),
                Some(()) = manual.recv() => self.spawn_refresh(RefreshTrigger::Manual),
            }
        }

        info!("Refresh loop stopped");
    }

    fn spawn_refresh(self: &Arc<Self>, trigger: RefreshTrigger) {
        if self.gate.is_in_flight() {
            debug!("Skipping {:?} refresh, previous cycle still running", trigger);
            return;
        }

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.refresh(trigger).await;
        });
    }
}
