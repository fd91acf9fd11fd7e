//! HTTP collaborators: service probes, storage listings and explorer stats

use crate::config::{Config, NetworkProfile};
use crate::errors::{Result, TelemetryError};
use crate::telemetry::{
    ChartPoint, ConsensusMetadata, FileSample, FileScope, NetworkStats, ProbeResult, ServiceId,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Checks whether one service is reachable.
///
/// Implementations must resolve; an `Err` is treated as the service being
/// down.
#[async_trait]
pub trait ServiceProber: Send + Sync {
    async fn probe(&self, service: ServiceId) -> Result<ProbeResult>;
}

/// Paged access to the storage listing.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch_file_sample(&self, scope: FileScope, limit: usize) -> Result<FileSample>;
}

/// Chain explorer and consensus indexer statistics.
#[async_trait]
pub trait ExplorerSource: Send + Sync {
    async fn fetch_network_stats(&self) -> Result<NetworkStats>;
    async fn fetch_transaction_chart(&self) -> Result<Vec<ChartPoint>>;
    async fn fetch_consensus_metadata(&self) -> Result<ConsensusMetadata>;
}

#[derive(Deserialize)]
struct ChartResponse {
    #[serde(default)]
    chart_data: Vec<ChartPoint>,
}

/// reqwest-backed implementation of every collaborator.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    profile: NetworkProfile,
    storage_api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent(format!("network_telemetry/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TelemetryError::Http)?;

        Ok(Self {
            client,
            profile: config.profile.clone(),
            storage_api_key: config.storage_api_key.clone(),
        })
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    /// Storage base URL and auth headers, or why storage cannot be used.
    fn storage_access(&self) -> std::result::Result<(&str, HeaderMap), String> {
        let base = self
            .profile
            .storage_api
            .as_deref()
            .ok_or_else(|| format!("storage API not available on {}", self.profile.display_name))?;

        let key = self
            .storage_api_key
            .as_deref()
            .ok_or_else(|| "no storage API key configured".to_string())?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e| e.to_string())?,
        );
        headers.insert("x-auth-provider", HeaderValue::from_static("apikey"));

        Ok((base, headers))
    }

    /// Send a request and decode a JSON body, failing on non-success status.
    async fn send_json<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Upstream(format!(
                "unexpected response {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response.json().await?)
    }

    async fn probe_explorer(&self) -> Result<ProbeResult> {
        let url = format!("{}/main-page/blocks", self.profile.explorer_api);
        let blocks: Value = self.send_json(self.client.get(&url)).await?;

        Ok(if blocks.is_array() {
            ProbeResult::Healthy
        } else {
            ProbeResult::Down
        })
    }

    /// The indexer's metadata object, or `None` when it reports a failure code.
    async fn scan_metadata(&self) -> Result<Option<Value>> {
        let url = format!("{}/api/scan/metadata", self.profile.consensus_api);
        let mut body: Value = self.send_json(self.client.post(&url).json(&json!({}))).await?;

        if body["code"].as_i64() != Some(0) || body["data"].is_null() {
            return Ok(None);
        }
        Ok(body.get_mut("data").map(Value::take))
    }

    async fn probe_consensus(&self) -> Result<ProbeResult> {
        Ok(match self.scan_metadata().await? {
            Some(_) => ProbeResult::Healthy,
            None => ProbeResult::Down,
        })
    }

    async fn probe_storage(&self) -> Result<ProbeResult> {
        let (base, headers) = match self.storage_access() {
            Ok(access) => access,
            Err(reason) => {
                debug!("Storage probe not applicable: {}", reason);
                return Ok(ProbeResult::NotApplicable);
            }
        };

        let url = format!("{}/objects/roots", base);
        let _: Value = self
            .send_json(self.client.get(&url).headers(headers).query(&[("limit", "1")]))
            .await?;

        Ok(ProbeResult::Healthy)
    }

    /// Any response at all counts as reachable.
    async fn probe_gateway(&self) -> Result<ProbeResult> {
        if !self.profile.has_storage() {
            return Ok(ProbeResult::NotApplicable);
        }

        let url = format!("{}/", self.profile.gateway_url.trim_end_matches('/'));
        self.client.head(&url).send().await?;
        Ok(ProbeResult::Healthy)
    }

    async fn rpc_block_number(&self, url: &str) -> Result<ProbeResult> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        });
        let body: Value = self.send_json(self.client.post(url).json(&request)).await?;

        Ok(if body.get("result").is_some_and(|r| !r.is_null()) {
            ProbeResult::Healthy
        } else {
            ProbeResult::Down
        })
    }

    /// The alternative endpoint is only tried when the primary fails outright.
    async fn probe_rpc(&self) -> Result<ProbeResult> {
        match self.rpc_block_number(&self.profile.rpc_url).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Primary RPC endpoint failed, trying alternative: {}", e);
                self.rpc_block_number(&self.profile.alt_rpc_url).await
            }
        }
    }
}

#[async_trait]
impl ServiceProber for HttpTransport {
    async fn probe(&self, service: ServiceId) -> Result<ProbeResult> {
        match service {
            ServiceId::ChainExplorer => self.probe_explorer().await,
            ServiceId::ConsensusIndexer => self.probe_consensus().await,
            ServiceId::StorageApi => self.probe_storage().await,
            ServiceId::Gateway => self.probe_gateway().await,
            ServiceId::RpcNode => self.probe_rpc().await,
        }
    }
}

#[async_trait]
impl FileSource for HttpTransport {
    async fn fetch_file_sample(&self, scope: FileScope, limit: usize) -> Result<FileSample> {
        let (base, headers) = self.storage_access().map_err(TelemetryError::Listing)?;
        let url = format!("{}/objects/roots", base);

        let mut request = self
            .client
            .get(&url)
            .headers(headers)
            .query(&[("limit", limit.to_string())]);
        if scope == FileScope::Caller {
            request = request.query(&[("scope", "user")]);
        }

        let sample: FileSample = self
            .send_json(request)
            .await
            .map_err(|e| TelemetryError::Listing(e.to_string()))?;

        debug!(
            "Fetched {} {:?} file records ({} total)",
            sample.rows.len(),
            scope,
            sample.total_count
        );
        Ok(sample)
    }
}

#[async_trait]
impl ExplorerSource for HttpTransport {
    async fn fetch_network_stats(&self) -> Result<NetworkStats> {
        let url = format!("{}/stats", self.profile.explorer_api);
        self.send_json(self.client.get(&url)).await
    }

    async fn fetch_transaction_chart(&self) -> Result<Vec<ChartPoint>> {
        let url = format!("{}/stats/charts/transactions", self.profile.explorer_api);
        let chart: ChartResponse = self.send_json(self.client.get(&url)).await?;
        Ok(chart.chart_data)
    }

    async fn fetch_consensus_metadata(&self) -> Result<ConsensusMetadata> {
        let data = self.scan_metadata().await?.ok_or_else(|| {
            TelemetryError::Upstream("consensus indexer returned no metadata".to_string())
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Prober wrapper that records outcome counts and durations.
#[derive(Debug)]
pub struct InstrumentedProber<P> {
    inner: P,
    metrics: ProbeMetrics,
}

impl<P: ServiceProber> InstrumentedProber<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            metrics: ProbeMetrics::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub async fn metrics(&self) -> ProbeMetricsSnapshot {
        self.metrics.snapshot().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset().await;
    }
}

#[async_trait]
impl<P: ServiceProber> ServiceProber for InstrumentedProber<P> {
    async fn probe(&self, service: ServiceId) -> Result<ProbeResult> {
        let start_time = Instant::now();
        let result = self.inner.probe(service).await;
        let succeeded = matches!(
            result,
            Ok(ProbeResult::Healthy) | Ok(ProbeResult::NotApplicable)
        );
        self.metrics.record(succeeded, start_time.elapsed()).await;
        result
    }
}

#[derive(Debug, Default)]
struct ProbeCounters {
    attempts: u64,
    successes: u64,
    failures: u64,
    total_duration: Duration,
    min_duration: Option<Duration>,
    max_duration: Option<Duration>,
}

#[derive(Debug)]
struct ProbeMetrics {
    counters: RwLock<ProbeCounters>,
}

impl ProbeMetrics {
    fn new() -> Self {
        Self {
            counters: RwLock::new(ProbeCounters::default()),
        }
    }

    async fn record(&self, succeeded: bool, duration: Duration) {
        let mut counters = self.counters.write().await;
        counters.attempts += 1;
        if succeeded {
            counters.successes += 1;
        } else {
            counters.failures += 1;
        }
        counters.total_duration += duration;
        counters.min_duration = Some(counters.min_duration.map_or(duration, |m| m.min(duration)));
        counters.max_duration = Some(counters.max_duration.map_or(duration, |m| m.max(duration)));
    }

    async fn snapshot(&self) -> ProbeMetricsSnapshot {
        let counters = self.counters.read().await;

        let success_rate = if counters.attempts > 0 {
            (counters.successes as f64 / counters.attempts as f64) * 100.0
        } else {
            0.0
        };

        let avg_duration = average_duration(counters.total_duration, counters.attempts);

        ProbeMetricsSnapshot {
            attempts: counters.attempts,
            successes: counters.successes,
            failures: counters.failures,
            success_rate,
            avg_duration_ms: avg_duration.as_millis() as u64,
            min_duration_ms: counters.min_duration.map(|d| d.as_millis() as u64),
            max_duration_ms: counters.max_duration.map(|d| d.as_millis() as u64),
        }
    }

    async fn reset(&self) {
        *self.counters.write().await = ProbeCounters::default();
    }
}

/// Mean duration; the divisor saturates at `u32::MAX` attempts.
fn average_duration(total: Duration, attempts: u64) -> Duration {
    if attempts == 0 {
        return Duration::ZERO;
    }
    total / u32::try_from(attempts).unwrap_or(u32::MAX)
}

/// Snapshot of probe metrics
#[derive(Debug, Clone)]
pub struct ProbeMetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub success_rate: f64,
    pub avg_duration_ms: u64,
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
}
