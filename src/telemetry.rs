//! Telemetry data structures shared by the tracker, the aggregator and the
//! HTTP collaborators

use crate::errors::TelemetryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// An independently probed subsystem of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceId {
    ChainExplorer,
    ConsensusIndexer,
    StorageApi,
    Gateway,
    RpcNode,
}

impl ServiceId {
    pub const ALL: [ServiceId; 5] = [
        ServiceId::ChainExplorer,
        ServiceId::ConsensusIndexer,
        ServiceId::StorageApi,
        ServiceId::Gateway,
        ServiceId::RpcNode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::ChainExplorer => "chain-explorer",
            ServiceId::ConsensusIndexer => "consensus-indexer",
            ServiceId::StorageApi => "storage-api",
            ServiceId::Gateway => "gateway",
            ServiceId::RpcNode => "rpc-node",
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceId {
    type Err = TelemetryError;

    /// Unknown identifiers are wiring bugs, not runtime conditions.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| TelemetryError::UnknownService(s.to_string()))
    }
}

/// Outcome of checking one service at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeResult {
    /// A refresh has just started for this service
    Loading,
    Healthy,
    Down,
    /// The service does not exist on the selected network
    NotApplicable,
}

/// Debounced status shown for a service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Loading,
    Healthy,
    Warning,
    Error,
    NotApplicable,
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayStatus::Loading => write!(f, "LOADING"),
            DisplayStatus::Healthy => write!(f, "HEALTHY"),
            DisplayStatus::Warning => write!(f, "WARNING"),
            DisplayStatus::Error => write!(f, "ERROR"),
            DisplayStatus::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Which listing a file sample is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileScope {
    /// Network-wide sample
    Network,
    /// The caller's own uploads
    Caller,
}

/// A stored file as reported by the storage listing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "headCid")]
    pub content_id: String,
    /// `None` when missing or unparseable; such records are never bucketed
    #[serde(default, deserialize_with = "lenient_opt_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "size", default, deserialize_with = "lenient_u64")]
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl FileRecord {
    pub fn new(content_id: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            content_id: content_id.into(),
            created_at,
            size_bytes: 0,
            mime_type: None,
            name: None,
            status: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn is_archived(&self) -> bool {
        self.status.as_deref() == Some("Archived")
    }
}

/// One page of a storage listing together with the provider's total.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSample {
    #[serde(default)]
    pub rows: Vec<FileRecord>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_count: u64,
}

/// Headline numbers from the chain explorer.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkStats {
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub total_blocks: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub total_transactions: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub total_addresses: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub transactions_today: Option<u64>,
    /// Milliseconds, as a decimal string
    #[serde(default, deserialize_with = "lenient_opt_decimal")]
    pub average_block_time: Option<String>,
    /// Token price as the explorer's decimal string
    #[serde(default, deserialize_with = "lenient_opt_decimal")]
    pub coin_price: Option<String>,
    /// 24h price change in percent
    #[serde(default, deserialize_with = "lenient_opt_decimal")]
    pub coin_price_change_percentage: Option<String>,
}

/// Chain-wide storage figures from the consensus indexer's metadata call.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConsensusMetadata {
    /// Size of the archived chain history in bytes
    #[serde(rename = "blockChainHistorySize", default, deserialize_with = "lenient_opt_u64")]
    pub history_size_bytes: Option<u64>,
    /// Total space pledged by farmers in bytes
    #[serde(rename = "consensusSpace", default, deserialize_with = "lenient_opt_u64")]
    pub consensus_space_bytes: Option<u64>,
}

/// One day of the explorer's transaction chart.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub date: chrono::NaiveDate,
    #[serde(rename = "transaction_count", deserialize_with = "lenient_u64")]
    pub count: u64,
}

/// Source of "now" for hysteresis comparisons and date bucketing.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Upstream APIs send counts either as JSON numbers or numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    fn as_u64(&self) -> Option<u64> {
        match self {
            NumberOrString::Number(n) => n.as_u64(),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }

    fn into_decimal(self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.trim().to_string(),
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(lenient_opt_u64(deserializer)?.unwrap_or(0))
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

/// Accepts RFC 3339 or anything chrono's `DateTime<Utc>` parser takes. Any
/// other value, including non-strings, decodes as `None`.
fn lenient_opt_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_str).and_then(|s| {
        let s = s.trim();
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<DateTime<Utc>>())
            .ok()
    }))
}

fn lenient_opt_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(value.map(NumberOrString::into_decimal).filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_round_trip_names() {
        for id in ServiceId::ALL {
            assert_eq!(id.as_str().parse::<ServiceId>().unwrap(), id);
        }
        assert_eq!(ServiceId::RpcNode.to_string(), "rpc-node");
    }

    #[test]
    fn test_unknown_service_id_is_error() {
        let err = "ipfs".parse::<ServiceId>().unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownService(ref s) if s == "ipfs"));
    }

    #[test]
    fn test_file_sample_accepts_string_counts() {
        let json = r#"{
            "rows": [
                {"headCid": "bafk1", "createdAt": "2026-10-18T10:00:00Z", "size": "2048",
                 "mimeType": "image/png", "name": "cat.png", "status": "Archived"},
                {"headCid": "bafk2", "size": 10}
            ],
            "totalCount": "12345"
        }"#;

        let sample: FileSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.total_count, 12345);
        assert_eq!(sample.rows.len(), 2);
        assert_eq!(sample.rows[0].size_bytes, 2048);
        assert!(sample.rows[0].is_archived());
        assert!(sample.rows[1].created_at.is_none());
        assert_eq!(sample.rows[1].size_bytes, 10);
    }

    #[test]
    fn test_network_stats_keeps_price_as_decimal_string() {
        let json = r#"{"total_blocks": "4200000", "transactions_today": 17, "coin_price": "0.0423918812"}"#;
        let stats: NetworkStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_blocks, Some(4_200_000));
        assert_eq!(stats.transactions_today, Some(17));
        assert_eq!(stats.coin_price.as_deref(), Some("0.0423918812"));
        assert!(stats.total_addresses.is_none());
    }

    #[test]
    fn test_display_status_serializes_snake_case() {
        let json = serde_json::to_string(&DisplayStatus::NotApplicable).unwrap();
        assert_eq!(json, "\"not_applicable\"");
    }

    #[test]
    fn test_bad_timestamp_only_drops_that_date() {
        let json = r#"{"rows": [
            {"headCid": "a", "createdAt": "2026-10-18T10:00:00Z"},
            {"headCid": "b", "createdAt": "not a date"},
            {"headCid": "c", "createdAt": 1760000000},
            {"headCid": "d", "createdAt": "2026-10-18T12:30:00.250+02:00"}
        ], "totalCount": 4}"#;

        let sample: FileSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.rows.len(), 4);
        assert!(sample.rows[0].created_at.is_some());
        assert!(sample.rows[1].created_at.is_none());
        assert!(sample.rows[2].created_at.is_none());
        assert_eq!(
            sample.rows[3].created_at.map(|t| t.to_rfc3339()),
            Some("2026-10-18T10:30:00.250+00:00".to_string())
        );
    }

    #[test]
    fn test_network_stats_block_time_and_price_change() {
        let json = r#"{"average_block_time": 6000.0, "coin_price": 0.0000001,
                       "coin_price_change_percentage": "-1.25"}"#;
        let stats: NetworkStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.average_block_time.as_deref(), Some("6000.0"));
        assert_eq!(stats.coin_price.as_deref(), Some("1e-7"));
        assert_eq!(stats.coin_price_change_percentage.as_deref(), Some("-1.25"));
    }

    #[test]
    fn test_consensus_metadata_accepts_string_sizes() {
        let json = r#"{"blockChainHistorySize": "5368709120", "consensusSpace": 2500000000000000000,
                       "networkNode": "autonomys"}"#;
        let metadata: ConsensusMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.history_size_bytes, Some(5_368_709_120));
        assert_eq!(metadata.consensus_space_bytes, Some(2_500_000_000_000_000_000));
    }
}
