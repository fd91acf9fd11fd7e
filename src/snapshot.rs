//! Combined result of one refresh cycle, as handed to the renderer

use crate::aggregation::{SampleStats, UploadSeries};
use crate::amount::{
    format_amount, format_bytes, format_compact, format_product, format_ratio, format_scaled,
};
use crate::config::Network;
use crate::health::HealthSummary;
use crate::telemetry::{ChartPoint, ConsensusMetadata, DisplayStatus, NetworkStats, ServiceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Decimal places shown for the token price.
pub const PRICE_DECIMALS: usize = 4;

/// Tokens charged per GB stored, from the chain's transaction byte fee.
pub const STORAGE_TOKENS_PER_GB: &str = "335.54";

const PETABYTE: u64 = 1_000_000_000_000_000;

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Automatic,
    Manual,
}

/// Explorer headline numbers formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkOverview {
    pub total_blocks: Option<String>,
    pub total_transactions: Option<String>,
    pub total_addresses: Option<String>,
    pub transactions_today: Option<u64>,
    /// Seconds, one decimal
    pub average_block_time: Option<String>,
    /// `None` where the token has no market price
    pub price: Option<String>,
    /// Signed 24h change such as `+1.25%`, only alongside a price
    pub price_change_24h: Option<String>,
    /// Price of storing one GB at the current token price
    pub storage_cost_per_gb: Option<String>,
}

impl From<&NetworkStats> for NetworkOverview {
    fn from(stats: &NetworkStats) -> Self {
        let price = stats.coin_price.as_deref();

        Self {
            total_blocks: stats.total_blocks.map(format_compact),
            total_transactions: stats.total_transactions.map(format_compact),
            total_addresses: stats.total_addresses.map(format_compact),
            transactions_today: stats.transactions_today,
            average_block_time: stats
                .average_block_time
                .as_deref()
                .map(|ms| format_scaled(ms, -3, 1)),
            price: price.map(|p| format_amount(p, PRICE_DECIMALS)),
            price_change_24h: price
                .map(|_| format_price_change(stats.coin_price_change_percentage.as_deref())),
            storage_cost_per_gb: price.map(|p| format_product(STORAGE_TOKENS_PER_GB, p, 2)),
        }
    }
}

/// A missing change reads as no change.
fn format_price_change(change: Option<&str>) -> String {
    let formatted = format_amount(change.unwrap_or("0"), 2);
    if formatted.starts_with('-') {
        format!("{}%", formatted)
    } else {
        format!("+{}%", formatted)
    }
}

/// Chain-wide storage figures formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusOverview {
    pub archived_history: Option<String>,
    /// Farmer pledged space in PB, one decimal
    pub farmer_storage: Option<String>,
}

impl From<&ConsensusMetadata> for ConsensusOverview {
    fn from(metadata: &ConsensusMetadata) -> Self {
        Self {
            archived_history: metadata
                .history_size_bytes
                .filter(|size| *size > 0)
                .map(format_bytes),
            farmer_storage: metadata
                .consensus_space_bytes
                .filter(|space| *space > 0)
                .map(|space| format!("{} PB", format_ratio(space, PETABYTE, 1))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub cycle_id: Uuid,
    pub trigger: RefreshTrigger,
    pub network: Network,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub statuses: BTreeMap<ServiceId, DisplayStatus>,
    pub summary: HealthSummary,
    pub uploads: UploadSeries,
    pub sample_stats: Option<SampleStats>,
    pub overview: Option<NetworkOverview>,
    pub consensus: Option<ConsensusOverview>,
    /// Oldest first
    pub transactions: Vec<ChartPoint>,
}

impl DashboardSnapshot {
    pub fn status(&self, service: ServiceId) -> Option<DisplayStatus> {
        self.statuses.get(&service).copied()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_formats_without_floats() {
        let stats = NetworkStats {
            total_blocks: Some(4_218_337),
            total_transactions: Some(987),
            transactions_today: Some(12),
            average_block_time: Some("6012.5".to_string()),
            coin_price: Some("0.04239185".to_string()),
            coin_price_change_percentage: Some("3.456".to_string()),
            ..NetworkStats::default()
        };

        let overview = NetworkOverview::from(&stats);
        assert_eq!(overview.total_blocks.as_deref(), Some("4.22M"));
        assert_eq!(overview.total_transactions.as_deref(), Some("987"));
        assert!(overview.total_addresses.is_none());
        assert_eq!(overview.average_block_time.as_deref(), Some("6"));
        assert_eq!(overview.price.as_deref(), Some("0.0424"));
        assert_eq!(overview.price_change_24h.as_deref(), Some("+3.46%"));
        // 335.54 * 0.04239185 = 14.2242...
        assert_eq!(overview.storage_cost_per_gb.as_deref(), Some("14.22"));
    }

    #[test]
    fn test_price_in_exponent_form() {
        let stats: NetworkStats =
            serde_json::from_str(r#"{"coin_price": 0.0000001, "coin_price_change_percentage": -0.5}"#)
                .unwrap();

        let overview = NetworkOverview::from(&stats);
        assert_eq!(overview.price.as_deref(), Some("0"));
        assert_eq!(overview.price_change_24h.as_deref(), Some("-0.5%"));
        assert_eq!(overview.storage_cost_per_gb.as_deref(), Some("0"));
    }

    #[test]
    fn test_no_price_means_no_derived_figures() {
        let stats = NetworkStats {
            coin_price_change_percentage: Some("1.0".to_string()),
            ..NetworkStats::default()
        };

        let overview = NetworkOverview::from(&stats);
        assert!(overview.price.is_none());
        assert!(overview.price_change_24h.is_none());
        assert!(overview.storage_cost_per_gb.is_none());
        assert!(overview.average_block_time.is_none());
    }

    #[test]
    fn test_missing_price_change_reads_as_flat() {
        let stats = NetworkStats {
            coin_price: Some("1".to_string()),
            ..NetworkStats::default()
        };

        let overview = NetworkOverview::from(&stats);
        assert_eq!(overview.price_change_24h.as_deref(), Some("+0%"));
        assert_eq!(overview.storage_cost_per_gb.as_deref(), Some("335.54"));
    }

    #[test]
    fn test_consensus_overview() {
        let metadata = ConsensusMetadata {
            history_size_bytes: Some(5_368_709_120),
            consensus_space_bytes: Some(2_540_000_000_000_000),
        };

        let overview = ConsensusOverview::from(&metadata);
        assert_eq!(overview.archived_history.as_deref(), Some("5.37 GB"));
        assert_eq!(overview.farmer_storage.as_deref(), Some("2.5 PB"));

        let empty = ConsensusOverview::from(&ConsensusMetadata {
            history_size_bytes: Some(0),
            consensus_space_bytes: None,
        });
        assert!(empty.archived_history.is_none());
        assert!(empty.farmer_storage.is_none());
    }

    #[test]
    fn test_trigger_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RefreshTrigger::Automatic).unwrap(),
            "\"automatic\""
        );
    }
}
