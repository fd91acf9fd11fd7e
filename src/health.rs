//! Debounced per-service health tracking
//!
//! Each service keeps a record with an optional `down_since` timestamp. A
//! service that goes down is first shown as a warning and only escalates to
//! an error once it has stayed down for [`DOWNTIME_THRESHOLD`]. Any healthy,
//! loading or not-applicable observation ends the streak immediately.

use crate::telemetry::{DisplayStatus, ProbeResult, ServiceId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How long a service must stay down before it is shown as an error.
pub const DOWNTIME_THRESHOLD: TimeDelta = TimeDelta::minutes(15);

/// Mutable state for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealthRecord {
    pub display_status: DisplayStatus,
    pub down_since: Option<DateTime<Utc>>,
}

impl Default for ServiceHealthRecord {
    fn default() -> Self {
        Self {
            display_status: DisplayStatus::Loading,
            down_since: None,
        }
    }
}

/// Visual weight of the summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryTone {
    Neutral,
    Healthy,
    Warning,
}

/// Aggregate view across all tracked services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub healthy_count: usize,
    pub available_count: usize,
    pub unavailable_count: usize,
    pub tone: SummaryTone,
    pub message: String,
}

#[derive(Debug, Default, Clone)]
pub struct HealthTracker {
    records: BTreeMap<ServiceId, ServiceHealthRecord>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one probe observation and return the resulting display status.
    pub fn record_probe(
        &mut self,
        service: ServiceId,
        result: ProbeResult,
        now: DateTime<Utc>,
    ) -> DisplayStatus {
        let record = self.records.entry(service).or_default();
        let previous = record.display_status;

        record.display_status = match result {
            ProbeResult::Healthy => {
                record.down_since = None;
                DisplayStatus::Healthy
            }
            ProbeResult::Loading => {
                record.down_since = None;
                DisplayStatus::Loading
            }
            ProbeResult::NotApplicable => {
                record.down_since = None;
                DisplayStatus::NotApplicable
            }
            ProbeResult::Down => {
                let since = *record.down_since.get_or_insert(now);
                // Within a streak an error never drops back to a warning.
                if previous == DisplayStatus::Error || now - since >= DOWNTIME_THRESHOLD {
                    DisplayStatus::Error
                } else {
                    DisplayStatus::Warning
                }
            }
        };

        let current = record.display_status;
        match current {
            DisplayStatus::Error if previous != DisplayStatus::Error => {
                warn!("Service {} down for at least {} minutes", service, DOWNTIME_THRESHOLD.num_minutes());
            }
            DisplayStatus::Warning if previous != DisplayStatus::Warning => {
                info!("Service {} reported down", service);
            }
            _ => debug!("Service {} status {} -> {}", service, previous, current),
        }

        current
    }

    /// Show every listed service as loading at the start of a refresh cycle.
    ///
    /// Unlike a `Loading` probe result this keeps `down_since`, so a service
    /// that is down on consecutive cycles still escalates.
    pub fn begin_refresh(&mut self, services: &[ServiceId]) {
        for service in services {
            self.records.entry(*service).or_default().display_status = DisplayStatus::Loading;
        }
    }

    pub fn status(&self, service: ServiceId) -> Option<DisplayStatus> {
        self.records.get(&service).map(|r| r.display_status)
    }

    pub fn record(&self, service: ServiceId) -> Option<&ServiceHealthRecord> {
        self.records.get(&service)
    }

    pub fn statuses(&self) -> BTreeMap<ServiceId, DisplayStatus> {
        self.records
            .iter()
            .map(|(id, record)| (*id, record.display_status))
            .collect()
    }

    pub fn summarize(&self) -> HealthSummary {
        let tracked = self.records.len();
        let healthy_count = self.count(DisplayStatus::Healthy);
        let unavailable_count = self.count(DisplayStatus::NotApplicable);
        let available_count = tracked - unavailable_count;

        let (tone, message) = if available_count == 0 {
            (
                SummaryTone::Neutral,
                "No services available to monitor on this network.".to_string(),
            )
        } else if healthy_count == available_count {
            let message = if unavailable_count > 0 {
                format!(
                    "All {} available systems operational. {} service{} not available on this network.",
                    healthy_count,
                    unavailable_count,
                    if unavailable_count > 1 { "s" } else { "" }
                )
            } else {
                "All systems operational. Your data is being actively stored and proven.".to_string()
            };
            (SummaryTone::Healthy, message)
        } else if healthy_count >= degraded_floor(available_count) {
            (
                SummaryTone::Warning,
                format!(
                    "{}/{} systems healthy. Some services may have degraded performance.",
                    healthy_count, available_count
                ),
            )
        } else {
            (
                SummaryTone::Warning,
                format!(
                    "{}/{} systems healthy. Network may be experiencing issues.",
                    healthy_count, available_count
                ),
            )
        };

        HealthSummary {
            healthy_count,
            available_count,
            unavailable_count,
            tone,
            message,
        }
    }

    fn count(&self, status: DisplayStatus) -> usize {
        self.records
            .values()
            .filter(|r| r.display_status == status)
            .count()
    }
}

/// `ceil(0.6 * available)` in integer arithmetic.
fn degraded_floor(available: usize) -> usize {
    (available * 3).div_ceil(5)
}
