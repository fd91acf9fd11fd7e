//! Network Telemetry Library
//!
//! This library probes the services behind a storage network, tracks their
//! health with downtime hysteresis, and aggregates storage listings and
//! explorer statistics into a dashboard snapshot on every refresh cycle.

pub mod aggregation;
pub mod amount;
pub mod config;
pub mod errors;
pub mod health;
pub mod orchestrator;
pub mod snapshot;
pub mod telemetry;
pub mod transport;

pub use aggregation::{DailySeries, SampleStats, UploadSeries};
pub use amount::{format_amount, format_balance};
pub use config::{Config, Network, NetworkProfile};
pub use errors::{Result, TelemetryError};
pub use health::{HealthSummary, HealthTracker};
pub use orchestrator::{Orchestrator, RefreshHandle};
pub use snapshot::{ConsensusOverview, DashboardSnapshot, NetworkOverview, RefreshTrigger};
pub use telemetry::{ConsensusMetadata, DisplayStatus, ProbeResult, ServiceId, SystemClock};
pub use transport::{HttpTransport, InstrumentedProber};
