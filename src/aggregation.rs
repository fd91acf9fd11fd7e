//! Upload aggregation over storage listings
//!
//! The storage listing is ordered by content identifier rather than by date,
//! so a network-wide page alone misses most recent uploads. The daily series
//! therefore merges the broad network sample with the caller's own files,
//! deduplicates by content identifier and buckets by local calendar date.

use crate::amount::{format_bytes, format_percent};
use crate::errors::Result;
use crate::telemetry::{ChartPoint, FileRecord, FileSample};
use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::HashSet;

/// Number of calendar days covered by the upload series.
pub const WINDOW_DAYS: usize = 14;

/// Number of explorer chart days kept before today's live count is appended.
const CHART_HISTORY_DAYS: usize = WINDOW_DAYS - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub count: u64,
}

impl DailyBucket {
    /// `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySeries {
    /// Oldest first, the last bucket is today.
    pub buckets: [DailyBucket; WINDOW_DAYS],
    pub total_in_window: u64,
    /// Provider's own total, passed through untouched.
    pub total_count_hint: u64,
}

impl DailySeries {
    pub fn headline(&self) -> String {
        format!(
            "{} uploads in last {} days ({} total on network)",
            self.total_in_window, WINDOW_DAYS, self.total_count_hint
        )
    }
}

/// Daily series, or the reason it could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadSeries {
    Ready(DailySeries),
    Unavailable { reason: String },
}

impl UploadSeries {
    /// Both listings are required; a failure of either yields `Unavailable`
    /// rather than a series built from half the data.
    pub fn from_sources<Tz: TimeZone>(
        broad: Result<FileSample>,
        scoped: Result<FileSample>,
        now: &DateTime<Tz>,
    ) -> Self {
        match (broad, scoped) {
            (Ok(broad), Ok(scoped)) => UploadSeries::Ready(build_daily_series(
                &broad.rows,
                &scoped.rows,
                now,
                broad.total_count,
            )),
            (Err(e), _) | (_, Err(e)) => UploadSeries::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        UploadSeries::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn series(&self) -> Option<&DailySeries> {
        match self {
            UploadSeries::Ready(series) => Some(series),
            UploadSeries::Unavailable { .. } => None,
        }
    }
}

/// All of `broad`, followed by the records of `scoped` whose content id has
/// not been seen yet. First occurrence wins.
pub fn merge_records<'a>(broad: &'a [FileRecord], scoped: &'a [FileRecord]) -> Vec<&'a FileRecord> {
    let mut seen: HashSet<&str> = broad.iter().map(|r| r.content_id.as_str()).collect();
    let mut merged: Vec<&FileRecord> = broad.iter().collect();

    for record in scoped {
        if seen.insert(record.content_id.as_str()) {
            merged.push(record);
        }
    }

    merged
}

/// Count uploads per local calendar day over the [`WINDOW_DAYS`] days ending
/// at `now`. The time zone of `now` decides what "local" means. Records
/// without a timestamp or outside the window are skipped.
pub fn build_daily_series<Tz: TimeZone>(
    broad: &[FileRecord],
    scoped: &[FileRecord],
    now: &DateTime<Tz>,
    total_count_hint: u64,
) -> DailySeries {
    let today = now.date_naive();
    let tz = now.timezone();

    let mut buckets: [DailyBucket; WINDOW_DAYS] = std::array::from_fn(|i| DailyBucket {
        date: today - Days::new((WINDOW_DAYS - 1 - i) as u64),
        count: 0,
    });

    for record in merge_records(broad, scoped) {
        let Some(created_at) = record.created_at else {
            continue;
        };

        let local_date = created_at.with_timezone(&tz).date_naive();
        let age = (today - local_date).num_days();
        if (0..WINDOW_DAYS as i64).contains(&age) {
            buckets[WINDOW_DAYS - 1 - age as usize].count += 1;
        }
    }

    let total_in_window = buckets.iter().map(|b| b.count).sum();

    DailySeries {
        buckets,
        total_in_window,
        total_count_hint,
    }
}

/// Transaction chart: the explorer's most recent days (newest first on the
/// wire) reversed to oldest first, with today's live count appended when the
/// chart lags behind.
pub fn build_transaction_series(
    points: &[ChartPoint],
    today_count: Option<u64>,
    today: NaiveDate,
) -> Vec<ChartPoint> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut days: Vec<ChartPoint> = points.iter().take(CHART_HISTORY_DAYS).cloned().collect();
    days.reverse();

    if days.last().map(|p| p.date) != Some(today) {
        if let Some(count) = today_count {
            days.push(ChartPoint { date: today, count });
        }
    }

    days
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargestFile {
    pub name: String,
    pub size_bytes: u64,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopMimeType {
    pub mime_type: String,
    /// Subtype in upper case, e.g. `PNG`
    pub label: String,
    pub share: String,
}

/// Storage statistics estimated from the broad sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleStats {
    pub sample_size: usize,
    pub total_count: u64,
    pub average_size: String,
    pub largest_file: LargestFile,
    pub archive_rate: String,
    pub top_mime_type: TopMimeType,
    pub estimated_total_storage: String,
}

impl SampleStats {
    /// `None` for an empty sample.
    pub fn from_records(records: &[FileRecord], total_count: u64) -> Option<Self> {
        let sample_size = records.len();
        if sample_size == 0 {
            return None;
        }
        let n = sample_size as u128;

        let total_bytes: u128 = records.iter().map(|r| u128::from(r.size_bytes)).sum();
        let average = div_round(total_bytes, n);
        let estimated_total = div_round(total_bytes * u128::from(total_count), n);

        // First file wins ties, matching listing order.
        let largest = records
            .iter()
            .fold(None::<&FileRecord>, |best, r| match best {
                Some(b) if b.size_bytes >= r.size_bytes => Some(b),
                _ => Some(r),
            })?;

        let archived = records.iter().filter(|r| r.is_archived()).count();

        let mut mime_counts: Vec<(&str, usize)> = Vec::new();
        for record in records {
            let mime = record.mime_type.as_deref().unwrap_or("unknown");
            match mime_counts.iter_mut().find(|(m, _)| *m == mime) {
                Some((_, count)) => *count += 1,
                None => mime_counts.push((mime, 1)),
            }
        }
        let (top_mime, top_count) = mime_counts
            .iter()
            .fold(("unknown", 0), |best, &(m, c)| if c > best.1 { (m, c) } else { best });

        Some(Self {
            sample_size,
            total_count,
            average_size: format_bytes(saturate(average)),
            largest_file: LargestFile {
                name: largest.name.clone().unwrap_or_else(|| "Unnamed".to_string()),
                size_bytes: largest.size_bytes,
                size: format_bytes(largest.size_bytes),
            },
            archive_rate: format!("{}%", format_percent(archived as u64, sample_size as u64, 1)),
            top_mime_type: TopMimeType {
                mime_type: top_mime.to_string(),
                label: top_mime
                    .split_once('/')
                    .map_or(top_mime, |(_, sub)| sub)
                    .to_uppercase(),
                share: format!("{}%", format_percent(top_count as u64, sample_size as u64, 0)),
            },
            estimated_total_storage: format_bytes(saturate(estimated_total)),
        })
    }
}

fn div_round(numerator: u128, denominator: u128) -> u128 {
    (2 * numerator + denominator) / (2 * denominator)
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
