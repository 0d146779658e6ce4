//! Trial reports.
//!
//! A [`TrialReport`] is an immutable snapshot of a trial's zone times. The
//! engine builds one when a trial stops (or on demand, live, while it runs);
//! the presentation layer formats, charts and exports it.

mod export;
mod format;

pub use export::{default_file_name, export, export_to_path, save_to_dir, ExportFormat};
pub use format::format_clock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trial::StopReason;
use crate::zone::{Zone, ZoneMap};

/// Smallest effective duration used as a percentage denominator.
pub const MIN_EFFECTIVE_DURATION_SECS: f64 = 0.001;

/// Time spent in one zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneShare {
    pub seconds: f64,
    /// Percentage of the effective duration.
    pub percent: f64,
}

/// Snapshot of a trial's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialReport {
    animal_id: String,
    timestamp: DateTime<Utc>,
    scheduled_duration_secs: u64,
    effective_duration_secs: f64,
    per_zone: ZoneMap<ZoneShare>,
    /// `None` for a live report of a running trial.
    stop_reason: Option<StopReason>,
}

impl TrialReport {
    pub(crate) fn build(
        animal_id: &str,
        timestamp: DateTime<Utc>,
        scheduled_duration_secs: u64,
        effective_duration_secs: f64,
        zone_seconds: &ZoneMap<f64>,
        stop_reason: Option<StopReason>,
    ) -> Self {
        let effective = effective_duration_secs.max(MIN_EFFECTIVE_DURATION_SECS);
        let per_zone = ZoneMap::from_fn(|zone| {
            let seconds = zone_seconds[zone];
            ZoneShare {
                seconds,
                percent: 100.0 * seconds / effective,
            }
        });
        Self {
            animal_id: animal_id.to_string(),
            timestamp,
            scheduled_duration_secs,
            effective_duration_secs: effective,
            per_zone,
            stop_reason,
        }
    }

    pub fn animal_id(&self) -> &str {
        &self.animal_id
    }

    /// When the report was taken.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn scheduled_duration_secs(&self) -> u64 {
        self.scheduled_duration_secs
    }

    /// Percentage denominator, never below [`MIN_EFFECTIVE_DURATION_SECS`].
    pub fn effective_duration_secs(&self) -> f64 {
        self.effective_duration_secs
    }

    pub fn zone(&self, zone: Zone) -> ZoneShare {
        self.per_zone[zone]
    }

    pub fn per_zone(&self) -> &ZoneMap<ZoneShare> {
        &self.per_zone
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// True for a report of a trial that is still running.
    pub fn is_live(&self) -> bool {
        self.stop_reason.is_none()
    }

    pub fn total_zone_seconds(&self) -> f64 {
        self.per_zone.iter().map(|(_, share)| share.seconds).sum()
    }

    /// Pie-chart slices for zones with recorded time.
    ///
    /// Shares are relative to the covered time, so they sum to 100 even when
    /// part of the trial had no zone held. Empty when nothing was recorded.
    pub fn distribution(&self) -> Vec<ChartSlice> {
        let total = self.total_zone_seconds();
        if total <= 0.0 {
            return Vec::new();
        }
        self.per_zone
            .iter()
            .filter(|(_, share)| share.seconds > 0.0)
            .map(|(zone, share)| ChartSlice {
                zone,
                label: zone.label(),
                color: zone.color(),
                seconds: share.seconds,
                share_pct: 100.0 * share.seconds / total,
            })
            .collect()
    }
}

/// One wedge of the zone distribution chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub zone: Zone,
    pub label: &'static str,
    pub color: &'static str,
    pub seconds: f64,
    pub share_pct: f64,
}
