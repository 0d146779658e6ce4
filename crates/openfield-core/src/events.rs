use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::TrialReport;
use crate::trial::StopReason;
use crate::zone::Zone;

/// Every state change of the trial engine produces an Event.
/// A `None` in place of an event means the call changed nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TrialStarted {
        animal_id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ZoneEntered {
        zone: Zone,
        at: DateTime<Utc>,
    },
    /// A press was released; `seconds` is what it added to the zone.
    ZoneExited {
        zone: Zone,
        seconds: f64,
        at: DateTime<Utc>,
    },
    /// Pressing a zone while another was held.
    ZoneSwitched {
        from: Zone,
        to: Zone,
        from_seconds: f64,
        at: DateTime<Utc>,
    },
    TrialStopped {
        reason: StopReason,
        effective_duration_secs: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Stop event for a finished trial's report. `None` for live reports.
    pub fn trial_stopped(report: &TrialReport) -> Option<Event> {
        Some(Event::TrialStopped {
            reason: report.stop_reason()?,
            effective_duration_secs: report.effective_duration_secs(),
            at: report.timestamp(),
        })
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::TrialStarted { at, .. }
            | Event::ZoneEntered { at, .. }
            | Event::ZoneExited { at, .. }
            | Event::ZoneSwitched { at, .. }
            | Event::TrialStopped { at, .. } => *at,
        }
    }
}
