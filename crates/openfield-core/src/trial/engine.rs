//! Trial engine implementation.
//!
//! The trial engine is a clock-driven state machine. It does not use
//! internal threads - the host delivers input events one at a time and calls
//! `tick()` periodically (every 200ms by default) while a trial runs.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Stopped -> Running -> ...
//! ```
//!
//! `Stopped` keeps the final report until the next `start()`.
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = TrialTimer::new(SystemClock::new());
//! timer.start("A1", "300")?;
//! timer.press(Zone::Corner);
//! // In a loop:
//! let snapshot = timer.tick(); // snapshot.auto_stopped once time is up
//! ```
//!
//! A host that shares the timer across threads must wrap the whole timer in
//! one mutex and hold it for each call.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::TrialConfig;
use crate::clock::{seconds_between, Clock, SystemClock};
use crate::error::{TimerError, ValidationError};
use crate::events::Event;
use crate::report::TrialReport;
use crate::zone::{Zone, ZoneMap, ZoneState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Idle,
    Running,
    Stopped,
}

/// Why a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The observer stopped the trial.
    Manual,
    /// The scheduled duration ran out on a tick.
    AutoExpired,
}

impl StopReason {
    pub fn from_manual(manual: bool) -> Self {
        if manual {
            StopReason::Manual
        } else {
            StopReason::AutoExpired
        }
    }

    /// Whether the presentation layer should confirm the end of the trial
    /// to the observer. Automatic expiry is silent.
    pub fn acknowledge(self) -> bool {
        self == StopReason::Manual
    }
}

/// What the display shows between ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub state: TrialState,
    pub remaining_secs: f64,
    /// Stored time plus the in-progress press, if any.
    pub zone_secs: ZoneMap<f64>,
    pub active_zone: Option<Zone>,
    /// Set only on the tick that ended the trial.
    pub auto_stopped: bool,
    /// Final report, present when `auto_stopped` is set.
    pub report: Option<TrialReport>,
}

/// Bookkeeping of the current (or most recent) trial.
#[derive(Debug, Clone)]
struct ActiveTrial {
    config: TrialConfig,
    started_at: DateTime<Utc>,
    /// Latest clock reading seen during the trial. Never before `started_at`.
    latest: DateTime<Utc>,
    zones: ZoneMap<ZoneState>,
}

impl ActiveTrial {
    fn new(config: TrialConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            config,
            started_at,
            latest: started_at,
            zones: ZoneMap::default(),
        }
    }

    fn scheduled_secs(&self) -> f64 {
        self.config.duration_secs() as f64
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.started_at, now).max(0.0)
    }

    /// `now`, or the latest earlier reading if the clock went back.
    fn seen(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.max(self.latest)
    }

    /// Records a clock reading. Returns the time to use for it and whether
    /// the clock had gone back.
    fn observe(&mut self, now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        if now < self.latest {
            (self.latest, true)
        } else {
            self.latest = now;
            (now, false)
        }
    }

    /// Zone time only counts inside `[started_at, started_at + scheduled]`.
    fn clip(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let deadline = i64::try_from(self.config.duration_secs())
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| self.started_at.checked_add_signed(d));
        let now = now.max(self.started_at);
        match deadline {
            Some(deadline) if now > deadline => deadline,
            _ => now,
        }
    }

    fn active_zone(&self) -> Option<Zone> {
        self.zones
            .iter()
            .find(|(_, state)| state.is_active())
            .map(|(zone, _)| zone)
    }

    /// Banks the open press of `zone`, returning the seconds it added.
    fn close(&mut self, zone: Zone, now: DateTime<Utc>) -> Option<f64> {
        let at = self.clip(now);
        let state = self.zones.get_mut(zone);
        let started = state.press_started_at()?;
        let seconds = seconds_between(started, at).max(0.0);
        state.deactivate(seconds);
        Some(seconds)
    }

    fn live_zone_secs(&self, now: DateTime<Utc>) -> ZoneMap<f64> {
        let at = self.clip(self.seen(now));
        ZoneMap::from_fn(|zone| {
            let state = &self.zones[zone];
            let open = state
                .press_started_at()
                .map(|started| seconds_between(started, at).max(0.0))
                .unwrap_or(0.0);
            state.accumulated_seconds() + open
        })
    }

    fn effective_secs(&self, now: DateTime<Utc>) -> f64 {
        self.elapsed_secs(self.seen(now)).min(self.scheduled_secs())
    }
}

/// Open field trial timer.
///
/// Tracks one trial at a time: elapsed and remaining time, which single zone
/// is held, and the time accumulated per zone. Reads time only from its
/// [`Clock`].
#[derive(Debug, Clone)]
pub struct TrialTimer<C: Clock = SystemClock> {
    clock: C,
    state: TrialState,
    trial: Option<ActiveTrial>,
    last_report: Option<TrialReport>,
    clock_anomalies: u64,
}

impl TrialTimer<SystemClock> {
    /// Timer on the system clock.
    pub fn system() -> Self {
        Self::new(SystemClock::new())
    }
}

impl<C: Clock> TrialTimer<C> {
    /// Create an idle timer reading time from `clock`.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: TrialState::Idle,
            trial: None,
            last_report: None,
            clock_anomalies: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TrialState::Running
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Config of the current or most recent trial.
    pub fn config(&self) -> Option<&TrialConfig> {
        self.trial.as_ref().map(|t| &t.config)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.trial.as_ref().map(|t| t.started_at)
    }

    pub fn active_zone(&self) -> Option<Zone> {
        self.trial.as_ref().and_then(ActiveTrial::active_zone)
    }

    pub fn zone_state(&self, zone: Zone) -> Option<&ZoneState> {
        self.trial.as_ref().map(|t| &t.zones[zone])
    }

    /// Report of the last stopped trial, cleared by `start()`.
    pub fn last_report(&self) -> Option<&TrialReport> {
        self.last_report.as_ref()
    }

    /// Number of clock readings during a trial that were earlier than a
    /// previous one. Each was treated as the previous reading, so the time
    /// it would have removed counts as zero.
    pub fn clock_anomalies(&self) -> u64 {
        self.clock_anomalies
    }

    /// Seconds left in the scheduled window, never negative.
    pub fn remaining_secs(&self) -> f64 {
        match (self.state, &self.trial, &self.last_report) {
            (TrialState::Running, Some(trial), _) => {
                let now = trial.seen(self.clock.now());
                (trial.scheduled_secs() - trial.elapsed_secs(now)).max(0.0)
            }
            (TrialState::Stopped, _, Some(report)) => {
                (report.scheduled_duration_secs() as f64 - report.effective_duration_secs())
                    .max(0.0)
            }
            _ => 0.0,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a trial from raw observer input.
    ///
    /// Returns `Ok(None)` without looking at the input if a trial is
    /// already running. Invalid input leaves the timer untouched.
    pub fn start(
        &mut self,
        animal_id: &str,
        duration_secs: &str,
    ) -> Result<Option<Event>, ValidationError> {
        if self.is_running() {
            return Ok(None);
        }
        let config = TrialConfig::parse(animal_id, duration_secs)?;
        Ok(self.start_trial(config))
    }

    /// Start a trial with an already validated config.
    pub fn start_trial(&mut self, config: TrialConfig) -> Option<Event> {
        if self.is_running() {
            return None;
        }
        let now = self.clock.now();
        tracing::info!(
            animal_id = config.animal_id(),
            duration_secs = config.duration_secs(),
            "trial started"
        );
        let event = Event::TrialStarted {
            animal_id: config.animal_id().to_string(),
            duration_secs: config.duration_secs(),
            at: now,
        };
        self.trial = Some(ActiveTrial::new(config, now));
        self.last_report = None;
        self.state = TrialState::Running;
        Some(event)
    }

    /// Mark `zone` as the zone the animal is in.
    ///
    /// Any other held zone is released first; pressing the held zone again
    /// does nothing.
    pub fn press(&mut self, zone: Zone) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        let now = self.observe_now()?;
        let trial = self.trial.as_mut()?;
        let previous = trial.active_zone();
        if previous == Some(zone) {
            return None;
        }

        let switched = match previous {
            Some(from) => Some((from, trial.close(from, now)?)),
            None => None,
        };
        let at = trial.clip(now);
        trial.zones.get_mut(zone).activate(at);

        match switched {
            Some((from, from_seconds)) => {
                tracing::debug!(%from, to = %zone, "zone switched");
                Some(Event::ZoneSwitched {
                    from,
                    to: zone,
                    from_seconds,
                    at: now,
                })
            }
            None => {
                tracing::debug!(%zone, "zone entered");
                Some(Event::ZoneEntered { zone, at: now })
            }
        }
    }

    /// Stop timing `zone`. Ignored unless `zone` is the held zone.
    pub fn release(&mut self, zone: Zone) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        if self.active_zone() != Some(zone) {
            return None;
        }
        let now = self.observe_now()?;
        let seconds = self.trial.as_mut()?.close(zone, now)?;
        tracing::debug!(%zone, seconds, "zone exited");
        Some(Event::ZoneExited {
            zone,
            seconds,
            at: now,
        })
    }

    /// Release whichever zone is held.
    pub fn release_active(&mut self) -> Option<Event> {
        let zone = self.active_zone()?;
        self.release(zone)
    }

    /// Periodic update. Ends the trial once the scheduled time is used up.
    pub fn tick(&mut self) -> DisplaySnapshot {
        if !self.is_running() {
            return self.frozen_snapshot();
        }
        let Some(now) = self.observe_now() else {
            return self.frozen_snapshot();
        };
        let Some(trial) = self.trial.as_ref() else {
            return self.frozen_snapshot();
        };

        let remaining = trial.scheduled_secs() - trial.elapsed_secs(now);
        if remaining <= 0.0 {
            let report = self.finish(StopReason::AutoExpired, now);
            let mut snapshot = self.frozen_snapshot();
            snapshot.remaining_secs = 0.0;
            snapshot.auto_stopped = true;
            snapshot.report = Some(report);
            return snapshot;
        }

        DisplaySnapshot {
            state: self.state,
            remaining_secs: remaining,
            zone_secs: trial.live_zone_secs(now),
            active_zone: trial.active_zone(),
            auto_stopped: false,
            report: None,
        }
    }

    /// End the running trial and build its report.
    ///
    /// Any held zone is released first. When no trial is running, returns
    /// the previous report again, or [`TimerError::NotRunning`] if there is
    /// none.
    pub fn stop(&mut self, reason: StopReason) -> Result<TrialReport, TimerError> {
        if !self.is_running() {
            return self.last_report.clone().ok_or(TimerError::NotRunning);
        }
        let now = self.observe_now().ok_or(TimerError::NotRunning)?;
        Ok(self.finish(reason, now))
    }

    /// `stop` keyed by a manual flag, as wired to a stop control.
    pub fn stop_manual(&mut self, manual: bool) -> Result<TrialReport, TimerError> {
        self.stop(StopReason::from_manual(manual))
    }

    /// Report of the running trial (live, without stopping it) or of the
    /// last stopped one.
    pub fn report(&self) -> Result<TrialReport, TimerError> {
        match (self.state, &self.trial) {
            (TrialState::Running, Some(trial)) => {
                let now = trial.seen(self.clock.now());
                Ok(TrialReport::build(
                    trial.config.animal_id(),
                    now,
                    trial.config.duration_secs(),
                    trial.effective_secs(now),
                    &trial.live_zone_secs(now),
                    None,
                ))
            }
            _ => self
                .last_report
                .clone()
                .ok_or(TimerError::NoActiveOrCompletedTrial),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Reads the clock for the running trial, holding time at the latest
    /// reading if the clock went back.
    fn observe_now(&mut self) -> Option<DateTime<Utc>> {
        let raw = self.clock.now();
        let (now, went_back) = self.trial.as_mut()?.observe(raw);
        if went_back {
            self.clock_anomalies += 1;
            tracing::debug!(
                behind_secs = seconds_between(raw, now),
                "clock went back during trial; holding at latest reading"
            );
        }
        Some(now)
    }

    fn finish(&mut self, reason: StopReason, now: DateTime<Utc>) -> TrialReport {
        let report = match self.trial.as_mut() {
            Some(trial) => {
                if let Some(zone) = trial.active_zone() {
                    trial.close(zone, now);
                }
                let zone_secs = ZoneMap::from_fn(|z| trial.zones[z].accumulated_seconds());
                TrialReport::build(
                    trial.config.animal_id(),
                    now,
                    trial.config.duration_secs(),
                    trial.effective_secs(now),
                    &zone_secs,
                    Some(reason),
                )
            }
            None => TrialReport::build("", now, 0, 0.0, &ZoneMap::default(), Some(reason)),
        };

        self.state = TrialState::Stopped;
        self.last_report = Some(report.clone());
        tracing::info!(
            animal_id = report.animal_id(),
            ?reason,
            effective_secs = report.effective_duration_secs(),
            "trial stopped"
        );
        report
    }

    fn frozen_snapshot(&self) -> DisplaySnapshot {
        let zone_secs = match &self.last_report {
            Some(report) => ZoneMap::from_fn(|z| report.zone(z).seconds),
            None => ZoneMap::default(),
        };
        DisplaySnapshot {
            state: self.state,
            remaining_secs: self.remaining_secs(),
            zone_secs,
            active_zone: None,
            auto_stopped: false,
            report: None,
        }
    }
}
