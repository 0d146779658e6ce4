//! Time sources for the trial engine.
//!
//! The engine never reads the system clock directly; every timestamp comes
//! from a [`Clock`] handed in by the host. Production code uses
//! [`SystemClock`], tests and scripted replays use [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for the trial engine.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Wall-clock time that never runs backwards.
///
/// Reads the wall clock once at construction and advances it with
/// [`Instant`], so NTP adjustments during a trial do not skew durations.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Utc::now(),
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.anchor.elapsed()).unwrap_or(Duration::zero());
        self.anchor_wall + elapsed
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: DateTime<Utc>,
    offset_us: Arc<AtomicI64>,
}

impl ManualClock {
    /// Clock frozen at `base` until advanced.
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            offset_us: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Clock starting at the Unix epoch.
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Moves time forward (or backward, for a negative step) by `secs`.
    pub fn advance_secs(&self, secs: f64) {
        self.offset_us
            .fetch_add(secs_to_us(secs), Ordering::SeqCst);
    }

    /// Sets time to `base + secs`.
    pub fn set_secs(&self, secs: f64) {
        self.offset_us.store(secs_to_us(secs), Ordering::SeqCst);
    }

    /// Seconds since `base`.
    pub fn elapsed_secs(&self) -> f64 {
        self.offset_us.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + Duration::microseconds(self.offset_us.load(Ordering::SeqCst))
    }
}

fn secs_to_us(secs: f64) -> i64 {
    (secs * 1_000_000.0).round() as i64
}

/// Signed seconds from `from` to `to`.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
