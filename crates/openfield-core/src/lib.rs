//! # Open Field Core Library
//!
//! This library provides the core logic for timing open field tests: an
//! observer holds one of three zone controls (corner, lateral, center) while
//! the animal is in that zone, and the library accumulates per-zone time over
//! a fixed-duration trial and produces the trial report.
//!
//! ## Architecture
//!
//! - **Trial Engine**: A clock-driven state machine that requires the caller
//!   to deliver input events and periodically invoke `tick()`
//! - **Clock**: Injectable time source, so trials can be replayed and tested
//!   without real waiting
//! - **Reports**: Immutable snapshots with text and JSON export
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TrialTimer`]: Core trial state machine
//! - [`TrialReport`]: Per-zone seconds and percentages of one trial
//! - [`Clock`]: Time source trait ([`SystemClock`], [`ManualClock`])
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod report;
pub mod storage;
pub mod trial;
pub mod zone;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, ExportError, TimerError, ValidationError};
pub use events::Event;
pub use report::{ChartSlice, ExportFormat, TrialReport, ZoneShare};
pub use storage::Config;
pub use trial::{DisplaySnapshot, StopReason, TrialConfig, TrialState, TrialTimer};
pub use zone::{ParseZoneError, Zone, ZoneMap, ZoneState};
