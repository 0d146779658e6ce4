mod config;
mod engine;

pub use config::TrialConfig;
pub use engine::{DisplaySnapshot, StopReason, TrialState, TrialTimer};
