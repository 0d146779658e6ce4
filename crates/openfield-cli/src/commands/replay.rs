//! Scripted trials.
//!
//! A script lists observer input with its time offset from trial start:
//!
//! ```text
//! # seconds  action   [zone]
//! 0.0        press    corner
//! 4.0        release  corner
//! 4.0        press    center
//! 10.0       stop
//! ```
//!
//! Offsets must not decrease. Ticks are synthesized on the configured
//! interval between entries, so a trial without `stop` runs to expiry.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use openfield_core::{Config, Event, ManualClock, StopReason, TrialTimer, Zone};

use super::{print_report, OutputArgs};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Script file ("-" for stdin)
    pub script: PathBuf,
    /// Animal identifier
    #[arg(long)]
    pub animal_id: String,
    /// Trial duration in seconds (defaults to the configured one)
    #[arg(long)]
    pub duration: Option<String>,
    /// Print each engine event as a JSON line before the report
    #[arg(long)]
    pub events: bool,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Press(Zone),
    Release(Zone),
    Report,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Step {
    at_secs: f64,
    action: Action,
}

fn parse_script(source: &str) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    let mut last = 0.0_f64;
    for (idx, raw) in source.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();
        let at_secs: f64 = words
            .next()
            .and_then(|w| w.parse().ok())
            .filter(|t: &f64| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| format!("line {lineno}: expected a time offset in seconds"))?;
        if at_secs < last {
            return Err(format!(
                "line {lineno}: time {at_secs} goes back before {last}"
            ));
        }
        last = at_secs;

        let verb = words
            .next()
            .ok_or_else(|| format!("line {lineno}: missing action"))?
            .to_ascii_lowercase();
        let zone = |word: Option<&str>| -> Result<Zone, String> {
            word.ok_or_else(|| format!("line {lineno}: '{verb}' needs a zone"))?
                .parse::<Zone>()
                .map_err(|e| format!("line {lineno}: {e}"))
        };
        let action = match verb.as_str() {
            "press" => Action::Press(zone(words.next())?),
            "release" => Action::Release(zone(words.next())?),
            "report" => Action::Report,
            "stop" => Action::Stop,
            other => return Err(format!("line {lineno}: unknown action '{other}'")),
        };
        if let Some(extra) = words.next() {
            return Err(format!("line {lineno}: unexpected '{extra}'"));
        }
        steps.push(Step { at_secs, action });
    }
    Ok(steps)
}

/// Drives a timer through `steps`, ticking every `tick_ms`.
struct Replayer {
    clock: ManualClock,
    timer: TrialTimer<ManualClock>,
    tick_ms: u64,
    next_tick_ms: u64,
    events: bool,
}

impl Replayer {
    fn emit(&self, event: Option<Event>) -> Result<(), Box<dyn std::error::Error>> {
        if let (true, Some(event)) = (self.events, event) {
            println!("{}", serde_json::to_string(&event)?);
        }
        Ok(())
    }

    /// Ticks strictly before `until`: input at an instant precedes its tick.
    fn tick_until(&mut self, until: f64) -> Result<(), Box<dyn std::error::Error>> {
        while self.timer.is_running() && (self.next_tick_ms as f64 / 1000.0) < until {
            self.clock.set_secs(self.next_tick_ms as f64 / 1000.0);
            let snapshot = self.timer.tick();
            if let Some(report) = snapshot.report.as_ref() {
                self.emit(Event::trial_stopped(report))?;
            }
            self.next_tick_ms += self.tick_ms;
        }
        Ok(())
    }

    /// With no input left, ticks between here and the deadline change
    /// nothing, so skip to the first tick at or after it.
    fn tick_to_end(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(config) = self.timer.config() else {
            return Ok(());
        };
        let tick_ms = self.tick_ms.max(1);
        let deadline_ms = config.duration_secs().saturating_mul(1000);
        let first_after = deadline_ms.div_ceil(tick_ms).saturating_mul(tick_ms);
        self.next_tick_ms = self.next_tick_ms.max(first_after);
        self.tick_until(f64::INFINITY)
    }

    fn apply(&mut self, step: Step, json: bool) -> Result<(), Box<dyn std::error::Error>> {
        self.tick_until(step.at_secs)?;
        self.clock.set_secs(step.at_secs);
        if !self.timer.is_running() {
            tracing::warn!(at = step.at_secs, action = ?step.action, "trial already ended; input ignored");
            return Ok(());
        }
        match step.action {
            Action::Press(zone) => {
                let event = self.timer.press(zone);
                self.emit(event)?;
            }
            Action::Release(zone) => {
                let event = self.timer.release(zone);
                self.emit(event)?;
            }
            Action::Report => print_report(&self.timer.report()?, json)?,
            Action::Stop => {
                let report = self.timer.stop(StopReason::Manual)?;
                self.emit(Event::trial_stopped(&report))?;
            }
        }
        Ok(())
    }
}

pub fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let source = if args.script.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(&args.script)
            .map_err(|e| format!("cannot read {}: {e}", args.script.display()))?
    };
    let steps = parse_script(&source)?;
    let duration = args
        .duration
        .clone()
        .unwrap_or_else(|| config.trial.default_duration_secs.to_string());

    let clock = ManualClock::new(Utc::now());
    let mut replayer = Replayer {
        timer: TrialTimer::new(clock.clone()),
        clock,
        tick_ms: config.trial.tick_interval_ms,
        next_tick_ms: config.trial.tick_interval_ms,
        events: args.events,
    };
    let started = replayer.timer.start(&args.animal_id, &duration)?;
    replayer.emit(started)?;

    for step in steps {
        replayer.apply(step, args.output.json)?;
    }
    replayer.tick_to_end()?;

    let report = replayer.timer.report()?;
    args.output.emit(&report, &config)
}
