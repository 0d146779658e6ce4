use std::io::{BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use clap::Args;
use openfield_core::report::format_clock;
use openfield_core::{Config, DisplaySnapshot, StopReason, TrialReport, TrialTimer, Zone};

use super::OutputArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Animal identifier
    #[arg(long)]
    pub animal_id: String,
    /// Trial duration in seconds (defaults to the configured one)
    #[arg(long)]
    pub duration: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

/// One line of observer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Press(Zone),
    Release,
    Report,
    Stop,
    Help,
}

const HELP: &str = "zones: c/corner, l/lateral, m/center  |  x/release  r/report  s/stop  q/quit  ?/help";

fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "" => None,
        "x" | "release" => Some(Command::Release),
        "r" | "report" => Some(Command::Report),
        "s" | "stop" | "q" | "quit" => Some(Command::Stop),
        "?" | "h" | "help" => Some(Command::Help),
        other => other.parse::<Zone>().ok().map(Command::Press),
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let duration = args
        .duration
        .clone()
        .unwrap_or_else(|| config.trial.default_duration_secs.to_string());

    let mut timer = TrialTimer::system();
    timer.start(&args.animal_id, &duration)?;
    eprintln!("trial for {} started ({duration} s)", args.animal_id.trim());
    eprintln!("{HELP}");

    // Stdin is read on its own thread; the timer is only touched here.
    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let tick = Duration::from_millis(config.trial.tick_interval_ms);
    let report = loop {
        match rx.recv_timeout(tick) {
            Ok(line) => {
                if let Some(report) = handle_line(&mut timer, &line)? {
                    break report;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("input closed; stopping trial");
                break timer.stop(StopReason::Manual)?;
            }
        }

        let snapshot = timer.tick();
        if snapshot.auto_stopped {
            if let Some(report) = snapshot.report {
                clear_status();
                eprintln!("time is up");
                break report;
            }
        }
        if config.display.show_live_zones {
            draw_status(&snapshot);
        }
    };

    clear_status();
    if report.stop_reason().is_some_and(StopReason::acknowledge) {
        eprintln!("Trial for {} finished!", report.animal_id());
    }
    args.output.emit(&report, &config)
}

/// Applies one input line. Returns the final report once the trial stops.
fn handle_line(
    timer: &mut TrialTimer,
    line: &str,
) -> Result<Option<TrialReport>, Box<dyn std::error::Error>> {
    let Some(command) = parse_command(line) else {
        if !line.trim().is_empty() {
            clear_status();
            eprintln!("unknown input '{}'. {HELP}", line.trim());
        }
        return Ok(None);
    };
    match command {
        Command::Press(zone) => {
            timer.press(zone);
        }
        Command::Release => {
            timer.release_active();
        }
        Command::Report => {
            clear_status();
            eprint!("{}", timer.report()?);
        }
        Command::Help => {
            clear_status();
            eprintln!("{HELP}");
        }
        Command::Stop => return Ok(Some(timer.stop(StopReason::Manual)?)),
    }
    Ok(None)
}

fn status_line(snapshot: &DisplaySnapshot) -> String {
    let zones: Vec<String> = snapshot
        .zone_secs
        .iter()
        .map(|(zone, secs)| {
            let marker = if snapshot.active_zone == Some(zone) { "*" } else { " " };
            format!("{marker}{}: {secs:.2} s", zone.label())
        })
        .collect();
    format!(
        "Remaining: {}  |{}",
        format_clock(snapshot.remaining_secs),
        zones.join(" |")
    )
}

fn draw_status(snapshot: &DisplaySnapshot) {
    let mut err = std::io::stderr();
    let _ = write!(err, "\r{}", status_line(snapshot));
    let _ = err.flush();
}

fn clear_status() {
    let mut err = std::io::stderr();
    let _ = write!(err, "\r\x1b[2K");
    let _ = err.flush();
}
