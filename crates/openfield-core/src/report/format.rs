use std::fmt;

use chrono::Local;

use super::TrialReport;

/// Formats the report as the plain-text sheet shown on screen and exported.
impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Open Field Test Report ---")?;
        writeln!(f, "Animal ID: {}", self.animal_id)?;
        writeln!(
            f,
            "Timestamp: {}",
            self.timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(
            f,
            "Scheduled Duration: {} seconds",
            self.scheduled_duration_secs
        )?;
        writeln!(
            f,
            "Effective Duration: {:.2} seconds",
            self.effective_duration_secs
        )?;
        writeln!(f, "Accumulated Time per Zone:")?;
        for (zone, share) in self.per_zone.iter() {
            writeln!(
                f,
                "  {}: {:.2} seconds ({:.2}%)",
                zone.label(),
                share.seconds,
                share.percent
            )?;
        }
        Ok(())
    }
}

/// `MM:SS` countdown label. Minutes keep counting past 59.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
