//! Writing reports to files or any other byte sink.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::TrialReport;
use crate::error::{ExportError, Result};

/// Output format for exported reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// The human-readable report sheet.
    #[default]
    Text,
    /// The report record as pretty-printed JSON.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{other}' (expected text or json)")),
        }
    }
}

/// Serializes `report` to `out`.
pub fn export<W: Write>(
    report: &TrialReport,
    mut out: W,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Text => write!(out, "{report}")?,
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Writes `report` to a file at `path`, replacing any existing file.
pub fn export_to_path(
    report: &TrialReport,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    let wrap = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(wrap)?;
    match export(report, BufWriter::new(file), format) {
        Ok(()) => {
            tracing::info!(path = %path.display(), %format, "report exported");
            Ok(())
        }
        Err(ExportError::Io(source)) => Err(wrap(source)),
        Err(other) => Err(other),
    }
}

/// Writes `report` into `dir` under its default file name, creating `dir`
/// if needed. Returns the written path.
pub fn save_to_dir(report: &TrialReport, dir: &Path, format: ExportFormat) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(default_file_name(report, format));
    export_to_path(report, &path, format)?;
    Ok(path)
}

/// `openfield_<animal>_<YYYYmmdd_HHMMSS>.<ext>`, with unsafe filename
/// characters in the animal id replaced by `_`.
pub fn default_file_name(report: &TrialReport, format: ExportFormat) -> String {
    let animal: String = report
        .animal_id()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "openfield_{}_{}.{}",
        animal,
        report
            .timestamp()
            .with_timezone(&Local)
            .format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::StopReason;
    use crate::zone::{Zone, ZoneMap};
    use chrono::{DateTime, Utc};

    fn sample() -> TrialReport {
        let secs = ZoneMap::from_fn(|z| if z == Zone::Lateral { 3.0 } else { 1.0 });
        TrialReport::build(
            "rat 7/b",
            DateTime::<Utc>::UNIX_EPOCH,
            10,
            10.0,
            &secs,
            Some(StopReason::AutoExpired),
        )
    }

    #[test]
    fn text_export_matches_display() {
        let report = sample();
        let mut buf = Vec::new();
        export(&report, &mut buf, ExportFormat::Text).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), report.to_string());
    }

    #[test]
    fn json_export_has_keyed_zones() {
        let mut buf = Vec::new();
        export(&sample(), &mut buf, ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["animal_id"], "rat 7/b");
        assert_eq!(value["per_zone"]["lateral"]["seconds"], 3.0);
        assert_eq!(value["stop_reason"], "auto_expired");

        let back: TrialReport = serde_json::from_slice(&buf).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        export_to_path(&sample(), &path, ExportFormat::Text).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("--- Open Field Test Report ---"));
    }

    #[test]
    fn export_to_missing_directory_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.txt");
        let err = export_to_path(&sample(), &path, ExportFormat::Text).unwrap_err();
        match err {
            ExportError::Write { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Write error, got {other:?}"),
        }
    }

    #[test]
    fn save_to_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports").join("day1");
        let path = save_to_dir(&sample(), &target, ExportFormat::Json).unwrap();
        assert_eq!(path.parent(), Some(target.as_path()));
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            default_file_name(&sample(), ExportFormat::Json)
        );
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["animal_id"], "rat 7/b");
    }

    #[test]
    fn save_to_dir_over_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "x").unwrap();
        let err = save_to_dir(&sample(), &blocker.join("sub"), ExportFormat::Text).unwrap_err();
        assert!(matches!(err, crate::CoreError::Io(_)), "got {err:?}");
    }

    #[test]
    fn default_file_name_is_filesystem_safe() {
        let name = default_file_name(&sample(), ExportFormat::Json);
        assert!(name.starts_with("openfield_rat_7_b_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn format_parses() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
