pub mod config;
pub mod replay;
pub mod run;

use std::path::PathBuf;

use openfield_core::report::{export_to_path, save_to_dir};
use openfield_core::{Config, ExportFormat, TrialReport};

/// Report output options shared by `run` and `replay`.
#[derive(clap::Args, Debug, Default)]
pub struct OutputArgs {
    /// Print the report as JSON instead of the text sheet
    #[arg(long)]
    pub json: bool,
    /// Also write the report to this file
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
    /// Also write the report to the configured export directory
    #[arg(long, conflicts_with = "export")]
    pub save: bool,
    /// Export format (defaults to the configured one)
    #[arg(long, value_name = "text|json")]
    pub format: Option<ExportFormat>,
}

impl OutputArgs {
    /// Prints `report` to stdout and writes any requested export.
    pub fn emit(&self, report: &TrialReport, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        print_report(report, self.json)?;

        let format = self.format.unwrap_or(config.export.format);
        let written = match (&self.export, self.save) {
            (Some(path), _) => {
                export_to_path(report, path, format)?;
                Some(path.clone())
            }
            (None, true) => Some(save_to_dir(report, &config.export_dir(), format)?),
            (None, false) => None,
        };
        if let Some(path) = written {
            eprintln!("report exported to {}", path.display());
        }
        Ok(())
    }
}

pub fn print_report(report: &TrialReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}
