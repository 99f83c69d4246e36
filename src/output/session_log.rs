//! Append-only, timestamped session log

use crate::output::report::report_lines;
use crate::output::traits::{CrawlReport, OutputResult};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Human-readable log of sessions, kept alongside the history
#[derive(Debug, Clone)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped line
    pub fn record(&self, message: &str) -> OutputResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "[{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        )?;
        Ok(())
    }

    /// Appends the end-of-session summary
    pub fn record_report(&self, report: &CrawlReport) -> OutputResult<()> {
        for line in report_lines(report) {
            self.record(&line)?;
        }
        Ok(())
    }
}
