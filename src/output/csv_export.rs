//! CSV export of (event, profile) pairs
//!
//! The file is regenerated from the full history on every publish and
//! swapped in atomically, so it never holds a duplicate row or a torn write.

use crate::output::traits::{OutputError, OutputResult, OutputSink};
use crate::storage::{replace_file, CrawlHistory};
use std::path::{Path, PathBuf};

const HEADER: [&str; 2] = ["Event URL", "Profile URL"];

/// Renders the history as CSV bytes, header included
pub fn render_csv(history: &CrawlHistory) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for (parent, child) in history.pairs() {
        writer.write_record([parent.as_str(), child.as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| OutputError::Write(e.to_string()))
}

/// Writes the CSV export for `history` to `path`
pub fn write_csv(history: &CrawlHistory, path: &Path) -> OutputResult<usize> {
    let bytes = render_csv(history)?;
    replace_file(path, &bytes)?;
    Ok(history.child_count())
}

/// Output sink that keeps a CSV file in sync with the history
#[derive(Debug, Clone)]
pub struct CsvExport {
    path: PathBuf,
}

impl CsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSink for CsvExport {
    fn publish(&mut self, history: &CrawlHistory) -> OutputResult<()> {
        let rows = write_csv(history, &self.path)?;
        tracing::debug!("Wrote {} rows to {}", rows, self.path.display());
        Ok(())
    }
}
