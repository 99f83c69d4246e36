//! Output module for exporting results and reporting on sessions
//!
//! This module handles:
//! - Keeping the CSV export of (event, profile) pairs in sync with history
//! - The timestamped session log
//! - End-of-session reports and history statistics

mod csv_export;
mod report;
mod session_log;
pub mod stats;
mod traits;

pub use csv_export::{render_csv, write_csv, CsvExport};
pub use report::{print_report, report_lines};
pub use session_log::SessionLog;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use traits::{CrawlReport, NullSink, OutputError, OutputResult, OutputSink};
