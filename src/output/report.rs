//! End-of-session report rendering

use crate::output::traits::CrawlReport;

/// Renders the report as plain lines, shared by the console and the session log
pub fn report_lines(report: &CrawlReport) -> Vec<String> {
    let mut lines = vec![
        format!("Session {}", report.status.as_str()),
        format!("Events processed this run: {}", report.processed_this_run),
        format!("Events skipped (already processed): {}", report.skipped),
        format!("Total events processed: {}", report.total_processed),
        format!("Total unique profiles: {}", report.total_children),
        format!("New profiles this run: {}", report.new_children),
    ];

    if report.not_attempted > 0 {
        lines.push(format!(
            "Events not attempted (interrupted): {}",
            report.not_attempted
        ));
    }

    if let Some(seconds) = report.duration_seconds() {
        lines.push(format!("Duration: {}s", seconds));
    }

    if report.failed.is_empty() {
        lines.push("Failed events: 0".to_string());
    } else {
        lines.push(format!("Failed events: {}", report.failed.len()));
        for unit in &report.failed {
            lines.push(format!(
                "  {} ({} attempts): {}",
                unit.parent, unit.attempts, unit.reason
            ));
        }
    }

    lines
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Report ===\n");
    for line in report_lines(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FailedUnit;
    use crate::storage::RunStatus;
    use crate::url::ParentId;
    use chrono::{Duration, Utc};

    #[test]
    fn test_report_lines() {
        let started = Utc::now();
        let mut report = CrawlReport::new(started);
        report.status = RunStatus::Completed;
        report.finished_at = Some(started + Duration::seconds(90));
        report.processed_this_run = 3;
        report.skipped = 1;
        report.total_processed = 4;
        report.total_children = 250;
        report.new_children = 120;
        report.failed.push(FailedUnit::new(
            ParentId::parse("https://example.com/events/5").unwrap(),
            "HTTP 404",
            false,
        ));

        let lines = report_lines(&report);
        assert_eq!(lines[0], "Session completed");
        assert!(lines.contains(&"Events skipped (already processed): 1".to_string()));
        assert!(lines.contains(&"Duration: 90s".to_string()));
        assert!(lines.contains(&"Failed events: 1".to_string()));
        assert!(lines
            .iter()
            .any(|l| l.contains("https://example.com/events/5") && l.contains("HTTP 404")));
    }

    #[test]
    fn test_interrupted_line_only_when_needed() {
        let mut report = CrawlReport::new(Utc::now());
        assert!(!report_lines(&report).iter().any(|l| l.contains("interrupted)")));

        report.not_attempted = 4;
        assert!(report_lines(&report)
            .contains(&"Events not attempted (interrupted): 4".to_string()));
    }
}
