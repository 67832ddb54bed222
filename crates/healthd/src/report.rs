//! Status table for `--status`

use crate::orchestrator::ServiceReport;
use crate::probe::HealthStatus;
use owo_colors::OwoColorize;
use std::fmt::Write;

/// Render reports as a fixed-width `Service | Type | Status` table.
/// `color` paints UP green and DOWN red; padding is applied first so the
/// columns stay aligned.
pub fn render_status_table(reports: &[ServiceReport], color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<20} {:<10} {:<10}", "Service", "Type", "Status");
    let _ = writeln!(out, "{}", "-".repeat(40));
    for report in reports {
        let status = format!("{:<10}", report.status.label());
        let status = match (color, report.status) {
            (false, _) => status,
            (true, HealthStatus::Healthy) => status.green().to_string(),
            (true, HealthStatus::Unhealthy) => status.red().to_string(),
        };
        let _ = writeln!(out, "{:<20} {:<10} {}", report.name, report.kind.as_str(), status);
    }
    out
}
