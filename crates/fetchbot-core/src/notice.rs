//! Human-readable one-line notifications for reports.
//!
//! This is the consumer side of the engine: a chat bot or CLI posts these
//! lines as status messages.

use crate::progress::ProgressReport;
use crate::report::{Report, ReportKind};
use std::path::Path;

const PREFIXES: [&str; 5] = ["", "Ki", "Mi", "Gi", "Ti"];

/// Format a byte count (or rate) with binary prefixes, e.g. `1.50KiB`.
/// Absent values print as `-B`.
pub fn format_bytes(value: Option<f64>, precision: usize) -> String {
    let Some(value) = value else {
        return "-B".to_string();
    };
    let mut scaled = value.abs();
    let mut unit = 1.0;
    let mut index = 0;
    while scaled >= 1024.0 && index < PREFIXES.len() - 1 {
        scaled = (scaled / 1024.0).floor();
        unit *= 1024.0;
        index += 1;
    }
    format!("{:.*}{}B", precision, value / unit, PREFIXES[index])
}

/// Format seconds as `H:MM:SS`. Absent or invalid values print as `-`.
pub fn format_duration(secs: Option<f64>) -> String {
    match secs {
        Some(s) if s.is_finite() && s >= 0.0 => {
            let total = s.round() as u64;
            format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
        }
        _ => "-".to_string(),
    }
}

fn bytes(value: u64) -> String {
    format_bytes(Some(value as f64), 2)
}

fn rate(value: Option<f64>) -> String {
    format!("{}/s", format_bytes(value, 2))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn progress_line(p: &ProgressReport) -> String {
    let amount = match (p.file_size, p.progress_rate()) {
        (Some(total), Some(fraction)) => format!(
            "{}/{} ({:.2}%)",
            bytes(p.downloaded_size),
            bytes(total),
            fraction * 100.0
        ),
        (Some(total), None) => format!("{}/{}", bytes(p.downloaded_size), bytes(total)),
        (None, _) => bytes(p.downloaded_size),
    };
    format!(
        "{} {} in {} (remaining {})",
        amount,
        rate(p.speed),
        format_duration(Some(p.elapsed_secs)),
        format_duration(p.remaining_secs())
    )
}

/// One notification line for `report`, labelled with the requested file name.
pub fn render<I>(report: &Report<I>) -> String {
    let name = display_name(&report.requested_path);
    match &report.kind {
        ReportKind::Start { response, progress } => format!(
            "[{}]:start <{}> (size: {})",
            name,
            response.final_url,
            format_bytes(progress.file_size.map(|s| s as f64), 2)
        ),
        ReportKind::Progress { progress } => format!("[{}]:progress {}", name, progress_line(progress)),
        ReportKind::Finish {
            saved_path,
            progress,
        } => {
            let head = if saved_path == &report.requested_path {
                format!("[{}]:finish", name)
            } else {
                format!("[{}] -> [{}]:finish", name, display_name(saved_path))
            };
            format!(
                "{} {} at {} in {}",
                head,
                bytes(progress.downloaded_size),
                rate(progress.average_speed()),
                format_duration(Some(progress.elapsed_secs))
            )
        }
        ReportKind::Error { error } => format!("[{}]:error {}: {}", name, error.kind(), error),
    }
}
