use dropsave_core::{JobRecord, JobRowView, TableView};
use dropsave_engine::RefreshReport;

const HEADERS: [&str; 6] = ["PATH", "URL", "JOB ID", "STATUS", "ERROR", "SUBMITTED"];
const MAX_CELL: usize = 48;

/// Renders the job table as aligned plain-text columns.
pub fn render_table(view: &TableView) -> String {
    let mut out = format!("Jobs: {} | Pending: {}\n", view.job_count, view.pending_count);
    if view.rows.is_empty() {
        out.push_str("(no jobs)\n");
        return out;
    }

    let rows: Vec<[String; 6]> = view.rows.iter().map(row_cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    push_line(&mut out, &HEADERS.map(str::to_string), &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

pub fn render_record(record: &JobRecord) -> String {
    let id = record.id.as_deref().unwrap_or("-");
    let status = record.status.map_or("unknown", |status| status.as_tag());
    match &record.error {
        Some(error) => format!("[{id}] {status}: {} <- {} ({error})", record.path, record.url),
        None => format!("[{id}] {status}: {} <- {}", record.path, record.url),
    }
}

pub fn render_report(report: &RefreshReport) -> String {
    if report.skipped {
        return "Refresh skipped: another refresh is running".to_string();
    }
    format!(
        "Checked {} job(s): {} settled, {} check(s) failed",
        report.checked, report.settled, report.failed_checks
    )
}

fn row_cells(row: &JobRowView) -> [String; 6] {
    [
        truncate(&row.path),
        truncate(&row.url),
        row.id.clone(),
        row.status_label().to_string(),
        truncate(row.error.as_deref().unwrap_or("")),
        row.timestamp.map(format_timestamp).unwrap_or_default(),
    ]
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_CELL - 3).collect();
    format!("{kept}...")
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use dropsave_core::{JobStatus, JobTable};

    use super::*;

    fn sample_view() -> TableView {
        let mut table = JobTable::new();
        table.put("J1", JobRecord::added("/a.txt", "http://x/a", "J1", 0));
        let mut failed = JobRecord::added("/b.txt", "http://x/b", "J2", 1_000);
        failed.status = Some(JobStatus::Failed);
        failed.error = Some("download_error".to_string());
        table.put("J2", failed);
        TableView::from_table(&table)
    }

    #[test]
    fn table_has_header_and_one_line_per_job() {
        let text = render_table(&sample_view());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Jobs: 2 | Pending: 1");
        assert!(lines[1].starts_with("PATH"));
        assert!(lines[2].starts_with("/b.txt"));
        assert!(lines[2].contains("download_error"));
        assert!(lines[2].contains("1970-01-01 00:00:01"));
        assert!(lines[3].contains("added"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn empty_table_says_so() {
        let text = render_table(&TableView::default());
        assert_eq!(text, "Jobs: 0 | Pending: 0\n(no jobs)\n");
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(100);
        let cell = truncate(&long);
        assert_eq!(cell.chars().count(), MAX_CELL);
        assert!(cell.ends_with("..."));
    }

    #[test]
    fn record_line_mentions_error() {
        let record = JobRecord::failed("/a.txt", "http://x/a", "rate limited");
        assert_eq!(
            render_record(&record),
            "[-] failed: /a.txt <- http://x/a (rate limited)"
        );
    }
}
