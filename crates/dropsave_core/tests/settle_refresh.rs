use std::sync::Once;

use dropsave_core::{settle, JobRecord, JobStatus, JobTable, StatusReport};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn with_status(id: &str, status: JobStatus) -> JobRecord {
    let mut record = JobRecord::added(format!("/{id}.txt"), format!("http://x/{id}"), id, 42);
    record.status = Some(status);
    record
}

fn report(status: Option<JobStatus>, error: Option<&str>) -> StatusReport {
    StatusReport::new(status, error.map(str::to_string))
}

#[test]
fn complete_report_settles_added_job() {
    init_logging();
    let mut table = JobTable::new();
    table.put("J1", with_status("J1", JobStatus::Added));

    let partial = settle(&table, vec![("J1".to_string(), report(Some(JobStatus::Complete), None))]);

    let mut expected = with_status("J1", JobStatus::Complete);
    expected.error = None;
    assert_eq!(partial.get("J1"), Some(&expected));
    assert_eq!(partial.len(), 1);
}

#[test]
fn failed_report_carries_reason() {
    init_logging();
    let mut table = JobTable::new();
    table.put("J1", with_status("J1", JobStatus::InProgress));

    let partial = settle(
        &table,
        vec![(
            "J1".to_string(),
            report(Some(JobStatus::Failed), Some("download_error")),
        )],
    );

    let record = partial.get("J1").unwrap();
    assert_eq!(record.status, Some(JobStatus::Failed));
    assert_eq!(record.error.as_deref(), Some("download_error"));
    assert_eq!(record.path, "/J1.txt");
    assert_eq!(record.timestamp, Some(42));
}

#[test]
fn non_terminal_and_unknown_reports_are_discarded() {
    init_logging();
    let mut table = JobTable::new();
    table.put("J1", with_status("J1", JobStatus::Added));
    table.put("J2", with_status("J2", JobStatus::Added));

    let partial = settle(
        &table,
        vec![
            ("J1".to_string(), report(Some(JobStatus::InProgress), None)),
            ("J2".to_string(), report(None, None)),
        ],
    );

    assert!(partial.is_empty());
}

#[test]
fn terminal_records_never_regress() {
    init_logging();
    let mut table = JobTable::new();
    table.put("J1", with_status("J1", JobStatus::Complete));

    let partial = settle(
        &table,
        vec![(
            "J1".to_string(),
            report(Some(JobStatus::Failed), Some("late")),
        )],
    );

    assert!(partial.is_empty());
}

#[test]
fn deleted_records_are_not_resurrected() {
    init_logging();
    let table = JobTable::new();

    let partial = settle(&table, vec![("gone".to_string(), report(Some(JobStatus::Complete), None))]);

    assert!(partial.is_empty());
}
