use crate::{JobId, JobTable, StatusReport};

/// Builds the partial table a refresh cycle should merge.
///
/// Only terminal reports for records that are still pending in `current`
/// produce an entry. Records that disappeared (user deletion) or already
/// settled are left alone, so terminal state never regresses.
pub fn settle<I>(current: &JobTable, reports: I) -> JobTable
where
    I: IntoIterator<Item = (JobId, StatusReport)>,
{
    reports
        .into_iter()
        .filter(|(_, report)| report.is_terminal())
        .filter_map(|(id, report)| {
            let existing = current.get(&id).filter(|record| record.is_pending())?;
            let mut record = existing.clone();
            record.status = report.status;
            if let Some(error) = report.error {
                record.error = Some(error);
            }
            Some((id, record))
        })
        .collect()
}
