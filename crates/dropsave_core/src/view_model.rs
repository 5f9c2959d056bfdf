use crate::{JobId, JobStatus, JobTable};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub rows: Vec<JobRowView>,
    pub job_count: usize,
    pub pending_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub id: JobId,
    pub path: String,
    pub url: String,
    pub status: Option<JobStatus>,
    pub error: Option<String>,
    pub timestamp: Option<i64>,
}

impl JobRowView {
    pub fn status_label(&self) -> &'static str {
        self.status.map_or("unknown", JobStatus::as_tag)
    }
}

impl TableView {
    /// Rows ordered newest first; ties fall back to id order.
    pub fn from_table(table: &JobTable) -> Self {
        let mut rows: Vec<JobRowView> = table
            .iter()
            .map(|(id, record)| JobRowView {
                id: id.clone(),
                path: record.path.clone(),
                url: record.url.clone(),
                status: record.status,
                error: record.error.clone(),
                timestamp: record.timestamp,
            })
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        Self {
            job_count: rows.len(),
            pending_count: table.pending_ids().len(),
            rows,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count > 0
    }
}
