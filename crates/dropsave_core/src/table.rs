use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{JobId, JobRecord};

/// Mapping from job id to record. Keys are unique by construction.
///
/// Serializes as a flat JSON object keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobTable {
    jobs: BTreeMap<JobId, JobRecord>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &JobRecord)> {
        self.jobs.iter()
    }

    /// Inserts or overwrites one entry, returning the previous record.
    pub fn put(&mut self, id: impl Into<JobId>, record: JobRecord) -> Option<JobRecord> {
        self.jobs.insert(id.into(), record)
    }

    pub fn delete(&mut self, id: &str) -> Option<JobRecord> {
        self.jobs.remove(id)
    }

    /// Overwrites every key present in `partial`; other keys are untouched.
    /// Returns how many entries were written.
    pub fn merge(&mut self, partial: JobTable) -> usize {
        let written = partial.len();
        self.jobs.extend(partial.jobs);
        written
    }

    /// Ids of records that still need polling.
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|(_, record)| record.is_pending())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl FromIterator<(JobId, JobRecord)> for JobTable {
    fn from_iter<T: IntoIterator<Item = (JobId, JobRecord)>>(iter: T) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for JobTable {
    type Item = (JobId, JobRecord);
    type IntoIter = std::collections::btree_map::IntoIter<JobId, JobRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}
