//! Job Query Handlers

use std::sync::Arc;

use crate::application::ports::{GenerationJob, JobTrackerPort};
use crate::application::queries::GetJobStatus;

/// GetJobStatus Handler - 未知的任务 ID 直接忽略
pub struct GetJobStatusHandler {
    job_tracker: Arc<dyn JobTrackerPort>,
}

impl GetJobStatusHandler {
    pub fn new(job_tracker: Arc<dyn JobTrackerPort>) -> Self {
        Self { job_tracker }
    }

    pub fn handle(&self, query: GetJobStatus) -> Vec<GenerationJob> {
        query
            .job_ids
            .iter()
            .filter_map(|job_id| self.job_tracker.get(*job_id))
            .collect()
    }
}
