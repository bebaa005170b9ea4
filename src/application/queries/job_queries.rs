//! Job Queries

use uuid::Uuid;

/// 批量查询生成任务状态
#[derive(Debug, Clone)]
pub struct GetJobStatus {
    pub job_ids: Vec<Uuid>,
}
