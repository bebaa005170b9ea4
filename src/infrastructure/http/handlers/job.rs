//! Job HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::GetJobStatus;
use crate::infrastructure::http::dto::{ApiResponse, JobDto, JobListDto, JobStatusRequest};
use crate::infrastructure::http::state::AppState;

/// 批量查询生成任务状态，未知 ID 不出现在结果中
pub async fn query_job_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JobStatusRequest>,
) -> Json<ApiResponse<JobListDto>> {
    let jobs = state
        .get_job_status_handler
        .handle(GetJobStatus { job_ids: req.job_ids })
        .into_iter()
        .map(JobDto::from)
        .collect();
    Json(ApiResponse::success(JobListDto { jobs }))
}
