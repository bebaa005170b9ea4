//! Job Tracker Port - 生成任务跟踪
//!
//! 记录每个插图/朗读生成请求的进度，并保证同一章节同一时间只有一个进行中的请求。
//! 任务失败只记录在这里，故事和章节本身没有“失败”状态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Job Tracker 错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Chapter {chapter_number} of story {story_id} already has a generation in flight")]
    ChapterBusy { story_id: Uuid, chapter_number: i32 },
}

/// 生成的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// 已受理
    Pending,
    /// 正在调用生成服务
    Running,
    /// 已写入章节
    Succeeded,
    /// 失败，章节未改变
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Running)
    }
}

/// 生成任务
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub job_id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub kind: AssetKind,
    pub state: JobState,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(story_id: Uuid, chapter_number: i32, kind: AssetKind) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            story_id,
            chapter_number,
            kind,
            state: JobState::Pending,
            error_kind: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Job Tracker Port
///
/// 所有状态保存在内存中
pub trait JobTrackerPort: Send + Sync {
    /// 登记新任务；该章节已有进行中的任务时返回 `ChapterBusy`
    fn begin(&self, story_id: Uuid, chapter_number: i32, kind: AssetKind) -> Result<GenerationJob, JobError>;

    /// 标记为运行中
    fn mark_running(&self, job_id: Uuid) -> Result<(), JobError>;

    /// 标记成功
    fn mark_succeeded(&self, job_id: Uuid) -> Result<(), JobError>;

    /// 标记失败并记录错误
    fn mark_failed(&self, job_id: Uuid, kind: &str, message: String) -> Result<(), JobError>;

    /// 获取任务
    fn get(&self, job_id: Uuid) -> Option<GenerationJob>;

    /// 故事下所有进行中的任务
    fn active_for_story(&self, story_id: Uuid) -> Vec<GenerationJob>;

    /// 清理故事的所有任务记录
    fn forget_story(&self, story_id: Uuid);
}
