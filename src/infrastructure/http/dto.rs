//! Data Transfer Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{
    AssetKind, ChapterDetailResponse, ChapterSummaryResponse, GenerationJob, JobState, StoryDetailResponse,
    StorySummaryResponse,
};
use crate::domain::story::{NarrationVoice, StoryState};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    pub prompt: String,
    pub chapter_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct StoryIdRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChapterRequest {
    pub story_id: Uuid,
    pub number: i32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateAudioRequest {
    pub story_id: Uuid,
    pub number: i32,
    /// 音色 ID，缺省使用配置的默认音色
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobStatusRequest {
    pub job_ids: Vec<Uuid>,
}

// ============================================================================
// Story DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StorySummaryDto {
    pub id: Uuid,
    pub title: String,
    pub status: StoryState,
    pub status_text: &'static str,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StorySummaryResponse> for StorySummaryDto {
    fn from(story: StorySummaryResponse) -> Self {
        Self {
            id: story.id,
            title: story.title,
            status: story.status,
            status_text: story.status.description(),
            chapter_count: story.chapter_count,
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChapterSummaryDto {
    pub id: Uuid,
    pub number: i32,
    pub label: &'static str,
    pub title: String,
    pub status: StoryState,
    pub has_text: bool,
    pub has_image: bool,
    pub has_audio: bool,
    pub can_open: bool,
    pub generating: Vec<AssetKind>,
}

impl From<ChapterSummaryResponse> for ChapterSummaryDto {
    fn from(chapter: ChapterSummaryResponse) -> Self {
        Self {
            id: chapter.id,
            number: chapter.number,
            label: chapter.label,
            title: chapter.title,
            status: chapter.status,
            has_text: chapter.has_text,
            has_image: chapter.has_image,
            has_audio: chapter.has_audio,
            can_open: chapter.can_open,
            generating: chapter.generating,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoryDetailDto {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    pub status: StoryState,
    pub status_text: &'static str,
    pub chapters: Vec<ChapterSummaryDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoryDetailResponse> for StoryDetailDto {
    fn from(story: StoryDetailResponse) -> Self {
        Self {
            id: story.id,
            title: story.title,
            prompt: story.prompt,
            status: story.status,
            status_text: story.status.description(),
            chapters: story.chapters.into_iter().map(ChapterSummaryDto::from).collect(),
            created_at: story.created_at,
            updated_at: story.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChapterDetailDto {
    pub story_id: Uuid,
    pub story_title: String,
    pub id: Uuid,
    pub number: i32,
    pub label: &'static str,
    pub title: String,
    pub text: Option<String>,
    pub status: StoryState,
    /// 插图地址，未生成时为空
    pub image_url: Option<String>,
    /// 音频地址，未生成时为空
    pub audio_url: Option<String>,
    pub previous_number: Option<i32>,
    pub next_number: Option<i32>,
    pub generating: Vec<AssetKind>,
}

impl From<ChapterDetailResponse> for ChapterDetailDto {
    fn from(chapter: ChapterDetailResponse) -> Self {
        Self {
            image_url: chapter
                .has_image
                .then(|| format!("/api/chapter/image/{}", chapter.id)),
            audio_url: chapter
                .has_audio
                .then(|| format!("/api/chapter/audio/{}", chapter.id)),
            story_id: chapter.story_id,
            story_title: chapter.story_title,
            id: chapter.id,
            number: chapter.number,
            label: chapter.label,
            title: chapter.title,
            text: chapter.text,
            status: chapter.status,
            previous_number: chapter.previous_number,
            next_number: chapter.next_number,
            generating: chapter.generating,
        }
    }
}

// ============================================================================
// Job DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JobDto {
    pub job_id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub kind: AssetKind,
    pub state: JobState,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<GenerationJob> for JobDto {
    fn from(job: GenerationJob) -> Self {
        Self {
            job_id: job.job_id,
            story_id: job.story_id,
            chapter_number: job.chapter_number,
            kind: job.kind,
            state: job.state,
            error_kind: job.error_kind,
            error: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListDto {
    pub jobs: Vec<JobDto>,
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct VoiceDto {
    pub id: NarrationVoice,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VoiceListDto {
    pub voices: Vec<VoiceDto>,
    pub default: NarrationVoice,
}
