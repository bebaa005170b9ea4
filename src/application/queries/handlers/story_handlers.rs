//! Story Query Handlers

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{AssetKind, GenerationJob, JobTrackerPort, StoryRecord, StoryRepositoryPort};
use crate::application::queries::{GetChapter, GetStory, ListStories};
use crate::domain::story::{Chapter, Story, StoryState};

// ============================================================================
// Response DTOs
// ============================================================================

/// 故事库条目
#[derive(Debug, Clone)]
pub struct StorySummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub status: StoryState,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoryRecord> for StorySummaryResponse {
    fn from(record: StoryRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            status: record.status,
            chapter_count: record.chapter_count,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// 章节列表项
#[derive(Debug, Clone)]
pub struct ChapterSummaryResponse {
    pub id: Uuid,
    pub number: i32,
    pub label: &'static str,
    pub title: String,
    pub status: StoryState,
    pub has_text: bool,
    pub has_image: bool,
    pub has_audio: bool,
    pub can_open: bool,
    /// 进行中的生成任务
    pub generating: Vec<AssetKind>,
}

/// 故事详情
#[derive(Debug, Clone)]
pub struct StoryDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    pub status: StoryState,
    pub chapters: Vec<ChapterSummaryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoryDetailResponse {
    pub fn from_story(story: &Story, active_jobs: &[GenerationJob]) -> Self {
        let chapters = story
            .sorted_chapters()
            .into_iter()
            .map(|chapter| ChapterSummaryResponse {
                id: *chapter.id().as_uuid(),
                number: chapter.number(),
                label: chapter.ordinal_label(),
                title: chapter.title().to_string(),
                status: chapter.status(),
                has_text: chapter.has_text(),
                has_image: chapter.has_image(),
                has_audio: chapter.has_audio(),
                can_open: story.can_open_chapter(chapter),
                generating: generating_kinds(active_jobs, chapter.number()),
            })
            .collect();

        Self {
            id: *story.id().as_uuid(),
            title: story.title().to_string(),
            prompt: story.prompt().to_string(),
            status: story.status(),
            chapters,
            created_at: story.created_at(),
            updated_at: story.updated_at(),
        }
    }
}

/// 章节阅读视图
#[derive(Debug, Clone)]
pub struct ChapterDetailResponse {
    pub story_id: Uuid,
    pub story_title: String,
    pub id: Uuid,
    pub number: i32,
    pub label: &'static str,
    pub title: String,
    pub text: Option<String>,
    pub status: StoryState,
    pub has_image: bool,
    pub has_audio: bool,
    pub previous_number: Option<i32>,
    pub next_number: Option<i32>,
    pub generating: Vec<AssetKind>,
}

fn generating_kinds(active_jobs: &[GenerationJob], chapter_number: i32) -> Vec<AssetKind> {
    active_jobs
        .iter()
        .filter(|job| job.chapter_number == chapter_number)
        .map(|job| job.kind)
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// GetStory Handler
pub struct GetStoryHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    job_tracker: Arc<dyn JobTrackerPort>,
}

impl GetStoryHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>, job_tracker: Arc<dyn JobTrackerPort>) -> Self {
        Self {
            story_repo,
            job_tracker,
        }
    }

    pub async fn handle(&self, query: GetStory) -> Result<StoryDetailResponse, ApplicationError> {
        let story = self
            .story_repo
            .find_by_id(query.story_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Story", query.story_id))?;

        let active = self.job_tracker.active_for_story(query.story_id);
        Ok(StoryDetailResponse::from_story(&story, &active))
    }
}

/// ListStories Handler
pub struct ListStoriesHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
}

impl ListStoriesHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>) -> Self {
        Self { story_repo }
    }

    pub async fn handle(&self, _query: ListStories) -> Result<Vec<StorySummaryResponse>, ApplicationError> {
        let stories = self.story_repo.find_all().await?;
        Ok(stories.into_iter().map(StorySummaryResponse::from).collect())
    }
}

/// GetChapter Handler - 只有已开始生成的章节可以打开
pub struct GetChapterHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    job_tracker: Arc<dyn JobTrackerPort>,
}

impl GetChapterHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>, job_tracker: Arc<dyn JobTrackerPort>) -> Self {
        Self {
            story_repo,
            job_tracker,
        }
    }

    pub async fn handle(&self, query: GetChapter) -> Result<ChapterDetailResponse, ApplicationError> {
        let story = self
            .story_repo
            .find_by_id(query.story_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Story", query.story_id))?;

        let chapter: &Chapter = story.chapter_by_number(query.chapter_number).ok_or_else(|| {
            ApplicationError::not_found_str("Chapter", format!("{}#{}", query.story_id, query.chapter_number))
        })?;

        if !story.can_open_chapter(chapter) {
            return Err(ApplicationError::invalid_state(format!(
                "chapter {} is not developed yet",
                query.chapter_number
            )));
        }

        let active = self.job_tracker.active_for_story(query.story_id);

        Ok(ChapterDetailResponse {
            story_id: query.story_id,
            story_title: story.title().to_string(),
            id: *chapter.id().as_uuid(),
            number: chapter.number(),
            label: chapter.ordinal_label(),
            title: chapter.title().to_string(),
            text: chapter.text().map(str::to_string),
            status: chapter.status(),
            has_image: chapter.has_image(),
            has_audio: chapter.has_audio(),
            previous_number: story.previous_chapter(chapter.number()).map(Chapter::number),
            next_number: story.next_chapter(chapter.number()).map(Chapter::number),
            generating: generating_kinds(&active, chapter.number()),
        })
    }
}
