//! Story Command Handlers

use std::sync::Arc;

use crate::application::commands::{CreateStory, DeleteStory};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    validate_story_request, GenerationClientPort, JobTrackerPort, StoryRepositoryPort,
};
use crate::domain::story::Story;

// ============================================================================
// CreateStory
// ============================================================================

/// CreateStory Handler - 调用文本生成并保存故事
///
/// 文本生成失败时不会保存任何内容。
pub struct CreateStoryHandler {
    client: Arc<dyn GenerationClientPort>,
    story_repo: Arc<dyn StoryRepositoryPort>,
    max_chapters: u32,
}

impl CreateStoryHandler {
    pub fn new(
        client: Arc<dyn GenerationClientPort>,
        story_repo: Arc<dyn StoryRepositoryPort>,
        max_chapters: u32,
    ) -> Self {
        Self {
            client,
            story_repo,
            max_chapters,
        }
    }

    pub async fn handle(&self, command: CreateStory) -> Result<Story, ApplicationError> {
        if command.chapter_count > self.max_chapters {
            return Err(ApplicationError::validation(format!(
                "chapter_count must be between 1 and {}",
                self.max_chapters
            )));
        }
        validate_story_request(&command.prompt, command.chapter_count)?;

        let story = self
            .client
            .generate_story_and_chapters(&command.prompt, command.chapter_count)
            .await
            .map_err(|e| {
                tracing::warn!(
                    chapter_count = command.chapter_count,
                    error_kind = e.kind(),
                    error = %e,
                    "Story generation failed"
                );
                e
            })?;

        self.story_repo.save(&story).await?;

        tracing::info!(
            story_id = %story.id(),
            title = %story.title(),
            chapters = story.chapter_count(),
            status = %story.status(),
            "Story created"
        );

        Ok(story)
    }
}

// ============================================================================
// DeleteStory
// ============================================================================

/// DeleteStory Handler - 删除故事及其章节
pub struct DeleteStoryHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    job_tracker: Arc<dyn JobTrackerPort>,
}

impl DeleteStoryHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>, job_tracker: Arc<dyn JobTrackerPort>) -> Self {
        Self {
            story_repo,
            job_tracker,
        }
    }

    pub async fn handle(&self, command: DeleteStory) -> Result<(), ApplicationError> {
        let deleted = self.story_repo.delete(command.story_id).await?;
        if !deleted {
            return Err(ApplicationError::not_found("Story", command.story_id));
        }

        self.job_tracker.forget_story(command.story_id);

        tracing::info!(story_id = %command.story_id, "Story deleted");
        Ok(())
    }
}
