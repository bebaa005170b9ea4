//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    CreateStoryHandler, DeleteStoryHandler, GenerateChapterAudioHandler, GenerateChapterImageHandler,
    SubmitChapterGenerationHandler,
    // Query handlers
    GetChapterAssetHandler, GetChapterHandler, GetJobStatusHandler, GetStoryHandler, ListStoriesHandler,
    // Ports
    AssetWriterPort, GenerationClientPort, JobTrackerPort, StoryRepositoryPort,
};
use crate::domain::story::NarrationVoice;

/// 生成相关的运行参数
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub max_chapters: u32,
    pub default_voice: NarrationVoice,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_chapters: 5,
            default_voice: NarrationVoice::default(),
        }
    }
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub story_repo: Arc<dyn StoryRepositoryPort>,
    pub job_tracker: Arc<dyn JobTrackerPort>,
    pub settings: GenerationSettings,

    // ========== Command Handlers ==========
    pub create_story_handler: CreateStoryHandler,
    pub delete_story_handler: DeleteStoryHandler,
    pub submit_generation_handler: SubmitChapterGenerationHandler,

    // ========== Query Handlers ==========
    pub get_story_handler: GetStoryHandler,
    pub list_stories_handler: ListStoriesHandler,
    pub get_chapter_handler: GetChapterHandler,
    pub get_asset_handler: GetChapterAssetHandler,
    pub get_job_status_handler: GetJobStatusHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `asset_writer` 在生产环境中是 ReconcileWorker 的 Handle
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        job_tracker: Arc<dyn JobTrackerPort>,
        client: Arc<dyn GenerationClientPort>,
        asset_writer: Arc<dyn AssetWriterPort>,
        settings: GenerationSettings,
    ) -> Self {
        let image_handler = Arc::new(GenerateChapterImageHandler::new(
            story_repo.clone(),
            client.clone(),
            asset_writer.clone(),
        ));
        let audio_handler = Arc::new(GenerateChapterAudioHandler::new(
            story_repo.clone(),
            client.clone(),
            asset_writer,
            settings.default_voice,
        ));

        Self {
            // Ports
            story_repo: story_repo.clone(),
            job_tracker: job_tracker.clone(),
            settings,

            // Command handlers
            create_story_handler: CreateStoryHandler::new(client, story_repo.clone(), settings.max_chapters),
            delete_story_handler: DeleteStoryHandler::new(story_repo.clone(), job_tracker.clone()),
            submit_generation_handler: SubmitChapterGenerationHandler::new(
                story_repo.clone(),
                job_tracker.clone(),
                image_handler,
                audio_handler,
            ),

            // Query handlers
            get_story_handler: GetStoryHandler::new(story_repo.clone(), job_tracker.clone()),
            list_stories_handler: ListStoriesHandler::new(story_repo.clone()),
            get_chapter_handler: GetChapterHandler::new(story_repo.clone(), job_tracker.clone()),
            get_asset_handler: GetChapterAssetHandler::new(story_repo),
            get_job_status_handler: GetJobStatusHandler::new(job_tracker),
        }
    }
}
