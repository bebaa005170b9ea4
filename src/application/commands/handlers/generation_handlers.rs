//! Chapter Generation Handlers
//!
//! 插图和朗读的生成流程：读取当前快照 → 调用生成服务 → 交给 AssetWriter 写入。
//! 生成失败时直接返回错误，故事和章节不做任何修改。

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::application::commands::{GenerateChapterAudio, GenerateChapterImage, SubmitChapterGeneration};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ApplyGeneratedAsset, AssetApplied, AssetKind, AssetWriterPort, GeneratedAsset, GenerationClientPort,
    GenerationError, GenerationJob, JobTrackerPort, StoryRepositoryPort,
};
use crate::domain::story::{NarrationVoice, Story};

async fn load_story(
    story_repo: &Arc<dyn StoryRepositoryPort>,
    story_id: uuid::Uuid,
) -> Result<Story, ApplicationError> {
    story_repo
        .find_by_id(story_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Story", story_id))
}

fn chapter_not_found(story_id: uuid::Uuid, chapter_number: i32) -> ApplicationError {
    ApplicationError::not_found_str("Chapter", format!("{}#{}", story_id, chapter_number))
}

// ============================================================================
// GenerateChapterImage
// ============================================================================

/// GenerateChapterImage Handler
pub struct GenerateChapterImageHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    client: Arc<dyn GenerationClientPort>,
    writer: Arc<dyn AssetWriterPort>,
}

impl GenerateChapterImageHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        client: Arc<dyn GenerationClientPort>,
        writer: Arc<dyn AssetWriterPort>,
    ) -> Self {
        Self {
            story_repo,
            client,
            writer,
        }
    }

    pub async fn handle(&self, command: GenerateChapterImage) -> Result<AssetApplied, ApplicationError> {
        let story = load_story(&self.story_repo, command.story_id).await?;
        let chapter = story
            .chapter_by_number(command.chapter_number)
            .ok_or_else(|| chapter_not_found(command.story_id, command.chapter_number))?;

        tracing::info!(
            story_id = %command.story_id,
            chapter_number = command.chapter_number,
            "Generating chapter image"
        );

        let payload = self
            .client
            .generate_chapter_image(story.title().as_str(), story.chapter_count(), chapter)
            .await
            .map_err(|e| generation_failed(&command.story_id, command.chapter_number, AssetKind::Image, e))?;

        self.writer
            .apply(ApplyGeneratedAsset {
                story_id: command.story_id,
                chapter_id: *chapter.id().as_uuid(),
                asset: GeneratedAsset::Image(payload),
            })
            .await
    }
}

// ============================================================================
// GenerateChapterAudio
// ============================================================================

/// GenerateChapterAudio Handler
pub struct GenerateChapterAudioHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    client: Arc<dyn GenerationClientPort>,
    writer: Arc<dyn AssetWriterPort>,
    default_voice: NarrationVoice,
}

impl GenerateChapterAudioHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        client: Arc<dyn GenerationClientPort>,
        writer: Arc<dyn AssetWriterPort>,
        default_voice: NarrationVoice,
    ) -> Self {
        Self {
            story_repo,
            client,
            writer,
            default_voice,
        }
    }

    pub async fn handle(&self, command: GenerateChapterAudio) -> Result<AssetApplied, ApplicationError> {
        let story = load_story(&self.story_repo, command.story_id).await?;
        let chapter = story
            .chapter_by_number(command.chapter_number)
            .ok_or_else(|| chapter_not_found(command.story_id, command.chapter_number))?;
        let voice = command.voice.unwrap_or(self.default_voice);

        tracing::info!(
            story_id = %command.story_id,
            chapter_number = command.chapter_number,
            voice = %voice,
            "Generating chapter audio"
        );

        let payload = self
            .client
            .generate_chapter_audio(chapter, voice)
            .await
            .map_err(|e| generation_failed(&command.story_id, command.chapter_number, AssetKind::Audio, e))?;

        self.writer
            .apply(ApplyGeneratedAsset {
                story_id: command.story_id,
                chapter_id: *chapter.id().as_uuid(),
                asset: GeneratedAsset::Audio(payload),
            })
            .await
    }
}

fn generation_failed(
    story_id: &uuid::Uuid,
    chapter_number: i32,
    kind: AssetKind,
    err: GenerationError,
) -> ApplicationError {
    tracing::warn!(
        story_id = %story_id,
        chapter_number = chapter_number,
        asset = %kind,
        error_kind = err.kind(),
        error = %err,
        "Chapter generation failed, chapter left unchanged"
    );
    ApplicationError::Generation(err)
}

// ============================================================================
// SubmitChapterGeneration
// ============================================================================

/// 已提交的后台生成任务
#[derive(Debug)]
pub struct SubmittedGeneration {
    pub job: GenerationJob,
    /// 后台任务句柄；HTTP 层不等待它，测试可以 await
    pub completion: JoinHandle<()>,
}

/// SubmitChapterGeneration Handler - 后台执行生成并记录任务状态
pub struct SubmitChapterGenerationHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
    job_tracker: Arc<dyn JobTrackerPort>,
    image_handler: Arc<GenerateChapterImageHandler>,
    audio_handler: Arc<GenerateChapterAudioHandler>,
}

impl SubmitChapterGenerationHandler {
    pub fn new(
        story_repo: Arc<dyn StoryRepositoryPort>,
        job_tracker: Arc<dyn JobTrackerPort>,
        image_handler: Arc<GenerateChapterImageHandler>,
        audio_handler: Arc<GenerateChapterAudioHandler>,
    ) -> Self {
        Self {
            story_repo,
            job_tracker,
            image_handler,
            audio_handler,
        }
    }

    pub async fn handle(&self, command: SubmitChapterGeneration) -> Result<SubmittedGeneration, ApplicationError> {
        // 提前校验，避免登记注定失败的任务
        let story = load_story(&self.story_repo, command.story_id).await?;
        let chapter = story
            .chapter_by_number(command.chapter_number)
            .ok_or_else(|| chapter_not_found(command.story_id, command.chapter_number))?;
        if command.kind == AssetKind::Audio && !chapter.has_text() {
            return Err(ApplicationError::Generation(GenerationError::InvalidRequest(format!(
                "chapter {} has no text to narrate",
                command.chapter_number
            ))));
        }

        let job = self
            .job_tracker
            .begin(command.story_id, command.chapter_number, command.kind)?;
        let job_id = job.job_id;

        tracing::info!(
            job_id = %job_id,
            story_id = %command.story_id,
            chapter_number = command.chapter_number,
            asset = %command.kind,
            "Generation job submitted"
        );

        let tracker = self.job_tracker.clone();
        let image_handler = self.image_handler.clone();
        let audio_handler = self.audio_handler.clone();

        let completion = tokio::spawn(async move {
            if let Err(e) = tracker.mark_running(job_id) {
                tracing::warn!(job_id = %job_id, error = %e, "Job vanished before start");
                return;
            }

            // 生成放在独立任务中执行，panic 时也能收尾任务记录并释放章节
            let work = tokio::spawn(async move {
                match command.kind {
                    AssetKind::Image => {
                        image_handler
                            .handle(GenerateChapterImage {
                                story_id: command.story_id,
                                chapter_number: command.chapter_number,
                            })
                            .await
                    }
                    AssetKind::Audio => {
                        audio_handler
                            .handle(GenerateChapterAudio {
                                story_id: command.story_id,
                                chapter_number: command.chapter_number,
                                voice: command.voice,
                            })
                            .await
                    }
                }
            });

            let result = work.await.unwrap_or_else(|join_err| {
                tracing::error!(job_id = %job_id, error = %join_err, "Generation task aborted");
                Err(ApplicationError::internal(format!("generation task aborted: {}", join_err)))
            });

            let marked = match result {
                Ok(applied) => {
                    tracing::info!(
                        job_id = %job_id,
                        chapter_status = %applied.chapter_status,
                        story_status = %applied.story_status,
                        "Generation job succeeded"
                    );
                    tracker.mark_succeeded(job_id)
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Generation job failed");
                    tracker.mark_failed(job_id, e.kind(), e.to_string())
                }
            };

            // 故事在任务期间被删除时记录可能已被清理
            if let Err(e) = marked {
                tracing::debug!(job_id = %job_id, error = %e, "Job record gone on completion");
            }
        });

        Ok(SubmittedGeneration { job, completion })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::handlers::ApplyGeneratedAssetHandler;
    use crate::application::ports::JobState;
    use crate::domain::story::{Chapter, Prompt, StoryState, Title};
    use crate::infrastructure::adapters::FakeGenerationClient;
    use crate::infrastructure::memory::{InMemoryJobTracker, InMemoryStoryRepository};
    use std::time::Duration;

    struct Fixture {
        repo: Arc<InMemoryStoryRepository>,
        client: Arc<FakeGenerationClient>,
        tracker: Arc<InMemoryJobTracker>,
        image: Arc<GenerateChapterImageHandler>,
        audio: Arc<GenerateChapterAudioHandler>,
        story: Story,
    }

    impl Fixture {
        async fn new() -> Self {
            let repo = Arc::new(InMemoryStoryRepository::new());
            let client = Arc::new(FakeGenerationClient::new());
            let tracker = Arc::new(InMemoryJobTracker::new());
            let writer = Arc::new(ApplyGeneratedAssetHandler::new(repo.clone()));

            let mut story = Story::new(Title::new("Paper Boats").unwrap(), Prompt::new("boats").unwrap());
            story
                .add_chapters(vec![
                    Chapter::new(1, "Folding", Some("She folded the page.".to_string())).unwrap(),
                    Chapter::new(2, "Launch", Some("The river took it.".to_string())).unwrap(),
                    Chapter::new(3, "Blank", None).unwrap(),
                ])
                .unwrap();
            story.recompute_status();
            repo.save(&story).await.unwrap();

            let image = Arc::new(GenerateChapterImageHandler::new(repo.clone(), client.clone(), writer.clone()));
            let audio = Arc::new(GenerateChapterAudioHandler::new(
                repo.clone(),
                client.clone(),
                writer,
                NarrationVoice::Alloy,
            ));

            Self {
                repo,
                client,
                tracker,
                image,
                audio,
                story,
            }
        }

        fn story_id(&self) -> uuid::Uuid {
            *self.story.id().as_uuid()
        }

        async fn stored(&self) -> Story {
            self.repo.find_by_id(self.story_id()).await.unwrap().unwrap()
        }

        fn submitter(&self) -> SubmitChapterGenerationHandler {
            SubmitChapterGenerationHandler::new(
                self.repo.clone(),
                self.tracker.clone(),
                self.image.clone(),
                self.audio.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_image_then_audio_makes_chapter_full() {
        let fx = Fixture::new().await;

        let applied = fx
            .image
            .handle(GenerateChapterImage {
                story_id: fx.story_id(),
                chapter_number: 1,
            })
            .await
            .unwrap();
        assert_eq!(applied.chapter_status, StoryState::Partial);

        let applied = fx
            .audio
            .handle(GenerateChapterAudio {
                story_id: fx.story_id(),
                chapter_number: 1,
                voice: Some(NarrationVoice::Nova),
            })
            .await
            .unwrap();
        assert_eq!(applied.chapter_status, StoryState::Full);
        assert_eq!(applied.story_status, StoryState::Partial);

        let stored = fx.stored().await;
        let chapter = stored.chapter_by_number(1).unwrap();
        assert!(chapter.has_image() && chapter.has_audio());
    }

    #[tokio::test]
    async fn test_failed_image_leaves_story_identical() {
        let fx = Fixture::new().await;
        fx.client
            .fail_image(2, GenerationError::UpstreamRefusal("content_policy_violation".to_string()));
        let before = fx.stored().await;

        let err = fx
            .image
            .handle(GenerateChapterImage {
                story_id: fx.story_id(),
                chapter_number: 2,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Generation(GenerationError::UpstreamRefusal(_))
        ));
        let after = fx.stored().await;
        assert_eq!(after, before);
        assert!(!after.chapter_by_number(2).unwrap().has_image());
        assert_eq!(after.chapter_by_number(2).unwrap().status(), StoryState::Partial);
        assert_eq!(after.status(), before.status());
    }

    #[tokio::test]
    async fn test_unknown_chapter_number() {
        let fx = Fixture::new().await;
        let err = fx
            .image
            .handle(GenerateChapterImage {
                story_id: fx.story_id(),
                chapter_number: 9,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Chapter", .. }));
        assert_eq!(fx.client.image_calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_records_job_lifecycle() {
        let fx = Fixture::new().await;
        let submitted = fx
            .submitter()
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Image,
                voice: None,
            })
            .await
            .unwrap();
        assert_eq!(submitted.job.state, JobState::Pending);

        submitted.completion.await.unwrap();

        let job = fx.tracker.get(submitted.job.job_id).unwrap();
        assert_eq!(job.state, JobState::Succeeded);
        assert!(fx.stored().await.chapter_by_number(1).unwrap().has_image());
    }

    #[tokio::test]
    async fn test_submit_failure_is_recorded_on_job_only() {
        let fx = Fixture::new().await;
        fx.client
            .fail_audio(2, GenerationError::NetworkFailure("connection reset".to_string()));
        let before = fx.stored().await;

        let submitted = fx
            .submitter()
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 2,
                kind: AssetKind::Audio,
                voice: None,
            })
            .await
            .unwrap();
        submitted.completion.await.unwrap();

        let job = fx.tracker.get(submitted.job.job_id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_kind.as_deref(), Some("network_failure"));
        assert_eq!(fx.stored().await, before);
    }

    #[tokio::test]
    async fn test_second_request_for_busy_chapter_conflicts() {
        let fx = Fixture::new().await;
        fx.client.delay_image(1, Duration::from_millis(100));
        let submitter = fx.submitter();

        let first = submitter
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Image,
                voice: None,
            })
            .await
            .unwrap();

        let err = submitter
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Audio,
                voice: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Conflict(_)));

        first.completion.await.unwrap();

        // 完成后可以再次提交
        let again = submitter
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Audio,
                voice: None,
            })
            .await
            .unwrap();
        again.completion.await.unwrap();
        assert_eq!(fx.tracker.get(again.job.job_id).unwrap().state, JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_audio_for_chapter_without_text_rejected_upfront() {
        let fx = Fixture::new().await;
        let err = fx
            .submitter()
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 3,
                kind: AssetKind::Audio,
                voice: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Generation(GenerationError::InvalidRequest(_))
        ));
        assert!(fx.tracker.active_for_story(fx.story_id()).is_empty());
        assert_eq!(fx.client.audio_calls(), 0);
    }

    /// 插图生成直接 panic 的客户端
    struct PanickingImageClient;

    #[async_trait::async_trait]
    impl GenerationClientPort for PanickingImageClient {
        async fn generate_story_and_chapters(
            &self,
            _prompt: &str,
            _chapter_count: u32,
        ) -> Result<Story, GenerationError> {
            Err(GenerationError::NetworkFailure("offline".to_string()))
        }

        async fn generate_chapter_image(
            &self,
            _story_title: &str,
            _chapter_count: usize,
            _chapter: &Chapter,
        ) -> Result<crate::domain::story::ImagePayload, GenerationError> {
            panic!("image decoder blew up");
        }

        async fn generate_chapter_audio(
            &self,
            _chapter: &Chapter,
            _voice: NarrationVoice,
        ) -> Result<crate::domain::story::AudioPayload, GenerationError> {
            Err(GenerationError::NetworkFailure("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_panicking_generation_marks_job_failed_and_frees_chapter() {
        let fx = Fixture::new().await;
        let writer = Arc::new(ApplyGeneratedAssetHandler::new(fx.repo.clone()));
        let image = Arc::new(GenerateChapterImageHandler::new(
            fx.repo.clone(),
            Arc::new(PanickingImageClient),
            writer,
        ));
        let submitter =
            SubmitChapterGenerationHandler::new(fx.repo.clone(), fx.tracker.clone(), image, fx.audio.clone());
        let before = fx.stored().await;

        let submitted = submitter
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Image,
                voice: None,
            })
            .await
            .unwrap();
        submitted.completion.await.unwrap();

        let job = fx.tracker.get(submitted.job.job_id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error_kind.as_deref(), Some("internal"));
        assert_eq!(fx.stored().await, before);

        // 章节没有被一直占用
        let again = submitter
            .handle(SubmitChapterGeneration {
                story_id: fx.story_id(),
                chapter_number: 1,
                kind: AssetKind::Audio,
                voice: None,
            })
            .await
            .unwrap();
        again.completion.await.unwrap();
        assert_eq!(fx.tracker.get(again.job.job_id).unwrap().state, JobState::Succeeded);
    }
}
