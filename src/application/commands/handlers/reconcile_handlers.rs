//! Reconcile Handler - 生成结果写入与状态协调
//!
//! 每次写入都重新加载最新的故事快照，挂上资源后重新计算章节和故事状态，再整体保存。
//! 同一故事的多个写入必须串行执行（见 infrastructure/worker/reconcile_worker.rs）。
//! 保存只更新已存在的故事，加载之后被删除的故事不会被写回。

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    ApplyGeneratedAsset, AssetApplied, AssetWriterPort, GeneratedAsset, RepositoryError, StoryRepositoryPort,
};
use crate::domain::story::ChapterId;

/// ApplyGeneratedAsset Handler
pub struct ApplyGeneratedAssetHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
}

impl ApplyGeneratedAssetHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>) -> Self {
        Self { story_repo }
    }

    pub async fn handle(&self, command: ApplyGeneratedAsset) -> Result<AssetApplied, ApplicationError> {
        let mut story = self
            .story_repo
            .find_by_id(command.story_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Story", command.story_id))?;

        let chapter = story
            .chapter_mut(ChapterId::from_uuid(command.chapter_id))
            .ok_or_else(|| ApplicationError::not_found("Chapter", command.chapter_id))?;
        let chapter_number = chapter.number();

        let (kind, chapter_status) = match command.asset {
            GeneratedAsset::Image(payload) => ("image", chapter.attach_image(payload)?),
            GeneratedAsset::Audio(payload) => ("audio", chapter.attach_audio(payload)?),
        };

        let story_status = story.recompute_status();
        if let Err(e) = self.story_repo.update(&story).await {
            if matches!(e, RepositoryError::NotFound(_)) {
                tracing::warn!(
                    story_id = %command.story_id,
                    chapter_number = chapter_number,
                    asset = kind,
                    "Story deleted during generation, asset discarded"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            story_id = %command.story_id,
            chapter_number = chapter_number,
            asset = kind,
            chapter_status = %chapter_status,
            story_status = %story_status,
            "Generated asset applied"
        );

        Ok(AssetApplied {
            story_id: command.story_id,
            chapter_id: command.chapter_id,
            chapter_status,
            story_status,
        })
    }
}

/// 直接写入（不排队），只适合单任务场景
#[async_trait]
impl AssetWriterPort for ApplyGeneratedAssetHandler {
    async fn apply(&self, command: ApplyGeneratedAsset) -> Result<AssetApplied, ApplicationError> {
        self.handle(command).await
    }
}
