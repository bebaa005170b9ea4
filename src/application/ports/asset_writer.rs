//! Asset Writer Port - 生成结果写入
//!
//! 生成完成后的章节修改必须串行地写入存储（单写者）。
//! infrastructure/worker 中的 ReconcileWorker 提供队列化实现。

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::domain::story::{AudioPayload, ImagePayload, StoryState};

/// 生成好的资源
#[derive(Debug, Clone)]
pub enum GeneratedAsset {
    Image(ImagePayload),
    Audio(AudioPayload),
}

/// 写入生成结果命令
#[derive(Debug, Clone)]
pub struct ApplyGeneratedAsset {
    pub story_id: Uuid,
    pub chapter_id: Uuid,
    pub asset: GeneratedAsset,
}

/// 写入后的状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetApplied {
    pub story_id: Uuid,
    pub chapter_id: Uuid,
    pub chapter_status: StoryState,
    pub story_status: StoryState,
}

/// Asset Writer Port
#[async_trait]
pub trait AssetWriterPort: Send + Sync {
    /// 把资源挂到章节上并完成一次状态协调
    async fn apply(&self, command: ApplyGeneratedAsset) -> Result<AssetApplied, ApplicationError>;
}
