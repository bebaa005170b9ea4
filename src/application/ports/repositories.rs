//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite、内存）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::story::{Chapter, Story, StoryState};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 故事不存在（例如已被删除）
    #[error("Story not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// 故事摘要（列表页使用，不含章节内容）
#[derive(Debug, Clone)]
pub struct StoryRecord {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    pub status: StoryState,
    pub chapter_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Story> for StoryRecord {
    fn from(story: &Story) -> Self {
        Self {
            id: *story.id().as_uuid(),
            title: story.title().to_string(),
            prompt: story.prompt().to_string(),
            status: story.status(),
            chapter_count: story.chapter_count(),
            created_at: story.created_at(),
            updated_at: story.updated_at(),
        }
    }
}

/// Story Repository Port
///
/// 故事与章节作为一个整体保存和删除
#[async_trait]
pub trait StoryRepositoryPort: Send + Sync {
    /// 保存故事及其全部章节（插入或覆盖）
    async fn save(&self, story: &Story) -> Result<(), RepositoryError>;

    /// 覆盖已存在的故事及其全部章节
    ///
    /// 故事已被删除时返回 `NotFound`，不会重新插入
    async fn update(&self, story: &Story) -> Result<(), RepositoryError>;

    /// 根据 ID 加载完整故事
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Story>, RepositoryError>;

    /// 获取所有故事摘要，按创建时间倒序
    async fn find_all(&self) -> Result<Vec<StoryRecord>, RepositoryError>;

    /// 删除故事，级联删除章节；返回是否存在
    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// 根据章节 ID 查找章节
    async fn find_chapter(&self, chapter_id: Uuid) -> Result<Option<Chapter>, RepositoryError>;
}
