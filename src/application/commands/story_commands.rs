//! Story Commands

use uuid::Uuid;

/// 根据提示词生成并保存新故事
#[derive(Debug, Clone)]
pub struct CreateStory {
    pub prompt: String,
    pub chapter_count: u32,
}

/// 删除故事命令（级联删除章节）
#[derive(Debug, Clone)]
pub struct DeleteStory {
    pub story_id: Uuid,
}
