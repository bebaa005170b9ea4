//! Story Queries

use uuid::Uuid;

/// 获取故事详情（章节按序号排列）
#[derive(Debug, Clone)]
pub struct GetStory {
    pub story_id: Uuid,
}

/// 列出故事库
#[derive(Debug, Clone)]
pub struct ListStories;

/// 打开章节阅读
#[derive(Debug, Clone)]
pub struct GetChapter {
    pub story_id: Uuid,
    pub chapter_number: i32,
}
