//! Story Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{compute_story_status, Chapter, ChapterId, Prompt, StoryError, StoryId, StoryState, Title};

/// Story 聚合根
///
/// 不变量:
/// - 章节只属于一个 Story，随 Story 一起删除
/// - 章节编号在 Story 内唯一，展示和导航一律按编号排序，不依赖存储顺序
/// - status 不会自动跟随章节变化：修改章节后调用方必须调用 `recompute_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    id: StoryId,
    title: Title,
    prompt: Prompt,
    chapters: Vec<Chapter>,
    status: StoryState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Story {
    /// 创建新故事（无章节）
    pub fn new(title: Title, prompt: Prompt) -> Self {
        let now = Utc::now();
        Self {
            id: StoryId::new(),
            title,
            prompt,
            chapters: Vec::new(),
            status: StoryState::NotDeveloped,
            created_at: now,
            updated_at: now,
        }
    }

    /// 从持久化数据恢复故事，status 沿用存储值
    pub fn restore(
        id: StoryId,
        title: Title,
        prompt: Prompt,
        chapters: Vec<Chapter>,
        status: StoryState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StoryError> {
        let mut story = Self {
            id,
            title,
            prompt,
            chapters: Vec::new(),
            status,
            created_at,
            updated_at,
        };
        story.push_chapters(chapters)?;
        Ok(story)
    }

    /// 批量添加章节（创建时使用）
    ///
    /// 编号与已有章节重复时整体拒绝，故事保持不变。
    pub fn add_chapters(&mut self, chapters: Vec<Chapter>) -> Result<(), StoryError> {
        self.push_chapters(chapters)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn push_chapters(&mut self, chapters: Vec<Chapter>) -> Result<(), StoryError> {
        let mut numbers: HashSet<i32> = self.chapters.iter().map(Chapter::number).collect();
        for chapter in &chapters {
            if !numbers.insert(chapter.number()) {
                return Err(StoryError::DuplicateChapterNumber(chapter.number()));
            }
        }
        self.chapters.extend(chapters);
        Ok(())
    }

    /// 根据当前所有章节状态重新计算故事状态
    pub fn recompute_status(&mut self) -> StoryState {
        let status = compute_story_status(self.chapters.iter().map(Chapter::status));
        if status != self.status {
            tracing::debug!(
                story_id = %self.id,
                old_status = %self.status,
                new_status = %status,
                "Story status changed"
            );
        }
        self.status = status;
        self.updated_at = Utc::now();
        status
    }

    /// 章节是否可以打开：属于本故事且状态不是 `NotDeveloped`
    pub fn can_open_chapter(&self, chapter: &Chapter) -> bool {
        self.chapter(chapter.id()).is_some() && chapter.status() != StoryState::NotDeveloped
    }

    /// 按编号排序的章节视图
    pub fn sorted_chapters(&self) -> Vec<&Chapter> {
        let mut chapters: Vec<&Chapter> = self.chapters.iter().collect();
        chapters.sort_by_key(|c| c.number());
        chapters
    }

    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id() == id)
    }

    pub fn chapter_by_number(&self, number: i32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number() == number)
    }

    /// 获取可变章节；修改后需要调用 `recompute_status`
    pub fn chapter_mut(&mut self, id: ChapterId) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.id() == id)
    }

    /// 编号顺序上的前一章
    pub fn previous_chapter(&self, number: i32) -> Option<&Chapter> {
        self.chapters
            .iter()
            .filter(|c| c.number() < number)
            .max_by_key(|c| c.number())
    }

    /// 编号顺序上的后一章
    pub fn next_chapter(&self, number: i32) -> Option<&Chapter> {
        self.chapters
            .iter()
            .filter(|c| c.number() > number)
            .min_by_key(|c| c.number())
    }

    // Getters
    pub fn id(&self) -> StoryId {
        self.id
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn status(&self) -> StoryState {
        self.status
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
