//! In-Memory Story Repository
//!
//! 不落盘，进程退出即丢失。`database.path = "memory"` 时使用，也供单元测试使用。

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::application::ports::{RepositoryError, StoryRecord, StoryRepositoryPort};
use crate::domain::story::{Chapter, ChapterId, Story};

/// 内存故事仓储
#[derive(Default)]
pub struct InMemoryStoryRepository {
    stories: DashMap<Uuid, Story>,
}

impl InMemoryStoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoryRepositoryPort for InMemoryStoryRepository {
    async fn save(&self, story: &Story) -> Result<(), RepositoryError> {
        self.stories.insert(*story.id().as_uuid(), story.clone());
        Ok(())
    }

    async fn update(&self, story: &Story) -> Result<(), RepositoryError> {
        let id = *story.id().as_uuid();
        // get_mut 持有分片锁，与 delete 互斥
        match self.stories.get_mut(&id) {
            Some(mut stored) => {
                *stored = story.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Story>, RepositoryError> {
        Ok(self.stories.get(&id).map(|story| story.clone()))
    }

    async fn find_all(&self) -> Result<Vec<StoryRecord>, RepositoryError> {
        let mut records: Vec<StoryRecord> = self
            .stories
            .iter()
            .map(|entry| StoryRecord::from(entry.value()))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.stories.remove(&id).is_some())
    }

    async fn find_chapter(&self, chapter_id: Uuid) -> Result<Option<Chapter>, RepositoryError> {
        let id = ChapterId::from_uuid(chapter_id);
        Ok(self
            .stories
            .iter()
            .find_map(|entry| entry.value().chapter(id).cloned()))
    }
}
