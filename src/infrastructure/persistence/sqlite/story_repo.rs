//! SQLite Story Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{RepositoryError, StoryRecord, StoryRepositoryPort};
use crate::domain::story::{
    AudioPayload, Chapter, ChapterId, ImagePayload, Prompt, Story, StoryId, StoryState, Title,
};

/// SQLite Story Repository
pub struct SqliteStoryRepository {
    pool: DbPool,
}

impl SqliteStoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_chapters(&self, story_id: &str) -> Result<Vec<Chapter>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(
            "SELECT id, story_id, number, title, text, image, audio FROM chapters WHERE story_id = ? ORDER BY number",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Chapter::try_from).collect()
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(e.to_string())
}

fn serialization_error(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::SerializationError(e.to_string())
}

fn parse_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(serialization_error)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(serialization_error)?
        .with_timezone(&Utc))
}

type SqliteTx<'a> = sqlx::Transaction<'a, sqlx::Sqlite>;

/// 在事务内用故事的当前章节替换已存储的章节
async fn replace_chapters(tx: &mut SqliteTx<'_>, story_id: &str, story: &Story) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM chapters WHERE story_id = ?")
        .bind(story_id)
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;

    for chapter in story.sorted_chapters() {
        sqlx::query(
            r#"
            INSERT INTO chapters (id, story_id, number, title, text, image, audio, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chapter.id().to_string())
        .bind(story_id)
        .bind(chapter.number() as i64)
        .bind(chapter.title().as_str())
        .bind(chapter.text())
        .bind(chapter.image().map(|p| p.as_bytes()))
        .bind(chapter.audio().map(|p| p.as_bytes()))
        .bind(chapter.status().as_str())
        .execute(&mut **tx)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[derive(FromRow)]
struct StoryRow {
    id: String,
    title: String,
    prompt: String,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct StorySummaryRow {
    id: String,
    title: String,
    prompt: String,
    status: String,
    chapter_count: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<StorySummaryRow> for StoryRecord {
    type Error = RepositoryError;

    fn try_from(row: StorySummaryRow) -> Result<Self, Self::Error> {
        Ok(StoryRecord {
            id: parse_uuid(&row.id)?,
            title: row.title,
            prompt: row.prompt,
            status: StoryState::from_str(&row.status).unwrap_or_default(),
            chapter_count: row.chapter_count as usize,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    #[allow(dead_code)]
    story_id: String,
    number: i64,
    title: String,
    text: Option<String>,
    image: Option<Vec<u8>>,
    audio: Option<Vec<u8>>,
}

impl TryFrom<ChapterRow> for Chapter {
    type Error = RepositoryError;

    /// 章节状态不读存储值，由字段重新推导
    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Chapter::restore(
            ChapterId::from_uuid(parse_uuid(&row.id)?),
            row.number as i32,
            &row.title,
            row.text,
            row.image.map(ImagePayload::new),
            row.audio.map(AudioPayload::new),
        )
        .map_err(serialization_error)
    }
}

#[async_trait]
impl StoryRepositoryPort for SqliteStoryRepository {
    async fn save(&self, story: &Story) -> Result<(), RepositoryError> {
        let story_id = story.id().to_string();

        // 故事和章节在同一事务中整体替换
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO stories (id, title, prompt, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                prompt = excluded.prompt,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&story_id)
        .bind(story.title().as_str())
        .bind(story.prompt().as_str())
        .bind(story.status().as_str())
        .bind(story.created_at().to_rfc3339())
        .bind(story.updated_at().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        replace_chapters(&mut tx, &story_id, story).await?;

        tx.commit().await.map_err(db_error)?;

        tracing::debug!(
            story_id = %story_id,
            chapters = story.chapter_count(),
            status = %story.status(),
            "Story saved"
        );
        Ok(())
    }

    async fn update(&self, story: &Story) -> Result<(), RepositoryError> {
        let story_id = story.id().to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            "UPDATE stories SET title = ?, prompt = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(story.title().as_str())
        .bind(story.prompt().as_str())
        .bind(story.status().as_str())
        .bind(story.updated_at().to_rfc3339())
        .bind(&story_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // 故事行已被删除：回滚，不重新插入章节
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db_error)?;
            return Err(RepositoryError::NotFound(*story.id().as_uuid()));
        }

        replace_chapters(&mut tx, &story_id, story).await?;
        tx.commit().await.map_err(db_error)?;

        tracing::debug!(story_id = %story_id, status = %story.status(), "Story updated");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Story>, RepositoryError> {
        let row: Option<StoryRow> = sqlx::query_as(
            "SELECT id, title, prompt, status, created_at, updated_at FROM stories WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let chapters = self.load_chapters(&row.id).await?;
        let story = Story::restore(
            StoryId::from_uuid(parse_uuid(&row.id)?),
            Title::new(row.title).map_err(serialization_error)?,
            Prompt::new(row.prompt).map_err(serialization_error)?,
            chapters,
            StoryState::from_str(&row.status).unwrap_or_default(),
            parse_time(&row.created_at)?,
            parse_time(&row.updated_at)?,
        )
        .map_err(serialization_error)?;

        Ok(Some(story))
    }

    async fn find_all(&self) -> Result<Vec<StoryRecord>, RepositoryError> {
        let rows: Vec<StorySummaryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.title, s.prompt, s.status, s.created_at, s.updated_at,
                   (SELECT COUNT(*) FROM chapters c WHERE c.story_id = s.id) AS chapter_count
            FROM stories s
            ORDER BY s.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(StoryRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        // 使用事务确保原子性
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM chapters WHERE story_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_chapter(&self, chapter_id: Uuid) -> Result<Option<Chapter>, RepositoryError> {
        let row: Option<ChapterRow> = sqlx::query_as(
            "SELECT id, story_id, number, title, text, image, audio FROM chapters WHERE id = ?",
        )
        .bind(chapter_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Chapter::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn repo() -> SqliteStoryRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStoryRepository::new(pool)
    }

    fn story(numbers: &[i32]) -> Story {
        let mut story = Story::new(Title::new("Salt Road").unwrap(), Prompt::new("a caravan").unwrap());
        story
            .add_chapters(
                numbers
                    .iter()
                    .map(|n| Chapter::new(*n, &format!("Leg {}", n), Some(format!("Day {}.", n))).unwrap())
                    .collect(),
            )
            .unwrap();
        story.recompute_status();
        story
    }

    #[tokio::test]
    async fn test_save_and_load_story() {
        let repo = repo().await;
        let mut story = story(&[2, 1]);
        let chapter_id = story.chapter_by_number(1).unwrap().id();
        let chapter = story.chapter_mut(chapter_id).unwrap();
        chapter.attach_image(ImagePayload::new(vec![0x89, b'P', b'N', b'G'])).unwrap();
        chapter.attach_audio(AudioPayload::new(vec![b'I', b'D', b'3'])).unwrap();
        story.recompute_status();

        repo.save(&story).await.unwrap();
        let loaded = repo.find_by_id(*story.id().as_uuid()).await.unwrap().unwrap();

        assert_eq!(loaded.id(), story.id());
        assert_eq!(loaded.title(), story.title());
        assert_eq!(loaded.status(), StoryState::Partial);
        assert_eq!(loaded.created_at(), story.created_at());
        let numbers: Vec<i32> = loaded.sorted_chapters().iter().map(|c| c.number()).collect();
        assert_eq!(numbers, vec![1, 2]);

        let first = loaded.chapter_by_number(1).unwrap();
        assert_eq!(first.status(), StoryState::Full);
        assert_eq!(first.image().unwrap().as_bytes(), &[0x89, b'P', b'N', b'G']);
        assert_eq!(first.audio().unwrap().len(), 3);
        assert_eq!(first, story.chapter_by_number(1).unwrap());
    }

    #[tokio::test]
    async fn test_save_overwrites_chapters() {
        let repo = repo().await;
        let mut story = story(&[1]);
        repo.save(&story).await.unwrap();

        let chapter_id = story.chapter_by_number(1).unwrap().id();
        story
            .chapter_mut(chapter_id)
            .unwrap()
            .attach_audio(AudioPayload::new(vec![1, 2, 3]))
            .unwrap();
        story.recompute_status();
        repo.save(&story).await.unwrap();

        let chapter = repo.find_chapter(*chapter_id.as_uuid()).await.unwrap().unwrap();
        assert!(chapter.has_audio());
        assert_eq!(chapter.status(), StoryState::Partial);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_all_counts_chapters() {
        let repo = repo().await;
        repo.save(&story(&[1, 2, 3])).await.unwrap();
        repo.save(&story(&[1])).await.unwrap();

        let mut counts: Vec<usize> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.chapter_count)
            .collect();
        counts.sort();
        assert_eq!(counts, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_chapters() {
        let repo = repo().await;
        let story = story(&[1, 2, 3]);
        repo.save(&story).await.unwrap();
        let chapter_ids: Vec<Uuid> = story.sorted_chapters().iter().map(|c| *c.id().as_uuid()).collect();

        assert!(repo.delete(*story.id().as_uuid()).await.unwrap());

        assert!(repo.find_by_id(*story.id().as_uuid()).await.unwrap().is_none());
        for id in chapter_ids {
            assert!(repo.find_chapter(id).await.unwrap().is_none());
        }
        assert!(!repo.delete(*story.id().as_uuid()).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_after_delete_is_not_found() {
        let repo = repo().await;
        let mut story = story(&[1, 2]);
        let story_id = *story.id().as_uuid();
        repo.save(&story).await.unwrap();

        let chapter_id = story.chapter_by_number(2).unwrap().id();
        story
            .chapter_mut(chapter_id)
            .unwrap()
            .attach_image(ImagePayload::new(vec![1, 2]))
            .unwrap();
        story.recompute_status();
        repo.update(&story).await.unwrap();
        assert!(repo.find_chapter(*chapter_id.as_uuid()).await.unwrap().unwrap().has_image());

        assert!(repo.delete(story_id).await.unwrap());
        assert!(matches!(
            repo.update(&story).await,
            Err(RepositoryError::NotFound(id)) if id == story_id
        ));
        assert!(repo.find_by_id(story_id).await.unwrap().is_none());
        assert!(repo.find_chapter(*chapter_id.as_uuid()).await.unwrap().is_none());
        assert!(repo.find_all().await.unwrap().is_empty());
    }
}
