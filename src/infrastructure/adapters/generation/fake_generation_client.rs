//! Fake Generation Client - 离线生成客户端
//!
//! 不调用任何外部服务，返回确定性的文本和字节。可按章节注入失败和延迟，
//! 供测试和无 API Key 的本地运行使用（`generation.client = "fake"`）。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::application::ports::{validate_story_request, ChapterDraft, GenerationClientPort, GenerationError, StoryDraft};
use crate::domain::story::{AudioPayload, Chapter, ImagePayload, NarrationVoice, Story};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Fake Generation Client
#[derive(Default)]
pub struct FakeGenerationClient {
    story_failure: RwLock<Option<GenerationError>>,
    image_failures: DashMap<i32, GenerationError>,
    audio_failures: DashMap<i32, GenerationError>,
    image_delays: DashMap<i32, Duration>,
    audio_delays: DashMap<i32, Duration>,
    story_calls: AtomicUsize,
    image_calls: AtomicUsize,
    audio_calls: AtomicUsize,
}

impl FakeGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后所有故事生成都返回该错误
    pub fn fail_story(&self, error: GenerationError) {
        if let Ok(mut slot) = self.story_failure.write() {
            *slot = Some(error);
        }
    }

    pub fn fail_image(&self, chapter_number: i32, error: GenerationError) {
        self.image_failures.insert(chapter_number, error);
    }

    pub fn fail_audio(&self, chapter_number: i32, error: GenerationError) {
        self.audio_failures.insert(chapter_number, error);
    }

    pub fn delay_image(&self, chapter_number: i32, delay: Duration) {
        self.image_delays.insert(chapter_number, delay);
    }

    pub fn delay_audio(&self, chapter_number: i32, delay: Duration) {
        self.audio_delays.insert(chapter_number, delay);
    }

    /// 清除所有注入的失败
    pub fn clear_failures(&self) {
        if let Ok(mut slot) = self.story_failure.write() {
            *slot = None;
        }
        self.image_failures.clear();
        self.audio_failures.clear();
    }

    pub fn story_calls(&self) -> usize {
        self.story_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }

    async fn pause(delays: &DashMap<i32, Duration>, chapter_number: i32) {
        // 先复制出来，避免跨 await 持有分片锁
        let delay = delays.get(&chapter_number).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected(failures: &DashMap<i32, GenerationError>, chapter_number: i32) -> Result<(), GenerationError> {
    match failures.get(&chapter_number) {
        Some(error) => Err(error.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl GenerationClientPort for FakeGenerationClient {
    async fn generate_story_and_chapters(
        &self,
        prompt: &str,
        chapter_count: u32,
    ) -> Result<Story, GenerationError> {
        validate_story_request(prompt, chapter_count)?;
        self.story_calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.story_failure.read().ok().and_then(|slot| slot.clone());
        if let Some(error) = failure {
            return Err(error);
        }

        let subject = prompt.trim();
        let draft = StoryDraft {
            story_title: format!("The Tale of {}", subject.chars().take(60).collect::<String>()),
            chapters: (1..=chapter_count as i32)
                .map(|number| ChapterDraft {
                    chapter_number: number,
                    chapter_title: format!("Chapter {}", number),
                    chapter_content: format!(
                        "Part {} of {} in a story about {}.",
                        number, chapter_count, subject
                    ),
                })
                .collect(),
        };

        tracing::debug!(chapter_count = chapter_count, "FakeGenerationClient: returning fixed story");
        draft.into_story(prompt)
    }

    async fn generate_chapter_image(
        &self,
        story_title: &str,
        _chapter_count: usize,
        chapter: &Chapter,
    ) -> Result<ImagePayload, GenerationError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Self::pause(&self.image_delays, chapter.number()).await;
        injected(&self.image_failures, chapter.number())?;

        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(story_title.as_bytes());
        bytes.extend_from_slice(&chapter.number().to_be_bytes());

        tracing::debug!(chapter_number = chapter.number(), "FakeGenerationClient: returning fixed image");
        Ok(ImagePayload::new(bytes))
    }

    async fn generate_chapter_audio(
        &self,
        chapter: &Chapter,
        voice: NarrationVoice,
    ) -> Result<AudioPayload, GenerationError> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        let text = chapter.text().ok_or_else(|| {
            GenerationError::InvalidRequest(format!("chapter {} has no text to narrate", chapter.number()))
        })?;
        Self::pause(&self.audio_delays, chapter.number()).await;
        injected(&self.audio_failures, chapter.number())?;

        // ID3 头 + 音色 + 文本长度
        let mut bytes = b"ID3".to_vec();
        bytes.extend_from_slice(voice.as_str().as_bytes());
        bytes.extend_from_slice(&(text.chars().count() as u32).to_be_bytes());

        tracing::debug!(
            chapter_number = chapter.number(),
            voice = %voice,
            "FakeGenerationClient: returning fixed audio"
        );
        Ok(AudioPayload::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::story::StoryState;

    #[tokio::test]
    async fn test_story_is_deterministic_text_only() {
        let client = FakeGenerationClient::new();
        let story = client.generate_story_and_chapters("a paper crane", 3).await.unwrap();

        assert_eq!(story.title().as_str(), "The Tale of a paper crane");
        assert_eq!(story.chapter_count(), 3);
        assert_eq!(story.status(), StoryState::Partial);
        assert_eq!(client.story_calls(), 1);
    }

    #[tokio::test]
    async fn test_payloads_carry_format_signatures() {
        let client = FakeGenerationClient::new();
        let chapter = Chapter::new(2, "Two", Some("words".to_string())).unwrap();

        let image = client.generate_chapter_image("T", 2, &chapter).await.unwrap();
        assert!(image.as_bytes().starts_with(&PNG_SIGNATURE));

        let audio = client.generate_chapter_audio(&chapter, NarrationVoice::Fable).await.unwrap();
        assert!(audio.as_bytes().starts_with(b"ID3fable"));
    }

    #[tokio::test]
    async fn test_injected_failures_are_per_chapter() {
        let client = FakeGenerationClient::new();
        client.fail_image(1, GenerationError::NetworkFailure("offline".to_string()));
        let first = Chapter::new(1, "One", Some("a".to_string())).unwrap();
        let second = Chapter::new(2, "Two", Some("b".to_string())).unwrap();

        assert!(client.generate_chapter_image("T", 2, &first).await.is_err());
        assert!(client.generate_chapter_image("T", 2, &second).await.is_ok());
        assert_eq!(client.image_calls(), 2);

        client.clear_failures();
        assert!(client.generate_chapter_image("T", 2, &first).await.is_ok());
    }

    #[tokio::test]
    async fn test_audio_requires_text() {
        let client = FakeGenerationClient::new();
        let blank = Chapter::new(1, "Blank", None).unwrap();
        let err = client
            .generate_chapter_audio(&blank, NarrationVoice::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }
}
