//! Story Context - Entities

use serde::{Deserialize, Serialize};

use super::{compute_chapter_status, AudioPayload, ChapterId, ImagePayload, StoryError, StoryState, Title};

/// 章节序号的文字标签，只覆盖 1..=5，其余返回空串
pub fn ordinal_label(number: i32) -> &'static str {
    const LABELS: [&str; 5] = ["ONE", "TWO", "THREE", "FOUR", "FIVE"];

    match number {
        1..=5 => LABELS[(number - 1) as usize],
        _ => "",
    }
}

/// 章节
///
/// 不变量:
/// - number 为正整数，在 Story 内唯一
/// - status 始终由 text/image/audio 是否存在推导而来
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    id: ChapterId,
    number: i32,
    title: Title,
    text: Option<String>,
    image: Option<ImagePayload>,
    audio: Option<AudioPayload>,
    status: StoryState,
}

impl Chapter {
    /// 创建新章节（通常只有文本）
    pub fn new(number: i32, title: &str, text: Option<String>) -> Result<Self, StoryError> {
        Self::restore(ChapterId::new(), number, title, text, None, None)
    }

    /// 从持久化数据恢复章节
    pub fn restore(
        id: ChapterId,
        number: i32,
        title: &str,
        text: Option<String>,
        image: Option<ImagePayload>,
        audio: Option<AudioPayload>,
    ) -> Result<Self, StoryError> {
        if number < 1 {
            return Err(StoryError::InvalidChapterNumber(number));
        }
        let title = Title::new(title).map_err(|e| StoryError::InvalidTitle(e.to_string()))?;

        let mut chapter = Self {
            id,
            number,
            title,
            text: text.filter(|t| !t.trim().is_empty()),
            image: image.filter(|p| !p.is_empty()),
            audio: audio.filter(|p| !p.is_empty()),
            status: StoryState::NotDeveloped,
        };
        chapter.refresh_status();
        Ok(chapter)
    }

    /// 替换插图（后写覆盖），返回新的章节状态
    pub fn attach_image(&mut self, payload: ImagePayload) -> Result<StoryState, StoryError> {
        if payload.is_empty() {
            return Err(StoryError::InvalidPayload("image payload is empty".to_string()));
        }
        self.image = Some(payload);
        Ok(self.refresh_status())
    }

    /// 替换朗读音频（后写覆盖），返回新的章节状态
    pub fn attach_audio(&mut self, payload: AudioPayload) -> Result<StoryState, StoryError> {
        if payload.is_empty() {
            return Err(StoryError::InvalidPayload("audio payload is empty".to_string()));
        }
        self.audio = Some(payload);
        Ok(self.refresh_status())
    }

    fn refresh_status(&mut self) -> StoryState {
        self.status = compute_chapter_status(self.has_text(), self.has_image(), self.has_audio());
        self.status
    }

    pub fn ordinal_label(&self) -> &'static str {
        ordinal_label(self.number)
    }

    // Getters
    pub fn id(&self) -> ChapterId {
        self.id
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn audio(&self) -> Option<&AudioPayload> {
        self.audio.as_ref()
    }

    pub fn status(&self) -> StoryState {
        self.status
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}
