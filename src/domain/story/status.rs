//! Story Context - 完成度状态模型

use serde::{Deserialize, Serialize};

/// 内容完成度
///
/// 三个取值之间没有数值上的大小关系，`Partial` 只表示介于两端之间。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    /// 尚未生成任何内容
    NotDeveloped,
    /// 部分生成
    Partial,
    /// 图片和音频均已生成
    Full,
}

impl StoryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryState::NotDeveloped => "not_developed",
            StoryState::Partial => "partial",
            StoryState::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_developed" => Some(StoryState::NotDeveloped),
            "partial" => Some(StoryState::Partial),
            "full" => Some(StoryState::Full),
            _ => None,
        }
    }

    /// 展示用文案
    pub fn description(&self) -> &'static str {
        match self {
            StoryState::NotDeveloped => "Not developed",
            StoryState::Partial => "Partially developed",
            StoryState::Full => "Fully developed",
        }
    }
}

impl Default for StoryState {
    fn default() -> Self {
        StoryState::NotDeveloped
    }
}

impl std::fmt::Display for StoryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计算章节状态
///
/// 文本也算作已生成的内容：
/// - 图片和音频都存在 => `Full`
/// - 文本、图片、音频都不存在 => `NotDeveloped`
/// - 其余情况 => `Partial`
pub fn compute_chapter_status(has_text: bool, has_image: bool, has_audio: bool) -> StoryState {
    match (has_text, has_image, has_audio) {
        (_, true, true) => StoryState::Full,
        (false, false, false) => StoryState::NotDeveloped,
        _ => StoryState::Partial,
    }
}

/// 根据所有章节状态计算故事状态
///
/// 没有章节时为 `NotDeveloped`；全部章节 `Full` 时为 `Full`；否则为 `Partial`。
pub fn compute_story_status<I>(chapter_statuses: I) -> StoryState
where
    I: IntoIterator<Item = StoryState>,
{
    let mut any = false;
    let mut all_full = true;

    for status in chapter_statuses {
        any = true;
        if status != StoryState::Full {
            all_full = false;
        }
    }

    match (any, all_full) {
        (false, _) => StoryState::NotDeveloped,
        (true, true) => StoryState::Full,
        (true, false) => StoryState::Partial,
    }
}
