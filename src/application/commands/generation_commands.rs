//! Chapter Generation Commands

use uuid::Uuid;

use crate::application::ports::AssetKind;
use crate::domain::story::NarrationVoice;

/// 为章节生成插图
#[derive(Debug, Clone)]
pub struct GenerateChapterImage {
    pub story_id: Uuid,
    pub chapter_number: i32,
}

/// 为章节生成朗读音频
#[derive(Debug, Clone)]
pub struct GenerateChapterAudio {
    pub story_id: Uuid,
    pub chapter_number: i32,
    /// 为空时使用配置的默认音色
    pub voice: Option<NarrationVoice>,
}

/// 后台提交生成任务，立即返回任务信息
#[derive(Debug, Clone)]
pub struct SubmitChapterGeneration {
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub kind: AssetKind,
    pub voice: Option<NarrationVoice>,
}
