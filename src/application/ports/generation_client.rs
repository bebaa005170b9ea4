//! Generation Client Port - 生成式 AI 服务抽象
//!
//! 文本、插图、朗读三类生成请求的抽象接口，具体实现在 infrastructure/adapters 层。
//! 任何失败都不会自动重试，也不会修改调用方的故事或章节。

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::story::{
    AudioPayload, Chapter, ImagePayload, NarrationVoice, Prompt, Story, Title,
};

/// 生成错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// 本地输入不合法，尚未发出请求
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 传输层错误
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// 响应结构不符合预期
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 上游内容策略拒绝
    #[error("Upstream refusal: {0}")]
    UpstreamRefusal(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::NetworkFailure(_) => "network_failure",
            GenerationError::MalformedResponse(_) => "malformed_response",
            GenerationError::UpstreamRefusal(_) => "upstream_refusal",
        }
    }
}

/// Generation Client Port
#[async_trait]
pub trait GenerationClientPort: Send + Sync {
    /// 根据提示词一次性生成故事标题和全部章节文本
    async fn generate_story_and_chapters(
        &self,
        prompt: &str,
        chapter_count: u32,
    ) -> Result<Story, GenerationError>;

    /// 为章节生成插图
    async fn generate_chapter_image(
        &self,
        story_title: &str,
        chapter_count: usize,
        chapter: &Chapter,
    ) -> Result<ImagePayload, GenerationError>;

    /// 朗读章节文本
    async fn generate_chapter_audio(
        &self,
        chapter: &Chapter,
        voice: NarrationVoice,
    ) -> Result<AudioPayload, GenerationError>;
}

/// 发请求前的故事参数校验
pub fn validate_story_request(prompt: &str, chapter_count: u32) -> Result<(), GenerationError> {
    Prompt::new(prompt).map_err(|e| GenerationError::InvalidRequest(e.to_string()))?;
    if chapter_count == 0 {
        return Err(GenerationError::InvalidRequest(
            "chapter count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// 模型返回的故事结构
///
/// `{storyTitle, chapters:[{chapterNumber, chapterTitle, chapterContent}]}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    pub story_title: String,
    pub chapters: Vec<ChapterDraft>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDraft {
    pub chapter_number: i32,
    pub chapter_title: String,
    pub chapter_content: String,
}

impl StoryDraft {
    /// 解析模型输出，容忍外层的 Markdown 代码块
    pub fn parse(content: &str) -> Result<Self, GenerationError> {
        let json = strip_code_fence(content);
        serde_json::from_str(json).map_err(|e| {
            GenerationError::MalformedResponse(format!("story content is not valid JSON: {}", e))
        })
    }

    /// 转换为 Story 聚合，章节和状态一并建立
    pub fn into_story(self, prompt: &str) -> Result<Story, GenerationError> {
        let title = Title::new(self.story_title)
            .map_err(|e| GenerationError::MalformedResponse(format!("story title: {}", e)))?;
        let prompt = Prompt::new(prompt).map_err(|e| GenerationError::InvalidRequest(e.to_string()))?;

        if self.chapters.is_empty() {
            return Err(GenerationError::MalformedResponse(
                "story has no chapters".to_string(),
            ));
        }

        let chapters = self
            .chapters
            .into_iter()
            .map(|c| Chapter::new(c.chapter_number, &c.chapter_title, Some(c.chapter_content)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let mut story = Story::new(title, prompt);
        story
            .add_chapters(chapters)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        story.recompute_status();
        Ok(story)
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 跳过语言标记（如 ```json）
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
