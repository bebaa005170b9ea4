//! OpenAI Generation Client - 调用 OpenAI HTTP API
//!
//! 实现 GenerationClientPort trait
//!
//! 使用的接口:
//! POST {base_url}/chat/completions    故事标题和章节文本（JSON 输出）
//! POST {base_url}/images/generations  插图，返回图片 URL 后再下载
//! POST {base_url}/audio/speech        朗读，直接返回 mp3

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{validate_story_request, GenerationClientPort, GenerationError, StoryDraft};
use crate::domain::story::{AudioPayload, Chapter, ImagePayload, NarrationVoice, Story};

/// 朗读接口单次输入的字符上限
pub const SPEECH_INPUT_LIMIT: usize = 4096;

/// 插图提示词里引用章节正文的最大字符数
const IMAGE_EXCERPT_CHARS: usize = 600;

const SYSTEM_PROMPT: &str = r#"You are a system that returns structured JSON output only. We are writing stories given a prompt and number of chapters. Never include any additional filler text, explanations, or formatting outside of JSON. Always follow this JSON format:
{
    "storyTitle": "string",
    "chapters": [
        {
            "chapterNumber": "integer",
            "chapterTitle": "string",
            "chapterContent": "string"
        }
    ]
}"#;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: String,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// OpenAI 客户端配置
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    /// API 基础 URL（含 /v1）
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub image_model: String,
    pub speech_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// 插图尺寸，如 1024x1024
    pub image_size: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4".to_string(),
            image_model: "dall-e-3".to_string(),
            speech_model: "tts-1".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            image_size: "1024x1024".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OpenAiClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// OpenAI 生成客户端
pub struct OpenAiGenerationClient {
    client: Client,
    config: OpenAiClientConfig,
}

impl OpenAiGenerationClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NetworkFailure(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, GenerationError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending OpenAI request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response).await
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::NetworkFailure(format!("request timed out: {}", e))
    } else if e.is_connect() {
        GenerationError::NetworkFailure(format!("cannot connect to generation service: {}", e))
    } else {
        GenerationError::NetworkFailure(e.to_string())
    }
}

/// 非 2xx 响应按错误体分类
async fn ensure_success(response: Response) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &text))
}

fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());

    let refused = parsed.as_ref().is_some_and(|e| {
        e.code.as_deref() == Some("content_policy_violation")
            || e.kind.as_deref() == Some("content_policy_violation")
    });

    if refused {
        GenerationError::UpstreamRefusal(message)
    } else if status == StatusCode::BAD_REQUEST {
        GenerationError::InvalidRequest(message)
    } else {
        GenerationError::NetworkFailure(format!("HTTP {}: {}", status, message))
    }
}

/// 按字符截断，不切断多字节字符
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn image_prompt(story_title: &str, chapter_count: usize, chapter: &Chapter) -> String {
    let mut prompt = format!(
        "A storybook illustration for chapter {} of {} of the story \"{}\", titled \"{}\".",
        chapter.number(),
        chapter_count,
        story_title,
        chapter.title()
    );
    if let Some(text) = chapter.text() {
        prompt.push_str(" Scene: ");
        prompt.push_str(truncate_chars(text, IMAGE_EXCERPT_CHARS));
    }
    prompt
}

#[async_trait]
impl GenerationClientPort for OpenAiGenerationClient {
    async fn generate_story_and_chapters(
        &self,
        prompt: &str,
        chapter_count: u32,
    ) -> Result<Story, GenerationError> {
        validate_story_request(prompt, chapter_count)?;

        let user_prompt = format!(
            "Create a story based on: '{}' with {} chapters. Make a creative story title. Each chapter should have a title and content.",
            prompt.trim(),
            chapter_count
        );
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response: ChatResponse = self
            .post_json("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(format!("chat response: {}", e)))?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| GenerationError::MalformedResponse("no choices in chat response".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(GenerationError::UpstreamRefusal(refusal));
        }
        let content = message
            .content
            .ok_or_else(|| GenerationError::MalformedResponse("assistant message has no content".to_string()))?;

        let story = StoryDraft::parse(&content)?.into_story(prompt)?;

        if story.chapter_count() != chapter_count as usize {
            tracing::warn!(
                requested = chapter_count,
                received = story.chapter_count(),
                "Chapter count differs from request"
            );
        }
        tracing::info!(
            story_id = %story.id(),
            title = %story.title(),
            chapters = story.chapter_count(),
            "Story text generated"
        );

        Ok(story)
    }

    async fn generate_chapter_image(
        &self,
        story_title: &str,
        chapter_count: usize,
        chapter: &Chapter,
    ) -> Result<ImagePayload, GenerationError> {
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt: image_prompt(story_title, chapter_count, chapter),
            n: 1,
            size: &self.config.image_size,
        };

        let response: ImageResponse = self
            .post_json("images/generations", &request)
            .await?
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(format!("image response: {}", e)))?;

        let url = response
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| GenerationError::MalformedResponse("image response has no data".to_string()))?;

        // 图片 URL 是预签名地址，不带认证头
        let download = self.client.get(&url).send().await.map_err(transport_error)?;
        let bytes = ensure_success(download)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;

        if bytes.is_empty() {
            return Err(GenerationError::MalformedResponse("downloaded image is empty".to_string()));
        }

        tracing::info!(
            chapter_number = chapter.number(),
            image_size = bytes.len(),
            "Chapter image generated"
        );
        Ok(ImagePayload::new(bytes.to_vec()))
    }

    async fn generate_chapter_audio(
        &self,
        chapter: &Chapter,
        voice: NarrationVoice,
    ) -> Result<AudioPayload, GenerationError> {
        let text = chapter.text().ok_or_else(|| {
            GenerationError::InvalidRequest(format!("chapter {} has no text to narrate", chapter.number()))
        })?;

        let input = truncate_chars(text, SPEECH_INPUT_LIMIT);
        if input.len() < text.len() {
            tracing::warn!(
                chapter_number = chapter.number(),
                chars = text.chars().count(),
                limit = SPEECH_INPUT_LIMIT,
                "Chapter text truncated for narration"
            );
        }

        let request = SpeechRequest {
            model: &self.config.speech_model,
            input,
            voice: voice.as_str(),
            response_format: "mp3",
        };

        let bytes = self
            .post_json("audio/speech", &request)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;

        if bytes.is_empty() {
            return Err(GenerationError::MalformedResponse("speech response is empty".to_string()));
        }

        tracing::info!(
            chapter_number = chapter.number(),
            voice = %voice,
            audio_size = bytes.len(),
            "Chapter audio generated"
        );
        Ok(AudioPayload::new(bytes.to_vec()))
    }
}
