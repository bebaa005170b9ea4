//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::domain::story::NarrationVoice;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI 接口配置
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// 生成参数
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（字节）
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// 关闭时等待回写队列的秒数
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_drain_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            drain_timeout_secs: default_drain_timeout(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// OpenAI 接口配置
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// API 基础 URL（含 /v1）
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// API Key，为空时回退到 OPENAI_API_KEY 环境变量
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_speech_model")]
    pub speech_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 插图尺寸
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_openai_timeout() -> u64 {
    120
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: String::new(),
            chat_model: default_chat_model(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            image_size: default_image_size(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

/// 生成客户端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationClientKind {
    /// 调用 OpenAI
    #[default]
    OpenAi,
    /// 本地假数据（开发与演示用）
    Fake,
}

/// 生成参数
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub client: GenerationClientKind,

    /// 单个故事最多章节数
    #[serde(default = "default_max_chapters")]
    pub max_chapters: u32,

    /// 未指定音色时使用的朗读音色
    #[serde(default)]
    pub default_voice: NarrationVoice,
}

fn default_max_chapters() -> u32 {
    5
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            client: GenerationClientKind::default(),
            max_chapters: default_max_chapters(),
            default_voice: NarrationVoice::default(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径，`memory` 表示使用进程内存储
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/storyloom.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    pub const MEMORY: &'static str = "memory";

    /// 是否使用进程内存储
    pub fn is_memory(&self) -> bool {
        self.path.eq_ignore_ascii_case(Self::MEMORY)
    }

    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5080);
        assert_eq!(config.server.max_body_bytes, 64 * 1024);
        assert_eq!(config.server.drain_timeout_secs, 30);
        assert_eq!(config.openai.chat_model, "gpt-4");
        assert_eq!(config.generation.client, GenerationClientKind::OpenAi);
        assert_eq!(config.generation.max_chapters, 5);
        assert_eq!(config.generation.default_voice, NarrationVoice::Alloy);
        assert_eq!(config.database.path, "data/storyloom.db");
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(ServerConfig::default().addr(), "0.0.0.0:5080");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/storyloom.db?mode=rwc");
        assert!(!config.is_memory());

        let memory = DatabaseConfig {
            path: "Memory".to_string(),
            ..Default::default()
        };
        assert!(memory.is_memory());
    }
}
