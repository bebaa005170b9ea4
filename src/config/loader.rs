//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, GenerationClientKind};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 未配置 openai.api_key 时读取的环境变量
const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `STORYLOOM_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `STORYLOOM_SERVER__PORT=8080`
/// - `STORYLOOM_OPENAI__CHAT_MODEL=gpt-4o`
/// - `STORYLOOM_GENERATION__CLIENT=fake`
/// - `STORYLOOM_DATABASE__PATH=memory`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5080)?
        .set_default("server.max_body_bytes", 64 * 1024)?
        .set_default("server.drain_timeout_secs", 30)?
        .set_default("generation.client", "openai")?
        .set_default("generation.max_chapters", 5)?
        .set_default("database.path", "data/storyloom.db")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: STORYLOOM_OPENAI__BASE_URL=http://localhost:8080/v1
    builder = builder.add_source(
        Environment::with_prefix("STORYLOOM")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let mut app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    apply_api_key_fallback(&mut app_config, std::env::var(OPENAI_API_KEY_ENV).ok());

    validate_config(&app_config)?;

    Ok(app_config)
}

fn apply_api_key_fallback(config: &mut AppConfig, env_key: Option<String>) {
    if config.openai.api_key.trim().is_empty() {
        if let Some(key) = env_key.filter(|k| !k.trim().is_empty()) {
            config.openai.api_key = key;
        }
    }
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.server.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_body_bytes cannot be 0".to_string(),
        ));
    }

    if config.generation.max_chapters == 0 {
        return Err(ConfigError::ValidationError(
            "generation.max_chapters must be at least 1".to_string(),
        ));
    }

    if config.generation.client == GenerationClientKind::OpenAi {
        if config.openai.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "OpenAI base URL cannot be empty".to_string(),
            ));
        }
        if config.openai.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "OpenAI API key is missing (set openai.api_key or {})",
                OPENAI_API_KEY_ENV
            )));
        }
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        return Err(ConfigError::ValidationError(
            "openai.temperature must be between 0 and 2".to_string(),
        ));
    }

    if config.openai.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "openai.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 只保留前 3 个字符
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let prefix: String = secret.chars().take(3).collect();
    format!("{}***", prefix)
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Shutdown Drain Timeout: {}s", config.server.drain_timeout_secs);
    tracing::info!("Generation Client: {:?}", config.generation.client);
    if config.generation.client == GenerationClientKind::OpenAi {
        tracing::info!("OpenAI URL: {}", config.openai.base_url);
        tracing::info!("OpenAI API Key: {}", mask_secret(&config.openai.api_key));
        tracing::info!(
            "OpenAI Models: chat={} image={} speech={}",
            config.openai.chat_model,
            config.openai.image_model,
            config.openai.speech_model
        );
        tracing::info!("OpenAI Timeout: {}s", config.openai.timeout_secs);
    }
    tracing::info!("Max Chapters: {}", config.generation.max_chapters);
    tracing::info!("Default Voice: {}", config.generation.default_voice);
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::story::NarrationVoice;
    use std::io::Write;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.openai.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn test_validation_passes_for_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = valid_config();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_chapters() {
        let mut config = valid_config();
        config.generation.max_chapters = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_api_key_required_only_for_openai_client() {
        let mut config = AppConfig::default();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));

        config.generation.client = GenerationClientKind::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_temperature_out_of_range() {
        let mut config = valid_config();
        config.openai.temperature = 2.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_api_key_fallback() {
        let mut config = AppConfig::default();
        apply_api_key_fallback(&mut config, Some("sk-env".to_string()));
        assert_eq!(config.openai.api_key, "sk-env");

        // 显式配置优先
        let mut config = valid_config();
        apply_api_key_fallback(&mut config, Some("sk-env".to_string()));
        assert_eq!(config.openai.api_key, "sk-test");

        let mut config = AppConfig::default();
        apply_api_key_fallback(&mut config, Some("  ".to_string()));
        assert!(config.openai.api_key.is_empty());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<unset>");
        assert_eq!(mask_secret("sk-abcdef123456"), "sk-***");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090
drain_timeout_secs = 5

[openai]
api_key = "sk-file"
chat_model = "gpt-4o"

[generation]
client = "fake"
max_chapters = 3
default_voice = "nova"

[database]
path = "memory"
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.drain_timeout_secs, 5);
        assert_eq!(config.server.max_body_bytes, 64 * 1024);
        assert_eq!(config.openai.chat_model, "gpt-4o");
        assert_eq!(config.openai.image_model, "dall-e-3");
        assert_eq!(config.generation.client, GenerationClientKind::Fake);
        assert_eq!(config.generation.max_chapters, 3);
        assert_eq!(config.generation.default_voice, NarrationVoice::Nova);
        assert!(config.database.is_memory());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[generation]\nclient = \"fake\"\nmax_chapters = 0").unwrap();

        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
