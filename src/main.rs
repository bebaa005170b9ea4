//! Storyloom - AI 分章故事生成服务
//!
//! 启动流程：加载配置 → 初始化日志 → 组装端口实现 → 启动回写 Worker → 启动 HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use storyloom::application::{GenerationClientPort, StoryRepositoryPort};
use storyloom::config::{load_config, print_config, AppConfig, GenerationClientKind};
use storyloom::infrastructure::adapters::{
    FakeGenerationClient, OpenAiClientConfig, OpenAiGenerationClient,
};
use storyloom::infrastructure::http::{AppState, GenerationSettings, HttpServer, ServerConfig};
use storyloom::infrastructure::memory::{InMemoryJobTracker, InMemoryStoryRepository};
use storyloom::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteStoryRepository,
};
use storyloom::infrastructure::worker::ReconcileWorker;

/// 回写队列容量
const RECONCILE_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().context("Failed to load config")?;

    init_tracing(&config);

    tracing::info!("Storyloom - AI 分章故事生成服务");
    print_config(&config);

    let story_repo = build_story_repository(&config).await?;
    let client = build_generation_client(&config)?;
    let job_tracker = InMemoryJobTracker::new().arc();

    // 所有生成结果经由单一 Worker 串行写回，Worker 由 HttpServer 启动和收尾
    let (worker, reconcile_handle) = ReconcileWorker::new(story_repo.clone(), RECONCILE_QUEUE_CAPACITY);

    let settings = GenerationSettings {
        max_chapters: config.generation.max_chapters,
        default_voice: config.generation.default_voice,
    };
    let state = AppState::new(
        story_repo,
        job_tracker,
        client,
        Arc::new(reconcile_handle),
        settings,
    );

    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_body_limit(config.server.max_body_bytes)
        .with_drain_timeout(Duration::from_secs(config.server.drain_timeout_secs));
    let server = HttpServer::new(server_config, state).with_reconcile_worker(worker);

    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},storyloom={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_story_repository(config: &AppConfig) -> anyhow::Result<Arc<dyn StoryRepositoryPort>> {
    if config.database.is_memory() {
        tracing::warn!("Using in-memory story storage, stories are lost on restart");
        return Ok(Arc::new(InMemoryStoryRepository::new()));
    }

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }

    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await.context("Failed to open database")?;
    run_migrations(&pool).await.context("Failed to run migrations")?;

    Ok(Arc::new(SqliteStoryRepository::new(pool)))
}

fn build_generation_client(config: &AppConfig) -> anyhow::Result<Arc<dyn GenerationClientPort>> {
    match config.generation.client {
        GenerationClientKind::Fake => {
            tracing::warn!("Using fake generation client, no OpenAI requests will be made");
            Ok(Arc::new(FakeGenerationClient::new()))
        }
        GenerationClientKind::OpenAi => {
            let openai = &config.openai;
            let client_config = OpenAiClientConfig {
                base_url: openai.base_url.clone(),
                api_key: openai.api_key.clone(),
                chat_model: openai.chat_model.clone(),
                image_model: openai.image_model.clone(),
                speech_model: openai.speech_model.clone(),
                temperature: openai.temperature,
                max_tokens: openai.max_tokens,
                image_size: openai.image_size.clone(),
                timeout_secs: openai.timeout_secs,
            };
            let client = OpenAiGenerationClient::new(client_config)
                .context("Failed to create OpenAI client")?;
            Ok(Arc::new(client))
        }
    }
}
