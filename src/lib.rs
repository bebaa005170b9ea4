//! Storyloom - AI 分章故事生成服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Story Context: 故事、章节与完成度状态（NotDeveloped / Partial / Full）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（GenerationClient, StoryRepository, JobTracker, AssetWriter）
//! - Commands: CQRS 命令处理器（创建故事、生成插图与朗读、回写资源）
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Memory: JobTracker 与内存版 StoryRepository
//! - Worker: ReconcileWorker 串行回写生成结果
//! - Persistence: SQLite 存储
//! - Adapters: OpenAI 生成客户端与 Fake 客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
