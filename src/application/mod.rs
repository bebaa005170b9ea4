//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（GenerationClient、StoryRepository、JobTracker、AssetWriter）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Story commands
    CreateStory,
    DeleteStory,
    // Generation commands
    GenerateChapterAudio,
    GenerateChapterImage,
    SubmitChapterGeneration,
    // Handlers
    handlers::{
        ApplyGeneratedAssetHandler, CreateStoryHandler, DeleteStoryHandler, GenerateChapterAudioHandler,
        GenerateChapterImageHandler, SubmitChapterGenerationHandler, SubmittedGeneration,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Asset writer
    ApplyGeneratedAsset,
    AssetApplied,
    AssetWriterPort,
    GeneratedAsset,
    // Generation client
    GenerationClientPort,
    GenerationError,
    // Job tracker
    AssetKind,
    GenerationJob,
    JobError,
    JobState,
    JobTrackerPort,
    // Repositories
    RepositoryError,
    StoryRecord,
    StoryRepositoryPort,
};

pub use queries::{
    // Story queries
    GetChapter,
    GetStory,
    ListStories,
    // Asset queries
    GetChapterAsset,
    GetChapterAssetResponse,
    // Job queries
    GetJobStatus,
    // Handlers
    handlers::{
        ChapterDetailResponse, ChapterSummaryResponse, GetChapterAssetHandler, GetChapterHandler,
        GetJobStatusHandler, GetStoryHandler, ListStoriesHandler, StoryDetailResponse, StorySummaryResponse,
    },
};
