//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod asset_writer;
mod generation_client;
mod job_tracker;
mod repositories;

pub use asset_writer::{ApplyGeneratedAsset, AssetApplied, AssetWriterPort, GeneratedAsset};
pub use generation_client::{
    validate_story_request, ChapterDraft, GenerationClientPort, GenerationError, StoryDraft,
};
pub use job_tracker::{AssetKind, GenerationJob, JobError, JobState, JobTrackerPort};
pub use repositories::{RepositoryError, StoryRecord, StoryRepositoryPort};
