//! Memory Layer - In-Memory State Management
//!
//! 生成任务跟踪（JobTracker）的内存实现，以及用于测试和离线运行的内存故事仓储

mod job_tracker;
mod story_repo;

pub use job_tracker::InMemoryJobTracker;
pub use story_repo::InMemoryStoryRepository;
