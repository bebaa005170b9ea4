//! Domain Layer - 领域层
//!
//! 只有一个限界上下文:
//! - Story Context: 故事、章节与完成度状态

pub mod story;
