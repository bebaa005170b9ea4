//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod asset_queries;
mod job_queries;
mod story_queries;

pub mod handlers;

pub use asset_queries::*;
pub use job_queries::*;
pub use story_queries::*;
