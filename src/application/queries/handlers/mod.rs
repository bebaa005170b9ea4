//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod asset_handlers;
mod job_handlers;
mod story_handlers;

pub use asset_handlers::*;
pub use job_handlers::*;
pub use story_handlers::*;
