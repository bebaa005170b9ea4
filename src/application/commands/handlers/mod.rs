//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod generation_handlers;
mod reconcile_handlers;
mod story_handlers;

pub use generation_handlers::*;
pub use reconcile_handlers::*;
pub use story_handlers::*;
