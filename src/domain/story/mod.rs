//! Story Context - 故事限界上下文
//!
//! 职责:
//! - 故事聚合与章节实体
//! - 完成度状态计算
//! - 章节序号标签与导航规则

mod aggregate;
mod entities;
mod errors;
mod status;
mod value_objects;

pub use aggregate::Story;
pub use entities::{ordinal_label, Chapter};
pub use errors::StoryError;
pub use status::{compute_chapter_status, compute_story_status, StoryState};
pub use value_objects::{
    AudioPayload, ChapterId, ImagePayload, NarrationVoice, Prompt, StoryId, Title,
};
