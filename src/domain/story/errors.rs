//! Story Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryError {
    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的章节编号: {0}")]
    InvalidChapterNumber(i32),

    #[error("章节编号重复: {0}")]
    DuplicateChapterNumber(i32),

    #[error("无效的资源数据: {0}")]
    InvalidPayload(String),
}
