//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{GenerationError, JobError, RepositoryError};
use crate::domain::story::StoryError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 资源冲突（如章节已有进行中的生成）
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 生成服务错误（保留原始分类）
    #[error("Generation failed: {0}")]
    Generation(GenerationError),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建 NotFound 错误（使用字符串 ID）
    pub fn not_found_str(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 错误分类（写入任务记录）
    pub fn kind(&self) -> &'static str {
        match self {
            ApplicationError::NotFound { .. } => "not_found",
            ApplicationError::ValidationError(_) => "validation",
            ApplicationError::Conflict(_) => "conflict",
            ApplicationError::InvalidState(_) => "invalid_state",
            ApplicationError::Generation(e) => e.kind(),
            ApplicationError::RepositoryError(_) => "repository",
            ApplicationError::InternalError(_) => "internal",
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::not_found("Story", id),
            other => Self::RepositoryError(other.to_string()),
        }
    }
}

impl From<GenerationError> for ApplicationError {
    fn from(err: GenerationError) -> Self {
        Self::Generation(err)
    }
}

impl From<StoryError> for ApplicationError {
    fn from(err: StoryError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => Self::not_found("Job", id),
            busy @ JobError::ChapterBusy { .. } => Self::Conflict(busy.to_string()),
        }
    }
}
