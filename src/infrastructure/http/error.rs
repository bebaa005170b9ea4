//! HTTP Error Handling
//!
//! 业务错误统一返回 HTTP 200，错误信息放在 errno/error 字段

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::{ApplicationError, GenerationError, RepositoryError};

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errno: i32,
    pub error: String,
    pub data: Option<()>,
}

impl ErrorResponse {
    pub fn new(errno: i32, error: impl Into<String>) -> Self {
        Self {
            errno,
            error: error.into(),
            data: None,
        }
    }
}

/// 错误码定义
pub mod errno {
    pub const BAD_REQUEST: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const CONFLICT: i32 = 409;
    /// 上游内容策略拒绝
    pub const REFUSED: i32 = 422;
    pub const INTERNAL_ERROR: i32 = 500;
    /// 上游返回了无法解析的内容
    pub const BAD_GATEWAY: i32 = 502;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    Conflict(String),
    Refused(String),
    BadGateway(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn errno(&self) -> i32 {
        match self {
            ApiError::NotFound(_) => errno::NOT_FOUND,
            ApiError::BadRequest(_) => errno::BAD_REQUEST,
            ApiError::Internal(_) => errno::INTERNAL_ERROR,
            ApiError::Conflict(_) => errno::CONFLICT,
            ApiError::Refused(_) => errno::REFUSED,
            ApiError::BadGateway(_) => errno::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => errno::SERVICE_UNAVAILABLE,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg)
            | ApiError::Conflict(msg)
            | ApiError::Refused(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let errno = self.errno();
        let msg = self.message();

        match &self {
            ApiError::NotFound(_) => tracing::warn!(errno = errno, error = %msg, "Resource not found"),
            ApiError::BadRequest(_) => tracing::warn!(errno = errno, error = %msg, "Bad request"),
            ApiError::Conflict(_) => tracing::warn!(errno = errno, error = %msg, "Resource conflict"),
            ApiError::Refused(_) => tracing::warn!(errno = errno, error = %msg, "Generation refused upstream"),
            ApiError::Internal(_) => tracing::error!(errno = errno, error = %msg, "Internal server error"),
            ApiError::BadGateway(_) => tracing::error!(errno = errno, error = %msg, "Bad upstream response"),
            ApiError::ServiceUnavailable(_) => tracing::error!(errno = errno, error = %msg, "Service unavailable"),
        }

        (StatusCode::OK, Json(ErrorResponse::new(errno, msg))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        let msg = e.to_string();
        match e {
            GenerationError::InvalidRequest(_) => ApiError::BadRequest(msg),
            GenerationError::UpstreamRefusal(_) => ApiError::Refused(msg),
            GenerationError::MalformedResponse(_) => ApiError::BadGateway(msg),
            GenerationError::NetworkFailure(_) => ApiError::ServiceUnavailable(msg),
        }
    }
}

impl From<ApplicationError> for ApiError {
    fn from(e: ApplicationError) -> Self {
        match e {
            ApplicationError::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} not found: {}", resource_type, id))
            }
            ApplicationError::ValidationError(msg) => ApiError::BadRequest(msg),
            ApplicationError::InvalidState(msg) => ApiError::BadRequest(msg),
            ApplicationError::Conflict(msg) => ApiError::Conflict(msg),
            ApplicationError::Generation(e) => ApiError::from(e),
            ApplicationError::RepositoryError(msg) => ApiError::Internal(msg),
            ApplicationError::InternalError(msg) => ApiError::Internal(msg),
        }
    }
}
