//! Chapter HTTP Handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{AssetKind, GetChapter, GetChapterAsset, SubmitChapterGeneration};
use crate::domain::story::NarrationVoice;
use crate::infrastructure::http::dto::{
    ApiResponse, ChapterDetailDto, ChapterRequest, GenerateAudioRequest, JobDto,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 打开章节（未开始生成的章节会被拒绝）
pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChapterRequest>,
) -> Result<Json<ApiResponse<ChapterDetailDto>>, ApiError> {
    let chapter = state
        .get_chapter_handler
        .handle(GetChapter {
            story_id: req.story_id,
            chapter_number: req.number,
        })
        .await?;
    Ok(Json(ApiResponse::success(ChapterDetailDto::from(chapter))))
}

/// 提交插图生成任务
pub async fn generate_chapter_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChapterRequest>,
) -> Result<Json<ApiResponse<JobDto>>, ApiError> {
    let submitted = state
        .submit_generation_handler
        .handle(SubmitChapterGeneration {
            story_id: req.story_id,
            chapter_number: req.number,
            kind: AssetKind::Image,
            voice: None,
        })
        .await?;
    Ok(Json(ApiResponse::success(JobDto::from(submitted.job))))
}

/// 提交朗读生成任务
pub async fn generate_chapter_audio(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateAudioRequest>,
) -> Result<Json<ApiResponse<JobDto>>, ApiError> {
    let voice = req
        .voice
        .as_deref()
        .map(|v| NarrationVoice::from_str(v).ok_or_else(|| ApiError::BadRequest(format!("Unknown voice: {}", v))))
        .transpose()?;

    let submitted = state
        .submit_generation_handler
        .handle(SubmitChapterGeneration {
            story_id: req.story_id,
            chapter_number: req.number,
            kind: AssetKind::Audio,
            voice,
        })
        .await?;
    Ok(Json(ApiResponse::success(JobDto::from(submitted.job))))
}

async fn chapter_asset(state: &AppState, chapter_id: Uuid, kind: AssetKind) -> Result<Response, ApiError> {
    let asset = state
        .get_asset_handler
        .handle(GetChapterAsset { chapter_id, kind })
        .await?;

    Response::builder()
        .header(header::CONTENT_TYPE, asset.content_type)
        .header(header::CONTENT_LENGTH, asset.data.len())
        .body(Body::from(asset.data))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// 下载章节插图
pub async fn get_chapter_image(
    State(state): State<Arc<AppState>>,
    Path(chapter_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    chapter_asset(&state, chapter_id, AssetKind::Image).await
}

/// 下载章节朗读音频
pub async fn get_chapter_audio(
    State(state): State<Arc<AppState>>,
    Path(chapter_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    chapter_asset(&state, chapter_id, AssetKind::Audio).await
}
