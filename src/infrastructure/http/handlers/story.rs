//! Story HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{CreateStory, DeleteStory, GetStory, ListStories, StoryDetailResponse};
use crate::infrastructure::http::dto::{
    ApiResponse, CreateStoryRequest, Empty, StoryDetailDto, StoryIdRequest, StorySummaryDto,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 生成新故事（同步等待文本生成完成）
pub async fn create_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateStoryRequest>,
) -> Result<Json<ApiResponse<StoryDetailDto>>, ApiError> {
    let story = state
        .create_story_handler
        .handle(CreateStory {
            prompt: req.prompt,
            chapter_count: req.chapter_count,
        })
        .await?;

    let detail = StoryDetailResponse::from_story(&story, &[]);
    Ok(Json(ApiResponse::success(StoryDetailDto::from(detail))))
}

/// 故事库
pub async fn list_stories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StorySummaryDto>>>, ApiError> {
    let stories = state.list_stories_handler.handle(ListStories).await?;
    let responses = stories.into_iter().map(StorySummaryDto::from).collect();
    Ok(Json(ApiResponse::success(responses)))
}

/// 故事详情
pub async fn get_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StoryIdRequest>,
) -> Result<Json<ApiResponse<StoryDetailDto>>, ApiError> {
    let detail = state
        .get_story_handler
        .handle(GetStory { story_id: req.id })
        .await?;
    Ok(Json(ApiResponse::success(StoryDetailDto::from(detail))))
}

/// 删除故事
pub async fn delete_story(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StoryIdRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_story_handler
        .handle(DeleteStory { story_id: req.id })
        .await?;
    Ok(Json(ApiResponse::ok()))
}
