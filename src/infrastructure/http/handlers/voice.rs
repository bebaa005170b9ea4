//! Voice HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::domain::story::NarrationVoice;
use crate::infrastructure::http::dto::{ApiResponse, VoiceDto, VoiceListDto};
use crate::infrastructure::http::state::AppState;

/// 可选朗读音色
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<ApiResponse<VoiceListDto>> {
    let voices = NarrationVoice::ALL
        .iter()
        .map(|voice| VoiceDto {
            id: *voice,
            name: voice.display_name(),
        })
        .collect();

    Json(ApiResponse::success(VoiceListDto {
        voices,
        default: state.settings.default_voice,
    }))
}
