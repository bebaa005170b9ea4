//! Asset Queries - 章节插图/音频读取

use uuid::Uuid;

use crate::application::ports::AssetKind;

/// 获取章节资源
#[derive(Debug, Clone)]
pub struct GetChapterAsset {
    pub chapter_id: Uuid,
    pub kind: AssetKind,
}

/// 资源数据
#[derive(Debug, Clone)]
pub struct GetChapterAssetResponse {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}
