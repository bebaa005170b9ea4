//! Asset Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AssetKind, StoryRepositoryPort};
use crate::application::queries::{GetChapterAsset, GetChapterAssetResponse};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G'];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// 按文件头判断插图格式，无法识别时按 PNG 返回
fn image_content_type(data: &[u8]) -> &'static str {
    if data.starts_with(PNG_SIGNATURE) {
        "image/png"
    } else if data.starts_with(JPEG_SIGNATURE) {
        "image/jpeg"
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else {
        "image/png"
    }
}

/// GetChapterAsset Handler
pub struct GetChapterAssetHandler {
    story_repo: Arc<dyn StoryRepositoryPort>,
}

impl GetChapterAssetHandler {
    pub fn new(story_repo: Arc<dyn StoryRepositoryPort>) -> Self {
        Self { story_repo }
    }

    pub async fn handle(&self, query: GetChapterAsset) -> Result<GetChapterAssetResponse, ApplicationError> {
        let chapter = self
            .story_repo
            .find_chapter(query.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_id))?;

        let response = match query.kind {
            AssetKind::Image => chapter.image().map(|image| GetChapterAssetResponse {
                content_type: image_content_type(image.as_bytes()),
                data: image.as_bytes().to_vec(),
            }),
            AssetKind::Audio => chapter.audio().map(|audio| GetChapterAssetResponse {
                content_type: "audio/mpeg",
                data: audio.as_bytes().to_vec(),
            }),
        };

        response.ok_or_else(|| {
            ApplicationError::not_found_str(
                "Asset",
                format!("{} of chapter {}", query.kind, query.chapter_id),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::story::{Chapter, ImagePayload, Prompt, Story, Title};
    use crate::infrastructure::memory::InMemoryStoryRepository;

    #[test]
    fn test_image_content_type() {
        assert_eq!(image_content_type(&[0x89, b'P', b'N', b'G', 0x0D]), "image/png");
        assert_eq!(image_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(image_content_type(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    }

    #[tokio::test]
    async fn test_missing_asset_is_not_found() {
        let repo = Arc::new(InMemoryStoryRepository::new());
        let mut story = Story::new(Title::new("Lanterns").unwrap(), Prompt::new("lanterns").unwrap());
        let mut chapter = Chapter::new(1, "Glow", Some("Light.".to_string())).unwrap();
        chapter.attach_image(ImagePayload::new(vec![0xFF, 0xD8, 0xFF, 0x00])).unwrap();
        let chapter_id = *chapter.id().as_uuid();
        story.add_chapters(vec![chapter]).unwrap();
        story.recompute_status();
        repo.save(&story).await.unwrap();

        let handler = GetChapterAssetHandler::new(repo);
        let image = handler
            .handle(GetChapterAsset {
                chapter_id,
                kind: AssetKind::Image,
            })
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.data.len(), 4);

        let err = handler
            .handle(GetChapterAsset {
                chapter_id,
                kind: AssetKind::Audio,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound { resource_type: "Asset", .. }));
    }
}
