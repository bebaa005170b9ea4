//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                         GET   健康检查
//! - /api/story/create                 POST  根据提示词生成故事
//! - /api/story/list                   GET   故事库
//! - /api/story/get                    POST  故事详情（章节按序号排列）
//! - /api/story/delete                 POST  删除故事
//! - /api/chapter/get                  POST  打开章节
//! - /api/chapter/image/generate       POST  提交插图生成任务
//! - /api/chapter/audio/generate       POST  提交朗读生成任务
//! - /api/chapter/image/:chapter_id    GET   下载插图
//! - /api/chapter/audio/:chapter_id    GET   下载音频
//! - /api/job/status                   POST  查询生成任务状态
//! - /api/voice/list                   GET   可选音色

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/story", story_routes())
        .nest("/chapter", chapter_routes())
        .route("/job/status", post(handlers::query_job_status))
        .route("/voice/list", get(handlers::list_voices))
}

/// Story 路由
fn story_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_story))
        .route("/list", get(handlers::list_stories))
        .route("/get", post(handlers::get_story))
        .route("/delete", post(handlers::delete_story))
}

/// Chapter 路由
fn chapter_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/get", post(handlers::get_chapter))
        .route("/image/generate", post(handlers::generate_chapter_image))
        .route("/audio/generate", post(handlers::generate_chapter_audio))
        .route("/image/:chapter_id", get(handlers::get_chapter_image))
        .route("/audio/:chapter_id", get(handlers::get_chapter_audio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplyGeneratedAssetHandler, JobState, JobTrackerPort};
    use crate::infrastructure::adapters::FakeGenerationClient;
    use crate::infrastructure::http::state::GenerationSettings;
    use crate::infrastructure::memory::{InMemoryJobTracker, InMemoryStoryRepository};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        tracker: Arc<InMemoryJobTracker>,
        client: Arc<FakeGenerationClient>,
    }

    fn app() -> TestApp {
        let repo = Arc::new(InMemoryStoryRepository::new());
        let tracker = Arc::new(InMemoryJobTracker::new());
        let client = Arc::new(FakeGenerationClient::new());
        let writer = Arc::new(ApplyGeneratedAssetHandler::new(repo.clone()));
        let state = AppState::new(repo, tracker.clone(), client.clone(), writer, GenerationSettings::default());

        TestApp {
            router: create_routes().with_state(Arc::new(state)),
            tracker,
            client,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        (status, body, content_type)
    }

    async fn post_json(router: &Router, uri: &str, body: Value) -> Value {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes, _) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn get_json(router: &Router, uri: &str) -> Value {
        let (status, bytes, _) = send(router, Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn wait_for_job(router: &Router, job_id: &str) -> Value {
        for _ in 0..100 {
            let body = post_json(router, "/api/job/status", json!({ "job_ids": [job_id] })).await;
            let job = body["data"]["jobs"][0].clone();
            if job["state"] == "succeeded" || job["state"] == "failed" {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not finish");
    }

    #[tokio::test]
    async fn test_ping() {
        let app = app();
        let body = get_json(&app.router, "/api/ping").await;
        assert_eq!(body["errno"], 0);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_story_lifecycle_over_http() {
        let app = app();

        let created = post_json(
            &app.router,
            "/api/story/create",
            json!({ "prompt": "a robot gardener", "chapter_count": 3 }),
        )
        .await;
        assert_eq!(created["errno"], 0);
        let story = &created["data"];
        assert_eq!(story["status"], "partial");
        assert_eq!(story["chapters"].as_array().unwrap().len(), 3);
        assert_eq!(story["chapters"][0]["label"], "ONE");
        assert_eq!(story["chapters"][0]["can_open"], true);
        let story_id = story["id"].as_str().unwrap().to_string();

        // 三章都生成插图和朗读
        for number in 1..=3 {
            for uri in ["/api/chapter/image/generate", "/api/chapter/audio/generate"] {
                let job = post_json(&app.router, uri, json!({ "story_id": story_id, "number": number })).await;
                assert_eq!(job["errno"], 0, "{job}");
                let job_id = job["data"]["job_id"].as_str().unwrap().to_string();
                let finished = wait_for_job(&app.router, &job_id).await;
                assert_eq!(finished["state"], "succeeded");
            }
        }

        let detail = post_json(&app.router, "/api/story/get", json!({ "id": story_id })).await;
        assert_eq!(detail["data"]["status"], "full");
        assert_eq!(detail["data"]["status_text"], "Fully developed");

        let chapter = post_json(
            &app.router,
            "/api/chapter/get",
            json!({ "story_id": story_id, "number": 2 }),
        )
        .await;
        assert_eq!(chapter["data"]["previous_number"], 1);
        assert_eq!(chapter["data"]["next_number"], 3);
        let chapter_id = chapter["data"]["id"].as_str().unwrap().to_string();

        let (status, bytes, content_type) = send(
            &app.router,
            Request::get(format!("/api/chapter/image/{}", chapter_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/png"));
        assert!(!bytes.is_empty());

        let (_, _, content_type) = send(
            &app.router,
            Request::get(format!("/api/chapter/audio/{}", chapter_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(content_type.as_deref(), Some("audio/mpeg"));

        let list = get_json(&app.router, "/api/story/list").await;
        assert_eq!(list["data"][0]["status"], "full");

        let deleted = post_json(&app.router, "/api/story/delete", json!({ "id": story_id })).await;
        assert_eq!(deleted["errno"], 0);

        let gone = post_json(
            &app.router,
            "/api/chapter/get",
            json!({ "story_id": story_id, "number": 1 }),
        )
        .await;
        assert_eq!(gone["errno"], 404);

        let (_, bytes, _) = send(
            &app.router,
            Request::get(format!("/api/chapter/image/{}", chapter_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errno"], 404);
    }

    #[tokio::test]
    async fn test_busy_chapter_and_failed_job() {
        let app = app();
        let created = post_json(
            &app.router,
            "/api/story/create",
            json!({ "prompt": "a quiet library", "chapter_count": 1 }),
        )
        .await;
        let story_id = created["data"]["id"].as_str().unwrap().to_string();

        app.client.delay_image(1, Duration::from_millis(100));
        app.client
            .fail_image(1, crate::application::GenerationError::UpstreamRefusal("nope".into()));

        let first = post_json(
            &app.router,
            "/api/chapter/image/generate",
            json!({ "story_id": story_id, "number": 1 }),
        )
        .await;
        assert_eq!(first["errno"], 0);

        let second = post_json(
            &app.router,
            "/api/chapter/audio/generate",
            json!({ "story_id": story_id, "number": 1, "voice": "nova" }),
        )
        .await;
        assert_eq!(second["errno"], 409);

        let job_id = first["data"]["job_id"].as_str().unwrap().to_string();
        let finished = wait_for_job(&app.router, &job_id).await;
        assert_eq!(finished["state"], "failed");
        assert_eq!(finished["error_kind"], "upstream_refusal");

        let uuid = uuid::Uuid::parse_str(&job_id).unwrap();
        assert_eq!(app.tracker.get(uuid).unwrap().state, JobState::Failed);

        // 章节保持原样
        let detail = post_json(&app.router, "/api/story/get", json!({ "id": story_id })).await;
        assert_eq!(detail["data"]["chapters"][0]["has_image"], false);
        assert_eq!(detail["data"]["status"], "partial");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let app = app();

        let too_many = post_json(
            &app.router,
            "/api/story/create",
            json!({ "prompt": "anything", "chapter_count": 9 }),
        )
        .await;
        assert_eq!(too_many["errno"], 400);

        let empty = post_json(
            &app.router,
            "/api/story/create",
            json!({ "prompt": "  ", "chapter_count": 2 }),
        )
        .await;
        assert_eq!(empty["errno"], 400);

        let created = post_json(
            &app.router,
            "/api/story/create",
            json!({ "prompt": "anything", "chapter_count": 1 }),
        )
        .await;
        let story_id = created["data"]["id"].as_str().unwrap().to_string();
        let bad_voice = post_json(
            &app.router,
            "/api/chapter/audio/generate",
            json!({ "story_id": story_id, "number": 1, "voice": "baritone" }),
        )
        .await;
        assert_eq!(bad_voice["errno"], 400);
    }

    #[tokio::test]
    async fn test_voice_list() {
        let app = app();
        let body = get_json(&app.router, "/api/voice/list").await;
        assert_eq!(body["data"]["voices"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["default"], "alloy");
    }
}
