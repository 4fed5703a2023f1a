pub mod dashboard;

use axum::{Extension, Router};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use dashboard::dashboard_routes;

/// The full application minus CORS, which depends on deployment.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", dashboard_routes())
        .layer(CookieManagerLayer::new())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use dashboard::VISION_BODY_LIMIT;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use trend_scout::ai::{GenerativeModel, InlineImage};
    use trend_scout::scraper::PageFetcher;
    use trend_scout::{Dashboard, ScoutConfig, ScoutError};

    const U1: &str = "https://n.news.naver.com/article/001/1";
    const U2: &str = "https://n.news.naver.com/article/001/2";
    const BOUNDARY: &str = "scout-upload-boundary";

    #[derive(Default)]
    struct Pages {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PageFetcher for Pages {
        async fn fetch(&self, url: &str) -> trend_scout::Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or(ScoutError::UpstreamStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[derive(Default)]
    struct Replies {
        replies: Mutex<VecDeque<String>>,
        images_seen: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl GenerativeModel for Replies {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn generate_with_images(
            &self,
            _prompt: &str,
            images: &[InlineImage],
        ) -> trend_scout::Result<String> {
            self.images_seen.lock().unwrap().push(images.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ScoutError::RateLimited)
        }
    }

    struct TestApp {
        router: Router,
        state: AppState,
        pages: Arc<Pages>,
        model: Arc<Replies>,
    }

    fn ranking_page() -> String {
        format!(
            "<div class=\"rankingnews_box\"><strong class=\"rankingnews_name\">연합뉴스</strong>\
             <ul class=\"rankingnews_list\"><li><a href=\"{}\">A</a></li><li><a href=\"{}\">B</a></li></ul></div>",
            U1, U2
        )
    }

    fn test_app(replies: &[&str], with_ranking: bool) -> TestApp {
        let config = ScoutConfig::default();
        let mut pages = Pages::default();
        if with_ranking {
            pages.pages.insert(config.ranking_url.clone(), ranking_page());
        }
        pages
            .pages
            .insert(U1.to_string(), "<div id=\"dic_area\">A 본문</div>".to_string());
        let pages = Arc::new(pages);

        let model = Arc::new(Replies {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        });
        let dyn_model: Option<Arc<dyn GenerativeModel>> = if replies.is_empty() {
            None
        } else {
            Some(model.clone())
        };
        let dashboard = Dashboard::new(config, pages.clone(), dyn_model).unwrap();
        let state = AppState::new(dashboard);
        TestApp {
            router: app(state.clone()),
            state,
            pages,
            model,
        }
    }

    async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let res = app.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, cookie, body)
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// `(field name, content type, bytes)`; a content type marks the part as a file.
    fn post_multipart(
        uri: &str,
        cookie: Option<&str>,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, content_type, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match content_type {
                Some(ct) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                        name, ct
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_news_lists_highlighted_items() {
        let app = test_app(&["[0]"], true);
        let (status, cookie, body) = send(&app, get("/api/news", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(cookie.unwrap().starts_with("scout_sid="));
        assert_eq!(body["items"][0]["label"], "[연합뉴스] 🔥 [S급 유력] A");
        assert_eq!(body["items"][1]["highlighted"], false);
        assert!(body["notice"].is_null());
    }

    #[tokio::test]
    async fn test_cookieless_reads_create_no_session_entry() {
        let app = test_app(&["[0]"], true);
        for _ in 0..3 {
            send(&app, get("/api/news", None)).await;
            send(&app, get("/api/session", None)).await;
        }
        assert!(app.state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_news_failure_is_a_notice_not_an_error() {
        let app = test_app(&[], false);
        let (status, _, body) = send(&app, get("/api/news", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 0);
        assert_eq!(body["notice"], "뉴스를 불러올 수 없습니다");
        assert_eq!(body["failure"], "upstream_status");
    }

    #[tokio::test]
    async fn test_open_then_session_and_draft_context() {
        let app = test_app(&["[0]", "등급: S"], true);

        let (_, cookie, board) = send(&app, get("/api/news", None)).await;
        let cookie = cookie.unwrap();
        let token = board["fetched_at"].as_str().unwrap().to_string();

        let uri = format!("/api/news/0/open?fetched_at={}", token);
        let (status, _, detail) = send(&app, post_json(&uri, Some(&cookie), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["banner"], "🎯 AI 판정: 이 소재는 유튜브 황금 키워드입니다!");
        assert_eq!(detail["body"], "A 본문");
        assert_eq!(detail["analysis"], "등급: S");
        assert_eq!(app.pages.requests.lock().unwrap().len(), 2);
        assert_eq!(app.state.sessions.len(), 1);

        let (_, _, session) = send(&app, get("/api/session", Some(&cookie))).await;
        assert_eq!(session["title"], "A");

        let draft = json!({ "title": "제목", "facts": "팩트", "use_context": true });
        let (status, _, body) = send(&app, post_json("/api/draft", Some(&cookie), draft)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["prompt"].as_str().unwrap().contains("[참고 자료]\n등급: S"));
    }

    #[tokio::test]
    async fn test_open_without_a_cached_board_is_409() {
        let app = test_app(&["[0]"], true);
        let (status, _, body) = send(&app, post_json("/api/news/0/open", None, json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "stale");
        assert!(app.pages.requests.lock().unwrap().is_empty());
        assert!(app.model.images_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_with_replaced_board_is_409() {
        let app = test_app(&["[0]", "[1]"], true);
        let (_, _, rendered) = send(&app, get("/api/news", None)).await;
        send(&app, post_json("/api/news/refresh", None, json!({}))).await;

        let uri = format!("/api/news/0/open?fetched_at={}", rendered["fetched_at"].as_str().unwrap());
        let (status, _, _) = send(&app, post_json(&uri, None, json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(app.pages.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_open_unknown_rank_is_404() {
        let app = test_app(&["[0]"], true);
        send(&app, get("/api/news", None)).await;
        let (status, _, body) = send(&app, post_json("/api/news/9/open", None, json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_fresh_session_shows_placeholder() {
        let app = test_app(&[], true);
        let (_, _, body) = send(&app, get("/api/session", None)).await;
        assert_eq!(body["analysis"], "👈 왼쪽 리스트에서 🔥 표시된 뉴스부터 클릭해 보세요!");
    }

    #[tokio::test]
    async fn test_draft_validation() {
        let app = test_app(&[], true);
        let draft = json!({ "title": "제목", "facts": "  " });
        let (status, _, body) = send(&app, post_json("/api/draft", None, draft)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "핵심 팩트를 입력해주세요.");

        let (status, _, body) =
            send(&app, post_json("/api/draft", None, json!({ "facts": "팩트" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "제목을 입력해주세요.");
    }

    #[tokio::test]
    async fn test_analyze_without_key_is_unavailable() {
        let app = test_app(&[], true);
        let (status, _, body) =
            send(&app, post_json("/api/analyze", None, json!({ "text": "자료" }))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "config_missing");

        let (_, _, status_body) = send(&app, get("/api/status", None)).await;
        assert_eq!(status_body["model_enabled"], false);
        assert!(status_body["notice"].is_string());
    }

    #[tokio::test]
    async fn test_digest_collects_each_link() {
        let app = test_app(&["A 요약"], true);
        let payload = json!({ "links": [U1, U2, "  "] });
        let (status, _, body) = send(&app, post_json("/api/digest", None, payload)).await;
        assert_eq!(status, StatusCode::OK);
        let digest = body["digest"].as_str().unwrap();
        assert!(digest.contains("A 요약"));
        assert!(digest.contains("본문을 가져올 수 없습니다."));
    }

    #[tokio::test]
    async fn test_digest_requires_links() {
        let app = test_app(&["x"], true);
        let (status, _, _) =
            send(&app, post_json("/api/digest", None, json!({ "links": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vision_accepts_large_images_and_records_session() {
        let app = test_app(&["썸네일 평가"], true);
        let (_, cookie, _) = send(&app, get("/api/session", None)).await;
        let cookie = cookie.unwrap();

        // Above axum's 2 MB default, below the route's cap.
        let screenshot = vec![0u8; 3 * 1024 * 1024];
        let parts: &[(&str, Option<&str>, &[u8])] = &[
            ("note", None, "빨간 배경".as_bytes()),
            ("image", Some("image/png"), screenshot.as_slice()),
            ("image", Some("image/jpeg"), &b"jpeg"[..]),
        ];
        let (status, _, body) = send(&app, post_multipart("/api/vision", Some(&cookie), parts)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["related_title"], "이미지 분석");
        assert_eq!(*app.model.images_seen.lock().unwrap(), vec![2]);

        let (_, _, session) = send(&app, get("/api/session", Some(&cookie))).await;
        assert_eq!(session["title"], "이미지 분석");
        assert_eq!(session["analysis"], "썸네일 평가");
        assert!(session["banner"].is_null());
    }

    #[tokio::test]
    async fn test_vision_rejects_non_image_parts() {
        let app = test_app(&["x"], true);
        let parts: &[(&str, Option<&str>, &[u8])] = &[("image", Some("text/plain"), &b"hello"[..])];
        let (status, _, body) = send(&app, post_multipart("/api/vision", None, parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "이미지 파일만 업로드할 수 있습니다.");
        assert!(app.model.images_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vision_requires_an_image() {
        let app = test_app(&["x"], true);
        let parts: &[(&str, Option<&str>, &[u8])] = &[("note", None, "메모만".as_bytes())];
        let (status, _, body) = send(&app, post_multipart("/api/vision", None, parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "이미지를 첨부해주세요.");
        assert!(app.state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_vision_over_cap_is_413() {
        let app = test_app(&["x"], true);
        let oversized = vec![0u8; VISION_BODY_LIMIT + 1];
        let parts: &[(&str, Option<&str>, &[u8])] = &[("image", Some("image/png"), oversized.as_slice())];
        let (status, _, body) = send(&app, post_multipart("/api/vision", None, parts)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["message"], "이미지 용량이 너무 큽니다.");
    }
}
