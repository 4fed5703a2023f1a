use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use trend_scout::ai::InlineImage;
use trend_scout::dashboard::Outcome;
use trend_scout::session::{BoardView, DetailView};
use trend_scout::{FailureKind, ScoutError};

use crate::middleware::session_middleware::SessionId;
use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

pub(crate) fn error_response(e: &ScoutError) -> ApiError {
    let status = match e.kind() {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Stale => StatusCode::CONFLICT,
        FailureKind::ConfigMissing => StatusCode::SERVICE_UNAVAILABLE,
        FailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(json!({ "message": e.to_string(), "kind": e.kind() })),
    )
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
}

fn upload_error(e: MultipartError) -> ApiError {
    let status = e.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "이미지 용량이 너무 큽니다."
    } else {
        "잘못된 업로드 요청입니다."
    };
    warn!(%status, error = %e.body_text(), "Upload rejected");
    (status, Json(json!({ "message": message })))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub model_enabled: bool,
    pub model: Option<String>,
    pub notice: Option<&'static str>,
    pub cache_ttl_secs: u64,
}

/// GET /api/status
pub async fn status(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let dashboard = &state.dashboard;
    Json(StatusResponse {
        model_enabled: dashboard.model_enabled(),
        model: dashboard.model_name().map(str::to_string),
        notice: dashboard.startup_notice(),
        cache_ttl_secs: dashboard.config().cache_ttl.as_secs(),
    })
}

/// GET /api/news
pub async fn get_news(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(BoardView::from_result(state.dashboard.board().await))
}

/// POST /api/news/refresh
pub async fn refresh_news(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(BoardView::from_result(state.dashboard.refresh().await))
}

#[derive(Debug, Deserialize)]
pub struct OpenParams {
    /// `fetched_at` of the board the client rendered.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// POST /api/news/{rank}/open?fetched_at=...
///
/// 409 when the rendered board is no longer the cached one.
pub async fn open_news(
    Extension(state): Extension<AppState>,
    Extension(SessionId(sid)): Extension<SessionId>,
    Path(rank): Path<usize>,
    Query(params): Query<OpenParams>,
) -> Result<Json<DetailView>, ApiError> {
    let detail = state.dashboard.open_item(rank, params.fetched_at).await.map_err(|e| {
        warn!(rank, error = %e, "Open failed");
        error_response(&e)
    })?;

    let view = state.update_session(sid, |session| session.open(detail));
    Ok(Json(view.detail()))
}

/// GET /api/session
pub async fn get_session(
    Extension(state): Extension<AppState>,
    Extension(SessionId(sid)): Extension<SessionId>,
) -> impl IntoResponse {
    Json(state.session(sid).detail())
}

#[derive(Debug, Deserialize)]
pub struct AnalyzePayload {
    #[serde(default)]
    pub label: Option<String>,
    pub text: String,
}

/// POST /api/analyze
pub async fn analyze_text(
    Extension(state): Extension<AppState>,
    Extension(SessionId(sid)): Extension<SessionId>,
    Json(payload): Json<AnalyzePayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(bad_request("분석할 내용을 입력해주세요."));
    }
    let label = payload.label.as_deref().unwrap_or("직접 입력");

    let result = state
        .dashboard
        .analyze_text(label, &payload.text)
        .await
        .map_err(|e| error_response(&e))?;

    state.update_session(sid, |session| {
        session.record_analysis(Outcome::Ready {
            value: result.clone(),
        })
    });
    Ok((StatusCode::OK, Json(json!(result))))
}

#[derive(Debug, Deserialize)]
pub struct DigestPayload {
    pub links: Vec<String>,
}

/// POST /api/digest
pub async fn digest(
    Extension(state): Extension<AppState>,
    Json(payload): Json<DigestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let links: Vec<String> = payload
        .links
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if links.is_empty() {
        return Err(bad_request("링크를 하나 이상 입력해주세요."));
    }

    info!(links = links.len(), "Digest requested");
    let digest = state
        .dashboard
        .digest(&links)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(json!({ "digest": digest })))
}

/// POST /api/vision, multipart with one or more `image` parts and an optional `note`.
pub async fn analyze_images(
    Extension(state): Extension<AppState>,
    Extension(SessionId(sid)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut images = Vec::new();
    let mut note: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("note") => {
                note = Some(field.text().await.map_err(upload_error)?);
            }
            Some("image") => {
                let mime_type = field
                    .content_type()
                    .filter(|ct| ct.starts_with("image/"))
                    .map(str::to_string)
                    .ok_or_else(|| bad_request("이미지 파일만 업로드할 수 있습니다."))?;
                let data = field.bytes().await.map_err(upload_error)?;
                images.push(InlineImage {
                    mime_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    if images.is_empty() {
        return Err(bad_request("이미지를 첨부해주세요."));
    }

    let result = state
        .dashboard
        .analyze_images(&images, note.as_deref())
        .await
        .map_err(|e| error_response(&e))?;

    state.update_session(sid, |session| {
        session.record_analysis(Outcome::Ready {
            value: result.clone(),
        })
    });
    Ok(Json(json!(result)))
}
