use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use trend_scout::prompt::PromptDraft;

use crate::middleware::session_middleware::SessionId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DraftPayload {
    #[serde(flatten)]
    pub draft: PromptDraft,
    /// Append the session's last analysis or article text.
    #[serde(default)]
    pub use_context: bool,
}

/// POST /api/draft
pub async fn build_draft(
    Extension(state): Extension<AppState>,
    Extension(SessionId(sid)): Extension<SessionId>,
    Json(payload): Json<DraftPayload>,
) -> impl IntoResponse {
    let session = state.session(sid);
    let context = if payload.use_context {
        session.draft_context()
    } else {
        None
    };

    match payload.draft.build(context) {
        Ok(prompt) => (StatusCode::OK, Json(json!({ "prompt": prompt }))),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": e.to_string() })),
        ),
    }
}
