use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::state::AppState;

pub const SESSION_COOKIE: &str = "scout_sid";

/// Request-scoped session id, inserted by [`session_middleware`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionId(pub Uuid);

pub async fn session_middleware(
    Extension(state): Extension<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let cookies = match req.extensions().get::<Cookies>() {
        Some(c) => c.clone(),
        None => return (StatusCode::INTERNAL_SERVER_ERROR, "Cookie manager missing").into_response(),
    };

    let existing = cookies
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok());

    let id = match existing {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4();
            let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
            cookie.set_http_only(true);
            cookie.set_path("/");
            cookies.add(cookie);
            id
        }
    };

    state.touch(id);
    req.extensions_mut().insert(SessionId(id));
    next.run(req).await
}
