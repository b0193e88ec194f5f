use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::SESSION_COOKIE;

/// Identity resolved from the session cookie, attached to the request for
/// handlers behind `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
}

/// Gate for every state-mutating route: resolves the session cookie against
/// the store and rejects with a uniform 401 before any handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    let session = state.sessions.get(&token)?.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser {
        id: session.user_id,
        username: session.username,
    });
    Ok(next.run(req).await)
}
