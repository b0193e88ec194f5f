use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use quill_db::Database;
use quill_types::api::{Ack, AuthStatus, LoginRequest, LoginResponse};
use quill_types::models::UserInfo;

use crate::error::ApiError;
use crate::session::{SESSION_COOKIE, SessionStore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
    pub upload_dir: PathBuf,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    // Unknown username and wrong password take the same exit.
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow!("stored password hash unparsable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let token = state.sessions.create(user.id, &user.username)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            user: UserInfo {
                id: user.id,
                username: user.username,
            },
        }),
    ))
}

/// Failure to destroy the session is a server error, never swallowed.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Ack>), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value())?;
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());

    Ok((
        jar,
        Json(Ack {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Always 200; reports whether the cookie maps to a live session.
pub async fn check_auth(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<AuthStatus>, ApiError> {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.sessions.get(cookie.value())?,
        None => None,
    };

    Ok(Json(match session {
        Some(session) => AuthStatus {
            authenticated: true,
            user: Some(UserInfo {
                id: session.user_id,
                username: session.username,
            }),
        },
        None => AuthStatus {
            authenticated: false,
            user: None,
        },
    }))
}

/// Hash a password with Argon2id. Used by the server binary when seeding
/// the admin credential.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}
