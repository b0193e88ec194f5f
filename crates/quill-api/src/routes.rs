use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{categories, comments, posts, search, series, settings, tags, uploads};

/// Assembles the API surface. Reads are public; every mutating route sits
/// behind the session gate.
///
/// matchit allows one parameter name per path position, so the mutating
/// post/series routes reuse the `{slug}` segment and parse it as a numeric
/// id.
pub fn create_routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/check-auth", get(auth::check_auth))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/{slug}", get(posts::get_post))
        .route("/api/series", get(series::list_series))
        .route("/api/series/{slug}", get(series::get_series_by_slug))
        .route("/api/series/id/{id}", get(series::get_series_by_id))
        .route(
            "/api/comments/{post_id}",
            get(comments::list_comments).post(comments::submit_comment),
        )
        .route("/api/categories", get(categories::list_categories))
        .route("/api/tags", get(tags::list_tags))
        .route("/api/search", get(search::search))
        .route("/api/settings", get(settings::get_settings));

    let protected = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/posts", post(posts::create_post))
        .route(
            "/api/posts/{slug}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/series", post(series::create_series))
        .route(
            "/api/series/{slug}",
            put(series::update_series).delete(series::delete_series),
        )
        .route("/api/comments/admin/all", get(comments::list_all_comments))
        .route(
            "/api/comments/admin/{id}",
            put(comments::moderate_comment).delete(comments::delete_comment),
        )
        .route("/api/categories", post(categories::create_category))
        .route("/api/categories/{id}", delete(categories::delete_category))
        .route("/api/settings", put(settings::update_settings))
        .route(
            "/api/upload",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(uploads::UPLOAD_BODY_LIMIT)),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new().merge(public).merge(protected).with_state(state)
}
