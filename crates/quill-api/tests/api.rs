use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use quill_api::auth::{self, AppStateInner};
use quill_api::routes::create_routes;
use quill_api::session::SessionStore;
use quill_db::Database;

const ADMIN: &str = "admin";
const PASSWORD: &str = "correct-horse-battery";

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    db.ensure_admin(ADMIN, || auth::hash_password(PASSWORD))
        .unwrap();
    let state = Arc::new(AppStateInner {
        db,
        sessions: SessionStore::new(),
        upload_dir: PathBuf::from("target/test-uploads"),
    });
    create_routes(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Logs in as the seeded admin and returns the session cookie pair.
async fn login(app: &Router) -> String {
    let req = json_request(
        "POST",
        "/api/login",
        &json!({ "username": ADMIN, "password": PASSWORD }),
        None,
    );
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set the session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

fn post_payload(slug: &str, title: &str, tags: &str) -> Value {
    json!({
        "title": title,
        "slug": slug,
        "content": "Content body",
        "excerpt": "Excerpt",
        "author": "admin",
        "category": "programming",
        "tags": tags,
        "read_time": 4,
        "published": true
    })
}

#[tokio::test]
async fn login_check_auth_logout_roundtrip() {
    let app = app();

    let (_, body) = send(&app, get("/api/check-auth")).await;
    assert_eq!(body["authenticated"], json!(false));

    let cookie = login(&app).await;

    let (status, body) = send(
        &app,
        Request::get("/api/check-auth")
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["user"]["username"], json!(ADMIN));

    let (status, body) = send(
        &app,
        Request::post("/api/logout")
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (_, body) = send(
        &app,
        Request::get("/api/check-auth")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["authenticated"], json!(false));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = app();

    let (wrong_pw_status, wrong_pw_body) = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            &json!({ "username": ADMIN, "password": "nope" }),
            None,
        ),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        json_request(
            "POST",
            "/api/login",
            &json!({ "username": "nobody", "password": "nope" }),
            None,
        ),
    )
    .await;

    assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body, unknown_body);
}

#[tokio::test]
async fn mutations_require_a_session() {
    let app = app();

    let (status, _) = send(
        &app,
        json_request("POST", "/api/posts", &post_payload("x", "X", ""), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/settings", &json!({ "blog_title": "Hacked" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("x", "X", ""),
            Some("quill_session=forged-token"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_crud_with_duplicate_slug_rejection() {
    let app = app();
    let cookie = login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("hello-world", "Hello", "rust, web , rust"),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tags"], json!(["rust", "web"]));
    let id = body["id"].as_i64().unwrap();

    // Duplicate slug is a 400 and leaves the original untouched.
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("hello-world", "Impostor", ""),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/api/posts")).await;
    let posts = body.as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], json!("Hello"));

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/posts/{id}"),
            &post_payload("hello-world", "Hello, renamed", "rust"),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], json!("Hello, renamed"));

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/posts/9999",
            &post_payload("fresh-slug", "Ghost", ""),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Request::delete(format!("/api/posts/{id}"))
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Idempotent delete.
    let (status, _) = send(
        &app,
        Request::delete(format!("/api/posts/{id}"))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn comments_stay_hidden_until_moderated() {
    let app = app();
    let cookie = login(&app).await;

    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("commented", "Commented", ""),
            Some(&cookie),
        ),
    )
    .await;
    let post_id = body["id"].as_i64().unwrap();

    // Public submission returns an acknowledgment, never the row.
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/comments/{post_id}"),
            &json!({ "author": "reader", "content": "first!" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert!(body.get("content").is_none());

    let (_, body) = send(&app, get(&format!("/api/comments/{post_id}"))).await;
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        Request::get("/api/comments/admin/all")
            .header(header::COOKIE, cookie.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = body.as_array().unwrap()[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/comments/admin/{comment_id}"),
            &json!({ "is_approved": true }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], json!(true));

    let (_, body) = send(&app, get(&format!("/api/comments/{post_id}"))).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Blank fields and unknown posts are rejected.
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/comments/{post_id}"),
            &json!({ "author": " ", "content": "x" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/comments/9999",
            &json!({ "author": "reader", "content": "hello" }),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_series_keeps_its_posts() {
    let app = app();
    let cookie = login(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/series",
            &json!({ "title": "Learning Rust", "slug": "learning-rust" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let series_id = body["id"].as_i64().unwrap();

    let mut payload = post_payload("part-one", "Part One", "rust");
    payload["series_id"] = json!(series_id);
    payload["order_in_series"] = json!(1);
    let (status, _) = send(
        &app,
        json_request("POST", "/api/posts", &payload, Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, get("/api/series/learning-rust")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, get("/api/posts/part-one")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["series_title"], json!("Learning Rust"));
    assert_eq!(body["series_slug"], json!("learning-rust"));

    let (status, _) = send(
        &app,
        Request::delete(format!("/api/series/{series_id}"))
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The post survives with its series reference nulled.
    let (status, body) = send(&app, get("/api/posts/part-one")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["series_id"], json!(null));
    assert_eq!(body["title"], json!("Part One"));

    let (status, _) = send(&app, get("/api/series/learning-rust")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_referencing_unknown_series_is_rejected() {
    let app = app();
    let cookie = login(&app).await;

    let mut payload = post_payload("orphan", "Orphan", "");
    payload["series_id"] = json!(42);
    let (status, _) = send(
        &app,
        json_request("POST", "/api/posts", &payload, Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_requires_a_query_and_matches_published_posts() {
    let app = app();
    let cookie = login(&app).await;

    let (status, _) = send(&app, get("/api/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("vue-intro", "Getting started with Vue", "frontend"),
            Some(&cookie),
        ),
    )
    .await;
    send(
        &app,
        json_request(
            "POST",
            "/api/posts",
            &post_payload("rust-intro", "Getting started with Rust", "rust"),
            Some(&cookie),
        ),
    )
    .await;

    let (status, body) = send(&app, get("/api/search?q=vue")).await;
    assert_eq!(status, StatusCode::OK);
    let hits = body.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["slug"], json!("vue-intro"));
}

#[tokio::test]
async fn tag_counts_are_ordered_deterministically() {
    let app = app();
    let cookie = login(&app).await;

    for (slug, tags) in [("one", "b,a"), ("two", "a,b"), ("three", "b,a,c")] {
        send(
            &app,
            json_request(
                "POST",
                "/api/posts",
                &post_payload(slug, slug, tags),
                Some(&cookie),
            ),
        )
        .await;
    }

    let (status, body) = send(&app, get("/api/tags")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "tag": "a", "count": 3 },
            { "tag": "b", "count": 3 },
            { "tag": "c", "count": 1 },
        ])
    );
}

#[tokio::test]
async fn settings_read_public_write_gated() {
    let app = app();

    let (status, body) = send(&app, get("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blog_title"], json!("My Awesome Blog"));

    let cookie = login(&app).await;
    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            "/api/settings",
            &json!({ "blog_title": "Quill" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/settings")).await;
    assert_eq!(body["blog_title"], json!("Quill"));
}

const BOUNDARY: &str = "quill-test-boundary";

/// Builds a multipart request with a single `image` part. `content_type`
/// is optional so the untyped-part case can be exercised.
fn upload_request(content_type: Option<&str>, data: &[u8], cookie: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"photo.png\"\r\n",
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::post("/api/upload").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie.to_string());
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn uploads_accept_images_larger_than_the_default_body_limit() {
    let app = app();
    let cookie = login(&app).await;

    // 3 MB: over axum's stock 2 MB body limit, under the 5 MB image cap.
    let data = vec![0u8; 3 * 1024 * 1024];
    let (status, body) = send(
        &app,
        upload_request(Some("image/png"), &data, Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn uploads_over_the_image_cap_are_rejected() {
    let app = app();
    let cookie = login(&app).await;

    let data = vec![0u8; quill_api::uploads::MAX_IMAGE_BYTES + 1];
    let (status, _) = send(
        &app,
        upload_request(Some("image/png"), &data, Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_without_an_image_content_type_are_rejected() {
    let app = app();
    let cookie = login(&app).await;

    let (status, _) = send(
        &app,
        upload_request(Some("text/plain"), b"hello", Some(&cookie)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A part with no declared content type is not treated as an image.
    let (status, _) = send(&app, upload_request(None, b"hello", Some(&cookie))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn uploads_require_a_session() {
    let app = app();

    let (status, _) = send(&app, upload_request(Some("image/png"), b"hello", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn categories_conflict_on_duplicates() {
    let app = app();
    let cookie = login(&app).await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/categories",
            &json!({ "name": "essays" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/categories",
            &json!({ "name": "essays" }),
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, get("/api/categories")).await;
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    // Seeded defaults plus the new one, ordered by name.
    assert_eq!(
        names,
        ["announcement", "design", "essays", "programming", "technology", "tutorials"]
    );
}
