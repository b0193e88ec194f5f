use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use quill_api::auth::{self, AppState, AppStateInner};
use quill_api::routes::create_routes;
use quill_api::session::SessionStore;
use quill_db::Database;

const DB_OPEN_ATTEMPTS: u32 = 5;
const DB_OPEN_BACKOFF: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = std::env::var("QUILL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("QUILL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path = std::env::var("QUILL_DB_PATH").unwrap_or_else(|_| "quill.db".into());
    let upload_dir = PathBuf::from(
        std::env::var("QUILL_UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".into()),
    );
    let admin_user = std::env::var("QUILL_ADMIN_USER").unwrap_or_else(|_| "admin".into());
    let admin_password =
        std::env::var("QUILL_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me".into());

    // Init database; migrations and seeds run inside open()
    let db = open_with_retry(Path::new(&db_path)).await?;
    db.ensure_admin(&admin_user, || auth::hash_password(&admin_password))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions: SessionStore::new(),
        upload_dir: upload_dir.clone(),
    });

    let app = create_routes(state)
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("quill listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Bounded retry around the schema initializer: transient open failures get
/// a fixed backoff; after the last attempt the error is fatal and the
/// process exits through main.
async fn open_with_retry(path: &Path) -> anyhow::Result<Database> {
    let mut attempt = 1;
    loop {
        match Database::open(path) {
            Ok(db) => return Ok(db),
            Err(err) if attempt < DB_OPEN_ATTEMPTS => {
                warn!(
                    "database open failed (attempt {}/{}): {:#}",
                    attempt, DB_OPEN_ATTEMPTS, err
                );
                tokio::time::sleep(DB_OPEN_BACKOFF).await;
                attempt += 1;
            }
            Err(err) => {
                error!("database open failed after {} attempts", DB_OPEN_ATTEMPTS);
                return Err(err);
            }
        }
    }
}
