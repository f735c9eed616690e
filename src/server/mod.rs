mod error;
mod session;
mod views;

pub use error::AppError;
pub use session::Session;

use crate::config::ServerConfig;
use crate::pdf::{merge_into, split_into_pages, MergeOrder};
use crate::storage::{SessionId, Storage};
use crate::upload::{self, UploadedFile};
use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Multipart field carrying the file to split.
pub const SPLIT_FIELD: &str = "pdf_file";
/// Multipart field carrying the files to merge, repeated once per file.
pub const MERGE_FIELD: &str = "pdf_files[]";
pub const MERGED_FILE_NAME: &str = "merged.pdf";

/// Upper bound between expiry sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub struct AppState {
    pub storage: Storage,
    pub config: ServerConfig,
}

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/split", post(split))
        .route("/merge", post(merge))
        .route("/download", get(download_list))
        .route("/download/{filename}", get(download_file))
        .route("/about", get(about))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open storage, start the expiry sweep and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<()> {
    let storage = Storage::open(&config.upload_dir, &config.download_dir).with_context(|| {
        format!(
            "Failed to open storage at {} and {}",
            config.upload_dir.display(),
            config.download_dir.display()
        )
    })?;

    let purged = storage
        .purge_sessions()
        .context("Failed to remove leftover session files")?;
    if purged > 0 {
        info!(purged, "removed session files from a previous run");
    }

    if config.merge_order == MergeOrder::Reversed {
        warn!("merge order is reversed: the last uploaded file comes first in merged.pdf");
    }

    tokio::spawn(sweep_expired_sessions(storage.clone(), config.session_ttl));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        uploads = %storage.incoming_root().display(),
        downloads = %storage.outgoing_root().display(),
        max_upload_bytes = config.max_upload_bytes,
        "listening"
    );

    let state = Arc::new(AppState { storage, config });
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn sweep_expired_sessions(storage: Storage, ttl: Duration) {
    let period = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let storage = storage.clone();
        match tokio::task::spawn_blocking(move || storage.sweep_expired(ttl)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => info!(removed, "removed expired session files"),
            Ok(Err(e)) => warn!(error = %e, "expiry sweep failed"),
            Err(e) => warn!(error = %e, "expiry sweep task failed"),
        }
    }
}

/// Run filesystem and PDF work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Collect every file part submitted under `field_name`, in order.
async fn read_files(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await?;
        files.push(UploadedFile { filename, content });
    }
    Ok(files)
}

async fn index(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let storage = state.storage.clone();
    let id = session.id;
    let result = blocking(move || Ok(storage.clear_session(id)?))
        .await
        .map(|()| Html(views::index(None)));
    session.attach(result)
}

async fn split(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let result = split_upload(&state, session.id, multipart)
        .await
        .map(|()| Redirect::to("/download"));
    session.attach(result)
}

async fn split_upload(
    state: &AppState,
    session: SessionId,
    multipart: Multipart,
) -> Result<(), AppError> {
    let files = read_files(multipart, SPLIT_FIELD).await?;
    let file = upload::validate_single(files.into_iter().next())?;

    let storage = state.storage.clone();
    let pages = blocking(move || {
        // Dropping the work dir clears incoming storage on every path out.
        let work = storage.work_dir(session)?;
        let input = work.save(&file)?;
        debug!(work_dir = %work.path().display(), "saved upload");
        let output_dir = storage.ensure_outgoing(session)?;
        Ok(split_into_pages(&input, &output_dir)?.len())
    })
    .await?;

    info!(%session, pages, "split complete");
    Ok(())
}

async fn merge(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let result = merge_upload(&state, session.id, multipart)
        .await
        .map(|()| Redirect::to("/download"));
    session.attach(result)
}

async fn merge_upload(
    state: &AppState,
    session: SessionId,
    multipart: Multipart,
) -> Result<(), AppError> {
    let files = read_files(multipart, MERGE_FIELD).await?;
    let accepted = upload::validate_batch(files)?;
    let file_count = accepted.len();

    let storage = state.storage.clone();
    let order = state.config.merge_order;
    let pages = blocking(move || {
        let work = storage.work_dir(session)?;
        let inputs = accepted
            .iter()
            .map(|file| work.save(file))
            .collect::<std::io::Result<Vec<_>>>()?;
        let output_dir = storage.ensure_outgoing(session)?;
        Ok(merge_into(&inputs, order, output_dir.join(MERGED_FILE_NAME))?)
    })
    .await?;

    info!(%session, files = file_count, pages, ?order, "merge complete");
    Ok(())
}

async fn download_list(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let storage = state.storage.clone();
    let id = session.id;
    let result = blocking(move || {
        storage.touch(id);
        Ok(storage.list_outgoing(id)?)
    })
    .await
    .map(|files| Html(views::download(&files)));
    session.attach(result)
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(filename): Path<String>,
) -> Response {
    let storage = state.storage.clone();
    let id = session.id;
    let name = filename.clone();
    let resolved = blocking(move || {
        storage.touch(id);
        Ok(storage.resolve_download(id, &name)?)
    })
    .await;

    let path = match resolved {
        Ok(Some(path)) => path,
        Ok(None) => {
            info!(%id, filename = %filename, "download of unknown file");
            return session.attach((StatusCode::NOT_FOUND, Html(views::not_found())));
        }
        Err(e) => return session.attach(e),
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => session.attach((
            [
                (CONTENT_TYPE, "application/pdf".to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            bytes,
        )),
        // Cleared by another tab between listing and reading.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            session.attach((StatusCode::NOT_FOUND, Html(views::not_found())))
        }
        Err(e) => session.attach(AppError::from(e)),
    }
}

async fn about(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(views::about(state.config.merge_order))
}
