use crate::error::{PdfError, UploadError};
use crate::server::views;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::error::Error as _;
use thiserror::Error;
use tracing::{error, info};

/// Everything a request handler can fail with.
///
/// Every variant renders the landing form again with a short message; detail
/// stays in the logs.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rejected(#[from] UploadError),

    #[error("failed to read upload: {0}")]
    Upload(#[from] MultipartError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Rejected(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Rejected(e) => e.to_string(),
            AppError::Upload(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "File too large.".to_string()
            }
            AppError::Upload(_) => "The upload could not be read.".to_string(),
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    /// The error followed by its chain of sources.
    fn detail(&self) -> String {
        let mut detail = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !detail.contains(&cause_text) {
                detail.push_str(": ");
                detail.push_str(&cause_text);
            }
            source = cause.source();
        }
        detail
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.detail(), "request failed");
        } else {
            info!(status = status.as_u16(), error = %self.detail(), "request rejected");
        }

        (status, Html(views::index(Some(&self.user_message())))).into_response()
    }
}
