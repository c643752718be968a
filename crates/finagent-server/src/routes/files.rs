//! Generated-file listing and download endpoints.
//!
//! The output directory is written by the agent process; this side only
//! reads it. Listing degrades to an empty result on filesystem problems so
//! the endpoint stays usable while the agent is still producing files.

use std::path::Path;

use axum::{
    body::Body,
    extract::{Path as FileName, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::error::AppError;
use crate::types::{FileEntry, FilesResponse};
use crate::AppState;

/// Build the files router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files))
        .route("/:filename", get(download_file))
}

/// List all generated files with name, size, and modification time.
async fn list_files(State(state): State<AppState>) -> Json<FilesResponse> {
    Json(collect_files(&state.output_dir).await)
}

async fn collect_files(dir: &Path) -> FilesResponse {
    if let Err(e) = fs::create_dir_all(dir).await {
        tracing::warn!("failed to create output directory: {e}");
        return degraded(e.to_string());
    }

    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) => return degraded(e.to_string()),
    };

    let mut files = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => return degraded(e.to_string()),
        };
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_default();
        files.push(FileEntry {
            filename: entry.file_name().to_string_lossy().into_owned(),
            size: metadata.len(),
            modified,
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    FilesResponse {
        count: files.len(),
        files,
        error: None,
    }
}

fn degraded(error: String) -> FilesResponse {
    FilesResponse {
        files: Vec::new(),
        count: 0,
        error: Some(error),
    }
}

/// Download one generated file as raw bytes.
async fn download_file(
    State(state): State<AppState>,
    FileName(filename): FileName<String>,
) -> Result<Response, AppError> {
    if !is_safe_filename(&filename) {
        return Err(AppError::BadRequest(format!(
            "invalid filename: {filename}"
        )));
    }

    let path = state.output_dir.join(&filename);
    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => {
            return Err(AppError::Internal(format!("Failed to read file: {e}")));
        }
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .expect("static response builder"))
}

/// Bare filenames only; anything path-like is rejected.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains('/')
        && !filename.contains('\\')
        && filename != "."
        && filename != ".."
}
