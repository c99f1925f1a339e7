//! `/file-docs` endpoints (§6): document a single file addressed by its
//! GitHub blob URL, independent of any identified repository.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rocketdocs_core::document::{DocKind, Document, StatusEnum};
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{EntryKind, SourceEntry};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::OwnerId;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FileDocRequest {
    pub github_url: String,
}

/// Splits a GitHub blob URL (`.../blob/{ref}/{path...}`) into the
/// repository root URL, the ref, and the file path.
fn parse_blob_url(url: &str) -> Result<(String, String, String), CoreError> {
    const MARKER: &str = "/blob/";
    let trimmed = url.trim();
    let marker_idx = trimmed.find(MARKER).ok_or_else(|| CoreError::InvalidUrl(url.to_string()))?;
    let repo_root = trimmed[..marker_idx].to_string();
    let rest = &trimmed[marker_idx + MARKER.len()..];
    let mut parts = rest.splitn(2, '/');
    let reference = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| CoreError::InvalidUrl(url.to_string()))?;
    let path = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| CoreError::InvalidUrl(url.to_string()))?;
    Ok((repo_root, reference.to_string(), path.to_string()))
}

pub async fn create_file_doc(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(body): Json<FileDocRequest>,
) -> Result<Response, ApiError> {
    let (repo_root, reference, path) = parse_blob_url(&body.github_url)?;
    let mut handle = state.source_host.resolve(&repo_root).await?;
    handle.version = Some(reference);

    let entry = SourceEntry {
        name: path.rsplit('/').next().unwrap_or(&path).to_string(),
        path: path.clone(),
        html_url: body.github_url.clone(),
        kind: EntryKind::File,
        size: None,
        content: None,
    };
    let content = state.source_host.fetch_content(&handle, &entry).await?;

    let doc_id = Uuid::new_v4().to_string();
    let doc = Document::new(
        doc_id.clone(),
        String::new(),
        owner_id.clone(),
        body.github_url.clone(),
        path,
        DocKind::File,
        Some(content.len() as u64),
    );
    state.store.put_document(doc).await?;
    state.file_doc_handles.lock().await.insert(doc_id.clone(), handle.clone());

    state.jobs.enqueue_file_job(&owner_id, &doc_id, &state.config.default_model, handle).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "file documentation started", "id": doc_id }))).into_response())
}

pub async fn get_file_doc(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(doc_id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = state.store.get_document(&owner_id, &doc_id).await?;
    Ok((StatusCode::OK, Json(doc)).into_response())
}

pub async fn regenerate_file_doc(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(doc_id): Path<String>,
) -> Result<Response, ApiError> {
    let handle = state
        .file_doc_handles
        .lock()
        .await
        .get(&doc_id)
        .cloned()
        .ok_or_else(|| CoreError::NotFound(doc_id.clone()))?;
    state.jobs.enqueue_file_job(&owner_id, &doc_id, &state.config.default_model, handle).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "regeneration started", "id": doc_id }))).into_response())
}

pub async fn delete_file_doc(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(doc_id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = state.store.get_document(&owner_id, &doc_id).await?;
    if doc.status == StatusEnum::InProgress {
        return Err(CoreError::BusyError(doc_id).into());
    }
    state.store.delete_document(&owner_id, &doc_id).await?;
    state.file_doc_handles.lock().await.remove(&doc_id);
    Ok((StatusCode::OK, Json(json!({ "message": "deleted", "id": doc_id }))).into_response())
}
