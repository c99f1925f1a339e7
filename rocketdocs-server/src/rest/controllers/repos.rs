//! `/repos` endpoints (§6): identify, generate, list, fetch, search, chat,
//! and delete a repository.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use rocketdocs_agent::Agent;
use rocketdocs_core::document::{format_repo_tree, DocKind, Repository, StatusEnum};
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::RepoHandle;
use rocketdocs_identifier::{persist, Identifier};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::OwnerId;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateRepoRequest {
    pub github_url: String,
}

#[derive(Debug, Serialize)]
struct ItemToDocument {
    id: String,
    path: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
}

/// Reconstructs the [`RepoHandle`] a stored [`Repository`] was resolved
/// from, so regeneration and post-identify jobs never need to re-resolve
/// the repository URL. The Source Host Adapter only ever consults
/// `full_name`, an entry's own path, and `version` (§4.4), so this is a
/// faithful reconstruction rather than an approximation.
fn repo_handle_from(repo: &Repository) -> RepoHandle {
    let html_url = repo.docs.get(&repo.root_doc_id).map(|d| d.source_url.clone()).unwrap_or_default();
    RepoHandle { full_name: repo.repo_name.clone(), html_url, version: repo.version.clone() }
}

fn items_to_document(repo: &Repository) -> Vec<ItemToDocument> {
    repo.docs
        .values()
        .filter(|d| d.id != repo.root_doc_id)
        .map(|d| ItemToDocument {
            id: d.id.clone(),
            path: d.relative_path.clone(),
            kind: match d.kind {
                DocKind::File => "file",
                DocKind::Dir => "dir",
            },
        })
        .collect()
}

pub async fn create_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(body): Json<CreateRepoRequest>,
) -> Result<Response, ApiError> {
    let repo_id = Uuid::new_v4().to_string();
    let identifier = Identifier::new(&*state.source_host);
    let repo =
        identifier.identify(&body.github_url, &owner_id, &repo_id, || Uuid::new_v4().to_string()).await?;
    let repo = persist(&*state.store, repo).await?;

    state
        .jobs
        .enqueue_repo_job(
            &owner_id,
            &repo_id,
            &state.config.default_model,
            &state.config.default_embedding_model,
            repo_handle_from(&repo),
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "generation started", "id": repo_id }))).into_response())
}

pub async fn identify_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(body): Json<CreateRepoRequest>,
) -> Result<Response, ApiError> {
    let repo_id = Uuid::new_v4().to_string();
    let identifier = Identifier::new(&*state.source_host);
    let repo =
        identifier.identify(&body.github_url, &owner_id, &repo_id, || Uuid::new_v4().to_string()).await?;
    let repo = persist(&*state.store, repo).await?;

    let items = items_to_document(&repo);
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "identification complete", "id": repo_id, "items_to_document": items })),
    )
        .into_response())
}

pub async fn generate_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(repo_id): Path<String>,
) -> Result<Response, ApiError> {
    let repo = state.store.get_repo(&owner_id, &repo_id).await?;
    state
        .jobs
        .enqueue_repo_job(
            &owner_id,
            &repo_id,
            &state.config.default_model,
            &state.config.default_embedding_model,
            repo_handle_from(&repo),
        )
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "generation restarted", "id": repo_id }))).into_response())
}

#[derive(Debug, Serialize)]
struct RepoSummary {
    id: String,
    name: String,
    status: StatusEnum,
    docs_status: Vec<DocStatus>,
}

#[derive(Debug, Serialize)]
struct DocStatus {
    id: String,
    status: StatusEnum,
}

pub async fn list_repos(State(state): State<AppState>, OwnerId(owner_id): OwnerId) -> Result<Response, ApiError> {
    let repos = state.store.list_repos(&owner_id).await?;
    let summaries: Vec<RepoSummary> = repos
        .into_iter()
        .map(|repo| RepoSummary {
            id: repo.id.clone(),
            name: repo.repo_name.clone(),
            status: repo.status,
            docs_status: repo.docs.values().map(|d| DocStatus { id: d.id.clone(), status: d.status }).collect(),
        })
        .collect();
    Ok((StatusCode::OK, Json(json!({ "repos": summaries }))).into_response())
}

pub async fn get_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(repo_id): Path<String>,
) -> Result<Response, ApiError> {
    let repo = state.store.get_repo(&owner_id, &repo_id).await?;
    let tree = format_repo_tree(&repo).ok_or_else(|| CoreError::NotFound(repo.root_doc_id.clone()))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "repo": {
                "name": repo.repo_name,
                "id": repo.id,
                "owner_id": repo.owner_id,
                "status": repo.status,
                "tree": tree,
            }
        })),
    )
        .into_response())
}

pub async fn delete_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(repo_id): Path<String>,
) -> Result<Response, ApiError> {
    state.store.delete_repo(&owner_id, &repo_id).await?;
    state.index.delete_namespace(&repo_id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "deleted", "id": repo_id }))).into_response())
}

pub async fn get_document(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path((repo_id, doc_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let doc = state.store.get_document(&owner_id, &doc_id).await?;
    if doc.repo_id != repo_id {
        return Err(CoreError::InvalidUrl(format!("document {doc_id} is not in repo {repo_id}")).into());
    }
    Ok((
        StatusCode::OK,
        Json(json!({
            "id": doc.id,
            "github_url": doc.source_url,
            "status": doc.status,
            "relative_path": doc.relative_path,
            "markdown_content": doc.markdown,
        })),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct SearchHitResponse {
    doc_id: String,
    score: f32,
    chunk_content: String,
}

pub async fn search_repo(
    State(state): State<AppState>,
    OwnerId(_owner_id): OwnerId,
    Path(repo_id): Path<String>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let agent = Agent::new(&state.gateway, &*state.index, &*state.store);
    let hits = agent.search(&repo_id, &state.config.default_embedding_model, &params.query, 4).await?;
    let body: Vec<SearchHitResponse> = hits
        .into_iter()
        .map(|h| SearchHitResponse { doc_id: h.doc_id, score: h.score, chunk_content: h.chunk_text })
        .collect();
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub async fn chat_repo(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(repo_id): Path<String>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let model = state.config.default_model.clone();
    let embedding_model = state.config.default_embedding_model.clone();
    let stream = async_stream::stream! {
        let agent = Agent::new(&state.gateway, &*state.index, &*state.store);
        let mut events = Box::pin(agent.chat(&owner_id, &repo_id, &model, &embedding_model, params.query));
        while let Some(event) = events.next().await {
            let line = match event {
                Ok(ev) => json!({ "action": ev.action, "output": ev.output }).to_string(),
                Err(err) => json!({ "action": "Error", "output": err.to_string() }).to_string(),
            };
            yield Ok::<_, std::convert::Infallible>(format!("{line}\n"));
        }
    };

    axum::http::Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, "application/x-ndjson")
        .body(axum::body::Body::from_stream(stream))
        .expect("static response parts are always valid")
}
