//! End-to-end coverage of the HTTP surface (§6), built on in-memory
//! collaborators so no real GitHub or LLM traffic is required.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rocketdocs_core::tokenizer::WhitespaceTokenizer;
use rocketdocs_docstore::InMemoryDocumentStore;
use rocketdocs_jobs::JobController;
use rocketdocs_model::mock::MockProvider;
use rocketdocs_model::Gateway;
use rocketdocs_rag::{Chunker, InMemoryVectorIndex};
use rocketdocs_server::config::RocketdocsConfig;
use rocketdocs_server::rest::router;
use rocketdocs_server::state::AppState;
use rocketdocs_sourcehost::memory::{InMemoryFile, InMemorySourceHost};
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

fn test_state() -> AppState {
    let store = Arc::new(InMemoryDocumentStore::new());
    let host = InMemorySourceHost::new(
        "demo",
        vec![
            InMemoryFile { path: "a.py".to_string(), content: b"print(1)".to_vec() },
            InMemoryFile { path: "pkg/b.py".to_string(), content: b"print(2)".to_vec() },
        ],
    );
    let source_host = Arc::new(host);
    let tokenizer = Arc::new(WhitespaceTokenizer);
    let index = Arc::new(InMemoryVectorIndex::new());
    let chunker = Arc::new(Chunker::new(Box::new(WhitespaceTokenizer)));
    let gateway = Arc::new(Gateway::new().with_provider(Arc::new(MockProvider::new("mock"))));

    let jobs = Arc::new(JobController::new(
        store.clone() as Arc<dyn rocketdocs_core::docstore::DocumentStore>,
        source_host.clone() as Arc<dyn rocketdocs_core::sourcehost::SourceHost>,
        gateway.clone(),
        tokenizer.clone() as Arc<dyn rocketdocs_core::tokenizer::Tokenizer>,
        index.clone() as Arc<dyn rocketdocs_rag::VectorIndex>,
        chunker.clone(),
    ));

    AppState {
        store: store as Arc<dyn rocketdocs_core::docstore::DocumentStore>,
        source_host: source_host as Arc<dyn rocketdocs_core::sourcehost::SourceHost>,
        gateway,
        tokenizer: tokenizer as Arc<dyn rocketdocs_core::tokenizer::Tokenizer>,
        index: index as Arc<dyn rocketdocs_rag::VectorIndex>,
        chunker,
        jobs,
        config: Arc::new(RocketdocsConfig::builder().default_model("mock-1").default_embedding_model("mock-embed").build()),
        file_doc_handles: Arc::new(Mutex::new(HashMap::new())),
    }
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri).header("authorization", "Bearer owner-1")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Polls the job registry until `job_id` leaves `Queued`/`InProgress`,
/// so assertions that depend on a job's terminal state (busy checks,
/// delete) never race the background task the mock provider finishes
/// almost instantly.
async fn wait_for_job(state: &AppState, job_id: &str) {
    use rocketdocs_jobs::JobStatus;
    for _ in 0..200 {
        match state.jobs.status(job_id).await {
            Some(JobStatus::Completed) | Some(JobStatus::Failed(_)) | None => return,
            Some(JobStatus::Running) => tokio::time::sleep(std::time::Duration::from_millis(5)).await,
        }
    }
}

#[tokio::test]
async fn creating_a_repo_accepts_and_starts_a_job() {
    let app = router(test_state());
    let response = app
        .oneshot(
            authed("POST", "/repos")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"github_url":"https://example.com/demo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn identify_returns_items_to_document_without_starting_a_job() {
    let app = router(test_state());
    let response = app
        .oneshot(
            authed("POST", "/repos/identify")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"github_url":"https://example.com/demo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body["items_to_document"].as_array().unwrap();
    assert!(!items.is_empty());
}

#[tokio::test]
async fn list_then_get_then_delete_a_repo() {
    let state = test_state();
    let app = router(state.clone());

    let create = app
        .clone()
        .oneshot(
            authed("POST", "/repos")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"github_url":"https://example.com/demo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let created = body_json(create).await;
    let repo_id = created["id"].as_str().unwrap().to_string();
    wait_for_job(&state, &repo_id).await;

    let list = app.clone().oneshot(authed("GET", "/repos").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    let list_body = body_json(list).await;
    assert_eq!(list_body["repos"].as_array().unwrap().len(), 1);

    let get =
        app.clone().oneshot(authed("GET", &format!("/repos/{repo_id}")).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(get.status(), StatusCode::OK);

    let delete = app
        .clone()
        .oneshot(authed("DELETE", &format!("/repos/{repo_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::OK);

    let get_again =
        app.oneshot(authed("GET", &format!("/repos/{repo_id}")).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(get_again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fetching_a_document_from_the_wrong_repo_is_rejected() {
    let state = test_state();
    let app = router(state.clone());

    let create = app
        .clone()
        .oneshot(
            authed("POST", "/repos")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"github_url":"https://example.com/demo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let created = body_json(create).await;
    let repo_id = created["id"].as_str().unwrap().to_string();

    let repo = state.store.get_repo("owner-1", &repo_id).await.unwrap();
    let some_doc_id = repo.docs.keys().next().cloned().unwrap();

    let response = app
        .oneshot(authed("GET", &format!("/repos/not-the-real-repo/{some_doc_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn requests_without_a_bearer_token_are_unauthenticated() {
    let app = router(test_state());
    let response = app
        .oneshot(Request::builder().method("GET").uri("/repos").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn file_doc_lifecycle_create_get_regenerate_delete() {
    let state = test_state();
    let app = router(state.clone());
    let github_url = "https://example.com/demo/blob/main/a.py";

    let create = app
        .clone()
        .oneshot(
            authed("POST", "/file-docs")
                .header("content-type", "application/json")
                .body(Body::from(format!(r#"{{"github_url":"{github_url}"}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::ACCEPTED);
    let created = body_json(create).await;
    let doc_id = created["id"].as_str().unwrap().to_string();
    wait_for_job(&state, &doc_id).await;

    let get = app
        .clone()
        .oneshot(authed("GET", &format!("/file-docs/{doc_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);

    let regenerate = app
        .clone()
        .oneshot(authed("PUT", &format!("/file-docs/{doc_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(regenerate.status(), StatusCode::ACCEPTED);
    wait_for_job(&state, &doc_id).await;

    let delete = app
        .oneshot(authed("DELETE", &format!("/file-docs/{doc_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::OK);
}

#[tokio::test]
async fn regenerating_an_unknown_file_doc_is_not_found() {
    let app = router(test_state());
    let response = app
        .oneshot(authed("PUT", "/file-docs/does-not-exist").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
