//! Route wiring: translates §6's endpoint table into real `axum` routes.

pub mod controllers;

use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

pub fn router(state: AppState) -> Router {
    let cors = build_cors(&state.config.cors_origins());

    Router::new()
        .route("/repos", post(controllers::repos::create_repo).get(controllers::repos::list_repos))
        .route("/repos/identify", post(controllers::repos::identify_repo))
        .route(
            "/repos/{repo_id}",
            get(controllers::repos::get_repo).delete(controllers::repos::delete_repo),
        )
        .route("/repos/{repo_id}/generate", post(controllers::repos::generate_repo))
        .route("/repos/{repo_id}/search", get(controllers::repos::search_repo))
        .route("/repos/{repo_id}/chat", get(controllers::repos::chat_repo))
        .route("/repos/{repo_id}/{doc_id}", get(controllers::repos::get_document))
        .route(
            "/file-docs",
            post(controllers::file_docs::create_file_doc),
        )
        .route(
            "/file-docs/{doc_id}",
            get(controllers::file_docs::get_file_doc)
                .put(controllers::file_docs::regenerate_file_doc)
                .delete(controllers::file_docs::delete_file_doc),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(120)))
        .layer(cors)
        .with_state(state)
}
