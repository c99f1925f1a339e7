//! The Agent / Search surface (C10): a bounded ReAct loop over the Vector
//! Index and Document Store, with a direct-answer fallback path.

use async_stream::try_stream;
use futures::Stream;
use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use rocketdocs_rag::VectorIndex;
use rocketdocs_model::Gateway;
use tracing::instrument;

const MAX_ITERATIONS: u32 = 4;
const SEARCH_TOP_K: usize = 4;
const SEARCH_SCORE_THRESHOLD: f32 = 0.6;
const AGENT_TEMPERATURE: f32 = 0.2;
const AGENT_MAX_TOKENS: u32 = 512;

const AGENT_SYSTEM_PROMPT: &str = "You are a documentation assistant answering questions about a code repository.\nRespond with exactly two labeled lines:\nThought: <your reasoning>\nAction: Search[\"<query>\"] or Finish[\"<answer>\"]\nUse Search at most once; once you have search results you must Finish.";

const FALLBACK_SYSTEM_PROMPT: &str = "You are a documentation assistant. Answer the question directly and concisely using only the provided context. If the context does not contain the answer, say so plainly.";

/// One retrieved chunk, surfaced to both the HTTP search endpoint and the
/// chat loop's internal retrieval step.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f32,
    pub chunk_text: String,
}

/// One event in a chat run: either an intermediate `Search` step or the
/// terminal `Finish` step.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    pub action: String,
    pub output: String,
}

enum Step {
    Search(String),
    Finish(String),
}

pub struct Agent<'a> {
    gateway: &'a Gateway,
    index: &'a dyn VectorIndex,
    store: &'a dyn DocumentStore,
}

impl<'a> Agent<'a> {
    pub fn new(gateway: &'a Gateway, index: &'a dyn VectorIndex, store: &'a dyn DocumentStore) -> Self {
        Self { gateway, index, store }
    }

    /// Top-k semantic search scoped to `repo_id`. `§4.7`.
    #[instrument(skip(self, query), fields(repo_id = %repo_id))]
    pub async fn search(
        &self,
        repo_id: &str,
        model: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, CoreError> {
        let embeddings = self.gateway.generate_embedding(model, &[query.to_string()]).await?;
        let embedding = embeddings.into_iter().next().unwrap_or_default();
        let chunks = self.index.query(repo_id, &embedding, top_k).await?;
        Ok(chunks
            .into_iter()
            .map(|c| SearchHit { doc_id: c.doc_id, score: c.score, chunk_text: c.chunk_text })
            .collect())
    }

    /// A bounded ReAct loop: at most [`MAX_ITERATIONS`] Thought/Action turns,
    /// at most one `Search`, exactly one terminal `Finish`. `§4.7`.
    ///
    /// `model` drives the Thought/Action completions; `embedding_model`
    /// drives retrieval, matching the embedding model the Embedding
    /// Pipeline indexed the repository under — the completion model's
    /// embedding space is not guaranteed to even share a dimension with it.
    pub fn chat<'s>(
        &'s self,
        owner_id: &'s str,
        repo_id: &'s str,
        model: &'s str,
        embedding_model: &'s str,
        query: String,
    ) -> impl Stream<Item = Result<AgentEvent, CoreError>> + 's {
        try_stream! {
            let mut transcript = format!("Question: {query}\n");
            let mut searched = false;
            let mut finished = false;

            for _ in 0..MAX_ITERATIONS {
                let response = self
                    .gateway
                    .generate_text(model, AGENT_SYSTEM_PROMPT, &transcript, AGENT_TEMPERATURE, AGENT_MAX_TOKENS)
                    .await?;
                transcript.push_str(&response.text);
                transcript.push('\n');

                match parse_step(&response.text) {
                    Some(Step::Finish(answer)) => {
                        yield AgentEvent { action: "Finish".to_string(), output: answer };
                        finished = true;
                        break;
                    }
                    Some(Step::Search(q)) if !searched => {
                        searched = true;
                        let hits = self.search(repo_id, embedding_model, &q, SEARCH_TOP_K).await?;
                        let mut seen = std::collections::HashSet::new();
                        let mut result_block = String::new();
                        for hit in hits.into_iter().filter(|h| h.score > SEARCH_SCORE_THRESHOLD) {
                            if !seen.insert(hit.doc_id.clone()) {
                                continue;
                            }
                            let markdown = self
                                .store
                                .get_document(owner_id, &hit.doc_id)
                                .await
                                .ok()
                                .and_then(|d| d.markdown)
                                .unwrap_or_default();
                            result_block.push_str(&format!("Result: {} - {}\n", hit.doc_id, markdown));
                        }
                        transcript.push_str(&result_block);
                        yield AgentEvent { action: "Search".to_string(), output: q };
                    }
                    _ => break,
                }
            }

            if !finished {
                let hits = self.search(repo_id, embedding_model, &query, SEARCH_TOP_K).await?;
                let context = hits
                    .iter()
                    .map(|h| format!("{}: {}", h.doc_id, h.chunk_text))
                    .collect::<Vec<_>>()
                    .join("\n");
                let user = format!("Question: {query}\n\nContext:\n{context}");
                let response = self
                    .gateway
                    .generate_text(model, FALLBACK_SYSTEM_PROMPT, &user, AGENT_TEMPERATURE, AGENT_MAX_TOKENS)
                    .await?;
                yield AgentEvent { action: "Finish".to_string(), output: response.text };
            }
        }
    }
}

/// Locate the literal `"Thought"` and `"Action"` labels and slice between
/// them; no regex. Mirrors the original's `parse_step`/`extract_step`.
fn parse_step(text: &str) -> Option<Step> {
    let thought_idx = text.find("Thought")?;
    let action_idx = text[thought_idx..].find("Action").map(|i| i + thought_idx)?;
    let action_part = &text[action_idx + "Action".len()..];
    let action_part = action_part.trim_start_matches(':').trim();

    if let Some(query) = extract_bracketed(action_part, "Search[") {
        Some(Step::Search(query))
    } else if let Some(answer) = extract_bracketed(action_part, "Finish[") {
        Some(Step::Finish(answer))
    } else {
        None
    }
}

fn extract_bracketed(s: &str, tag: &str) -> Option<String> {
    let start = s.find(tag)? + tag.len();
    let rest = &s[start..];
    let end = rest.find(']')?;
    let inner = rest[..end].trim();
    let inner = inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(inner);
    Some(inner.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use rocketdocs_core::document::{DocKind, Document, StatusEnum};
    use rocketdocs_docstore::InMemoryDocumentStore;
    use rocketdocs_model::mock::{MockProvider, MockResponse};
    use rocketdocs_rag::{ChunkRecord, InMemoryVectorIndex};
    use std::sync::Arc;

    async fn seeded_store_and_index() -> (InMemoryDocumentStore, InMemoryVectorIndex) {
        let store = InMemoryDocumentStore::new();
        let mut doc = Document::new(
            "doc1".into(),
            "repo1".into(),
            "owner1".into(),
            "u".into(),
            "a.py".into(),
            DocKind::File,
            Some(10),
        );
        doc.status = StatusEnum::Completed;
        doc.markdown = Some("documents the widget module".to_string());
        store.put_document(doc).await.unwrap();

        let index = InMemoryVectorIndex::new();
        index.create_namespace("repo1").await.unwrap();
        index
            .upsert(
                "repo1",
                &[ChunkRecord {
                    vector_id: "doc1-0".to_string(),
                    embedding: vec![1.0, 0.0],
                    chunk_text: "widget module chunk".to_string(),
                    doc_id: "doc1".to_string(),
                }],
            )
            .await
            .unwrap();
        (store, index)
    }

    #[tokio::test]
    async fn search_returns_hits_above_the_query_embedding_similarity() {
        let (_store, index) = seeded_store_and_index().await;
        let provider = MockProvider::new("mock").with_embedding_dims(2);
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let store = InMemoryDocumentStore::new();
        let agent = Agent::new(&gateway, &index, &store);

        let hits = agent.search("repo1", "mock-1", "widget", 4).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, "doc1");
    }

    #[tokio::test]
    async fn chat_finishes_immediately_when_the_model_finishes_on_the_first_turn() {
        let (store, index) = seeded_store_and_index().await;
        let provider = MockProvider::new("mock");
        provider.push(MockResponse::Text("Thought: I already know.\nAction: Finish[\"it's a widget module\"]".to_string())).await;
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let agent = Agent::new(&gateway, &index, &store);

        let events: Vec<_> =
            agent.chat("owner1", "repo1", "mock-1", "mock-embed", "what is this?".to_string()).collect().await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.action, "Finish");
        assert_eq!(event.output, "it's a widget module");
    }

    #[tokio::test]
    async fn chat_searches_once_then_finishes() {
        let (store, index) = seeded_store_and_index().await;
        let provider = MockProvider::new("mock");
        provider
            .push(MockResponse::Text("Thought: I need more info.\nAction: Search[\"widget\"]".to_string()))
            .await;
        provider
            .push(MockResponse::Text("Thought: Now I know.\nAction: Finish[\"the widget module\"]".to_string()))
            .await;
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let agent = Agent::new(&gateway, &index, &store);

        let events: Vec<_> =
            agent.chat("owner1", "repo1", "mock-1", "mock-embed", "what is this?".to_string()).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().action, "Search");
        assert_eq!(events[1].as_ref().unwrap().action, "Finish");
    }

    #[tokio::test]
    async fn malformed_output_falls_back_to_a_direct_answer() {
        let (store, index) = seeded_store_and_index().await;
        let provider = MockProvider::new("mock");
        provider.push(MockResponse::Text("I don't understand the format.".to_string())).await;
        provider.push(MockResponse::Text("It is a widget module, based on the context.".to_string())).await;
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let agent = Agent::new(&gateway, &index, &store);

        let events: Vec<_> =
            agent.chat("owner1", "repo1", "mock-1", "mock-embed", "what is this?".to_string()).collect().await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.action, "Finish");
        assert_eq!(event.output, "It is a widget module, based on the context.");
    }

    #[test]
    fn parse_step_extracts_search_query_without_quotes() {
        let step = parse_step("Thought: need data\nAction: Search[\"widget module\"]");
        assert!(matches!(step, Some(Step::Search(ref q)) if q == "widget module"));
    }

    #[test]
    fn parse_step_rejects_missing_labels() {
        assert!(parse_step("just some text").is_none());
    }
}
