//! The Doc Generator (C7): per-document content generation with
//! token-budget trimming, prompt assembly, and a dual JSON/Markdown
//! extraction pipeline with fallback.

use rocketdocs_core::document::{DocKind, Document, Extracted, StatusEnum, Usage};
use rocketdocs_core::docstore::DocumentStore;
use rocketdocs_core::error::CoreError;
use rocketdocs_core::sourcehost::{EntryKind, RepoHandle, SourceEntry, SourceHost};
use rocketdocs_core::tokenizer::Tokenizer;
use rocketdocs_model::gateway::description_schema;
use rocketdocs_model::Gateway;
use tracing::{info, instrument, warn};

const MAX_INPUT_TOKENS: usize = 28_000;
const MAX_JSON_RETRIES: u32 = 2;
const MAX_MARKDOWN_TOKENS: u32 = 2048;

const FILE_SYSTEM_PROMPT: &str = "You are a senior engineer writing documentation for a single source file. \
Respond with Markdown whose first line is a top-level heading containing the file name.";
const DIR_SYSTEM_PROMPT: &str = "You are a senior engineer writing documentation for a directory, given \
summaries of its contents. Respond with Markdown whose first line is a top-level heading containing the \
directory name.";

pub struct Generator<'a> {
    store: &'a dyn DocumentStore,
    source_host: &'a dyn SourceHost,
    gateway: &'a Gateway,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> Generator<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        source_host: &'a dyn SourceHost,
        gateway: &'a Gateway,
        tokenizer: &'a dyn Tokenizer,
    ) -> Self {
        Self { store, source_host, gateway, tokenizer }
    }

    /// Generate and persist content for `doc_id`. Idempotent within a
    /// single generation attempt: on any failure the document is left
    /// `FAILED` and the error is returned, never panicked through.
    #[instrument(skip(self, repo_handle, child_ids), fields(doc_id = %doc_id))]
    pub async fn generate(
        &self,
        owner_id: &str,
        doc_id: &str,
        model: &str,
        repo_handle: &RepoHandle,
        child_ids: Option<&[String]>,
    ) -> Result<Document, CoreError> {
        let doc = self.store.begin_generation(owner_id, doc_id).await?;

        match self.run(owner_id, &doc, model, repo_handle, child_ids).await {
            Ok(completed) => Ok(completed),
            Err(err) => {
                let mut failed = doc;
                failed.status = StatusEnum::Failed;
                self.store.put_document(failed.clone()).await?;
                warn!(doc_id = %doc_id, error = %err, "document generation failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        owner_id: &str,
        doc: &Document,
        model: &str,
        repo_handle: &RepoHandle,
        child_ids: Option<&[String]>,
    ) -> Result<Document, CoreError> {
        let (system, user) = match doc.kind {
            DocKind::File => self.build_file_prompt(repo_handle, doc).await?,
            DocKind::Dir => self.build_dir_prompt(owner_id, child_ids).await?,
        };

        let json_result =
            self.gateway.generate_json(model, &system, &user, &description_schema(), MAX_JSON_RETRIES, 512).await;

        let markdown_response = self.gateway.generate_text(model, &system, &user, 0.4, MAX_MARKDOWN_TOKENS).await?;
        if markdown_response.finish_reason == rocketdocs_core::model::FinishReason::Length {
            return Err(CoreError::LlmTruncated { model: model.to_string() });
        }

        let markdown = strip_provider_leading_space(&markdown_response.text);
        if markdown.trim().is_empty() {
            return Err(CoreError::MarkdownEmpty(doc.id.clone()));
        }

        let mut usage = Usage::default();
        usage.add(markdown_response.usage);

        let extracted = match json_result {
            Ok(json) => {
                usage.add(json.usage);
                extracted_from_json(json.object)
            }
            Err(json_err) => match fallback_description(&markdown) {
                Some(description) => Extracted { description, extra: Default::default() },
                None => return Err(json_err),
            },
        };

        let mut completed = doc.clone();
        completed.extracted = Some(extracted);
        completed.markdown = Some(markdown);
        completed.usage = usage;
        completed.status = StatusEnum::Completed;
        self.store.put_document(completed.clone()).await?;
        info!(doc_id = %doc.id, "document generation complete");
        Ok(completed)
    }

    async fn build_file_prompt(
        &self,
        repo_handle: &RepoHandle,
        doc: &Document,
    ) -> Result<(String, String), CoreError> {
        let entry = SourceEntry {
            name: doc.relative_path.rsplit('/').next().unwrap_or(&doc.relative_path).to_string(),
            path: doc.relative_path.clone(),
            html_url: doc.source_url.clone(),
            kind: EntryKind::File,
            size: doc.size_bytes,
            content: None,
        };
        let bytes = self.source_host.fetch_content(repo_handle, &entry).await?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        if content.trim().is_empty() {
            return Err(CoreError::EmptyInput(doc.id.clone()));
        }

        let trimmed = trim_to_budget(self.tokenizer, &content, MAX_INPUT_TOKENS);
        let user = format!("Document the following code file titled {}\n\n{}", doc.relative_path, trimmed);
        Ok((FILE_SYSTEM_PROMPT.to_string(), user))
    }

    async fn build_dir_prompt(
        &self,
        owner_id: &str,
        child_ids: Option<&[String]>,
    ) -> Result<(String, String), CoreError> {
        let child_ids = child_ids.filter(|ids| !ids.is_empty()).ok_or_else(|| CoreError::EmptyInput("directory has no children".to_string()))?;

        let mut lines = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            let child = self.store.get_document(owner_id, child_id).await?;
            if child.status != StatusEnum::Completed {
                return Err(CoreError::DependencyNotReady(child_id.clone()));
            }
            let description =
                child.extracted.as_ref().map(|e| e.description.as_str()).unwrap_or_default();
            lines.push(format!("- `{}`: {}", child.relative_path, description));
        }

        let user = format!("Summarize this directory given its contents:\n\n{}", lines.join("\n"));
        Ok((DIR_SYSTEM_PROMPT.to_string(), user))
    }
}

fn extracted_from_json(object: serde_json::Value) -> Extracted {
    let description = object.get("description").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let mut extra = std::collections::HashMap::new();
    if let serde_json::Value::Object(map) = object {
        for (key, value) in map {
            if key != "description" {
                extra.insert(key, value);
            }
        }
    }
    Extracted { description, extra }
}

/// A provider-specific quirk strips exactly one leading space from the
/// returned Markdown body.
fn strip_provider_leading_space(text: &str) -> String {
    text.strip_prefix(' ').unwrap_or(text).to_string()
}

/// Trim `text` to at most `budget` tokens: drop a conservative estimate
/// (`extra_tokens * 4` characters) from the tail, then iteratively drop
/// 400-character tail slices until under budget, signalling truncation.
fn trim_to_budget(tokenizer: &dyn Tokenizer, text: &str, budget: usize) -> String {
    let tokens = tokenizer.count(text);
    if tokens <= budget {
        return text.to_string();
    }

    let extra_tokens = tokens - budget;
    let drop_chars = extra_tokens * 4;
    let mut chars: Vec<char> = text.chars().collect();
    let keep = chars.len().saturating_sub(drop_chars);
    chars.truncate(keep);

    while tokenizer.count(&chars.iter().collect::<String>()) > budget && !chars.is_empty() {
        let keep = chars.len().saturating_sub(400);
        chars.truncate(keep);
    }

    let mut trimmed: String = chars.into_iter().collect();
    trimmed.push_str("\n...");
    trimmed
}

/// Extracts the body of the first non-top heading from `markdown`, used
/// when `generate_json` fails to produce a valid `description`.
fn fallback_description(markdown: &str) -> Option<String> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut idx = 0;
    while idx < lines.len() && !lines[idx].trim_start().starts_with('#') {
        idx += 1;
    }
    idx += 1; // past the top-level heading (or past the end, harmlessly)

    while idx < lines.len() && !lines[idx].trim_start().starts_with('#') {
        idx += 1;
    }
    if idx >= lines.len() {
        return None;
    }
    idx += 1; // past the second heading line itself

    let mut body = String::new();
    while idx < lines.len() && !lines[idx].trim_start().starts_with('#') {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(lines[idx]);
        idx += 1;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocketdocs_core::tokenizer::WhitespaceTokenizer;
    use rocketdocs_docstore::InMemoryDocumentStore;
    use rocketdocs_model::mock::{MockProvider, MockResponse};
    use rocketdocs_sourcehost::memory::{InMemoryFile, InMemorySourceHost};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn sample_repo_with_file() -> (rocketdocs_core::document::Repository, InMemorySourceHost) {
        let host = InMemorySourceHost::new(
            "demo",
            vec![InMemoryFile { path: "a.py".to_string(), content: b"print('hello')".to_vec() }],
        );
        let mut docs = HashMap::new();
        let root = Document::new(
            "root".into(),
            "repo1".into(),
            "owner1".into(),
            "https://example.com/demo".into(),
            "".into(),
            DocKind::Dir,
            None,
        );
        let file = Document::new(
            "file1".into(),
            "repo1".into(),
            "owner1".into(),
            "https://example.com/demo/a.py".into(),
            "a.py".into(),
            DocKind::File,
            Some(14),
        );
        docs.insert(root.id.clone(), root);
        docs.insert(file.id.clone(), file);
        let mut dependencies = HashMap::new();
        dependencies.insert("root".to_string(), None);
        dependencies.insert("file1".to_string(), Some("root".to_string()));
        let repo = rocketdocs_core::document::Repository {
            id: "repo1".into(),
            owner_id: "owner1".into(),
            repo_name: "demo".into(),
            root_doc_id: "root".into(),
            version: None,
            dependencies,
            docs,
            status: StatusEnum::NotStarted,
        };
        (repo, host)
    }

    #[tokio::test]
    async fn generates_and_completes_a_file_document() {
        let (repo, host) = sample_repo_with_file();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo.clone()).await.unwrap();

        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let result = generator.generate("owner1", "file1", "mock-1", &repo_handle, None).await.unwrap();
        assert_eq!(result.status, StatusEnum::Completed);
        assert!(result.markdown.is_some());
        assert!(result.extracted.is_some());
    }

    #[tokio::test]
    async fn directory_requires_completed_children() {
        let (repo, host) = sample_repo_with_file();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo.clone()).await.unwrap();

        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let err = generator
            .generate("owner1", "root", "mock-1", &repo_handle, Some(&["file1".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DependencyNotReady(_)));

        let doc = store.get_document("owner1", "root").await.unwrap();
        assert_eq!(doc.status, StatusEnum::Failed);
    }

    #[tokio::test]
    async fn directory_generation_succeeds_once_children_complete() {
        let (repo, host) = sample_repo_with_file();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo.clone()).await.unwrap();

        let gateway = Gateway::new().with_provider(Arc::new(MockProvider::new("mock")));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        generator.generate("owner1", "file1", "mock-1", &repo_handle, None).await.unwrap();
        let result = generator
            .generate("owner1", "root", "mock-1", &repo_handle, Some(&["file1".to_string()]))
            .await
            .unwrap();
        assert_eq!(result.status, StatusEnum::Completed);
    }

    #[tokio::test]
    async fn truncated_markdown_fails_the_document() {
        let (repo, host) = sample_repo_with_file();
        let store = InMemoryDocumentStore::new();
        store.batch_create_repo(repo.clone()).await.unwrap();

        let provider = MockProvider::new("mock");
        provider.push(MockResponse::Truncated).await;
        let gateway = Gateway::new().with_provider(Arc::new(provider));
        let tokenizer = WhitespaceTokenizer;
        let generator = Generator::new(&store, &host, &gateway, &tokenizer);
        let repo_handle = host.resolve("https://example.com/demo").await.unwrap();

        let err = generator.generate("owner1", "file1", "mock-1", &repo_handle, None).await.unwrap_err();
        assert!(matches!(err, CoreError::LlmTruncated { .. }));
        let doc = store.get_document("owner1", "file1").await.unwrap();
        assert_eq!(doc.status, StatusEnum::Failed);
    }

    #[test]
    fn trim_to_budget_appends_truncation_marker_when_over_budget() {
        let tokenizer = WhitespaceTokenizer;
        let text = "word ".repeat(100);
        let trimmed = trim_to_budget(&tokenizer, &text, 10);
        assert!(trimmed.ends_with("\n..."));
        assert!(tokenizer.count(&trimmed) <= 11); // budget + the "..." token
    }

    #[test]
    fn trim_to_budget_is_a_no_op_under_budget() {
        let tokenizer = WhitespaceTokenizer;
        let text = "short text";
        assert_eq!(trim_to_budget(&tokenizer, text, 100), text);
    }

    #[test]
    fn fallback_description_reads_the_second_heading_body() {
        let markdown = "# file.py\n\n## Overview\n\nThis file does a thing.\n\n## Details\n\nMore.";
        let description = fallback_description(markdown).unwrap();
        assert_eq!(description, "This file does a thing.");
    }

    #[test]
    fn fallback_description_is_none_without_a_second_heading() {
        let markdown = "# file.py\n\njust a paragraph, no further headings.";
        assert!(fallback_description(markdown).is_none());
    }
}
