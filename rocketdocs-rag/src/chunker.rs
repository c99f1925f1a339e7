//! The Text Chunker (C5): a deterministic, token-bounded, Markdown-aware
//! hierarchical splitter.

use rocketdocs_core::tokenizer::Tokenizer;

/// Ordered from highest to lowest priority: headings are preferred split
/// points, spaces are the last resort before falling back to even splitting.
const SEPARATORS: &[&str] = &["\n# ", "\n## ", "\n### ", "\n```", "\n---\n", "\n\n", "\n", " "];

/// Splits markdown text into chunks bounded by token count.
///
/// A `Chunker` value holds only its configuration and a shared tokenizer
/// reference; `chunk` takes `&self` so the same value is reused
/// concurrently across tasks.
pub struct Chunker {
    chunk_size: usize,
    chunk_minimum: usize,
    tokenizer: Box<dyn Tokenizer>,
}

impl Chunker {
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { chunk_size: 250, chunk_minimum: 100, tokenizer }
    }

    pub fn with_sizes(mut self, chunk_size: usize, chunk_minimum: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_minimum = chunk_minimum;
        self
    }

    /// Split `text` into chunks of at most `chunk_size` tokens each.
    /// Returns an empty vec for empty or whitespace-only input.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let pieces = self.split_recursive(text, SEPARATORS);
        self.merge_neighbors(pieces)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if self.tokenizer.count(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some((separator, rest)) = separators.split_first() else {
            return self.split_evenly(text);
        };

        let segments = split_keeping_left(text, separator);
        if segments.len() <= 1 {
            // separator did not reduce this chunk at all; try the next one.
            return self.split_recursive(text, rest);
        }

        let mut out = Vec::new();
        for segment in segments {
            if segment.trim().is_empty() {
                continue;
            }
            if self.tokenizer.count(&segment) > self.chunk_size {
                out.extend(self.split_recursive(&segment, rest));
            } else {
                out.push(segment);
            }
        }
        out
    }

    /// Last resort: divide `text` into an increasing number of
    /// equal-length (by character count) pieces until every piece fits,
    /// re-measuring by token count after each attempt.
    fn split_evenly(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut piece_count = ((self.tokenizer.count(text) as f64 / self.chunk_size as f64).ceil() as usize).max(1);

        loop {
            let piece_len = chars.len().div_ceil(piece_count);
            let pieces: Vec<String> = chars
                .chunks(piece_len.max(1))
                .map(|slice| slice.iter().collect::<String>())
                .collect();

            if pieces.iter().all(|p| self.tokenizer.count(p) <= self.chunk_size) || piece_len <= 1 {
                return pieces;
            }
            piece_count += 1;
        }
    }

    /// Merge any chunk below `chunk_minimum` tokens into a neighbor,
    /// preferring its predecessor, falling back to its successor, and
    /// otherwise leaving it as its own chunk; whitespace-only chunks are
    /// dropped first.
    fn merge_neighbors(&self, pieces: Vec<String>) -> Vec<String> {
        let pieces: Vec<String> = pieces.into_iter().filter(|p| !p.trim().is_empty()).collect();
        let mut merged: Vec<String> = Vec::new();
        let mut i = 0;

        while i < pieces.len() {
            let piece = &pieces[i];
            if self.tokenizer.count(piece) >= self.chunk_minimum {
                merged.push(piece.clone());
                i += 1;
                continue;
            }

            if let Some(predecessor) = merged.last() {
                let union_with_predecessor = format!("{predecessor}{piece}");
                if self.tokenizer.count(&union_with_predecessor) <= self.chunk_size {
                    *merged.last_mut().unwrap() = union_with_predecessor;
                    i += 1;
                    continue;
                }
            }

            if let Some(successor) = pieces.get(i + 1) {
                let union_with_successor = format!("{piece}{successor}");
                if self.tokenizer.count(&union_with_successor) <= self.chunk_size {
                    merged.push(union_with_successor);
                    i += 2;
                    continue;
                }
            }

            merged.push(piece.clone());
            i += 1;
        }

        merged
    }
}

/// Split `text` at every occurrence of `separator`, keeping the separator
/// attached to the end of the preceding (left) piece.
fn split_keeping_left(text: &str, separator: &str) -> Vec<String> {
    if separator == " " {
        return text.split(' ').map(|s| s.to_string()).collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        result.push(text[start..].to_string());
    }
    result
}
