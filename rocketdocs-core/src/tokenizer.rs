//! Pluggable token counting, threaded through the LLM Gateway per model.
//!
//! §9 of the design flags that a single hard-wired tokenizer regardless of
//! completion model is the wrong pattern; a [`Tokenizer`] is attached to
//! each provider/model pairing instead. [`WhitespaceTokenizer`] is the
//! default so the crate never needs a model download to run or test.

/// Counts and truncates text the way a model's own tokenizer would.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens `text` would encode to.
    fn count(&self, text: &str) -> usize;
}

/// A cheap approximation: tokens are whitespace-delimited words plus
/// standalone punctuation, which keeps counts in the right order of
/// magnitude without pulling in a model file.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count(&self, text: &str) -> usize {
        let mut count = 0usize;
        let mut in_word = false;
        for ch in text.chars() {
            if ch.is_whitespace() {
                in_word = false;
            } else if ch.is_alphanumeric() {
                if !in_word {
                    count += 1;
                    in_word = true;
                }
            } else {
                // punctuation counts as its own token, matching how BPE
                // tokenizers typically split it off.
                count += 1;
                in_word = false;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_punctuation() {
        let t = WhitespaceTokenizer;
        assert_eq!(t.count(""), 0);
        assert_eq!(t.count("hello world"), 2);
        assert_eq!(t.count("hello, world!"), 4);
    }
}
