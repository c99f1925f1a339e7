//! Deciding whether a file's content is source code worth documenting.

/// Pluggable "is this source code?" oracle, consulted for files that
/// survive the name/size exclusion rules but carry no unambiguous
/// extension (or need a content sniff to rule out generated/binary
/// files masquerading behind a plausible suffix).
pub trait SourceClassifier: Send + Sync {
    fn is_source_code(&self, file_name: &str, content: &[u8]) -> bool;
}

/// Suffix-table classifier: known source extensions pass outright, known
/// binary/asset/lockfile extensions fail outright, and anything else
/// falls back to a cheap text sniff (mostly-printable, no embedded NUL).
pub struct ExtensionClassifier;

const SOURCE_SUFFIXES: &[&str] = &[
    ".rs", ".py", ".js", ".jsx", ".ts", ".tsx", ".go", ".java", ".kt", ".rb", ".php", ".c", ".h",
    ".cpp", ".cc", ".hpp", ".cs", ".swift", ".scala", ".sh", ".bash", ".zsh", ".sql", ".proto",
    ".graphql", ".md", ".mdx", ".rst", ".toml", ".yaml", ".yml", ".json", ".html", ".css", ".scss",
    ".vue", ".svelte", ".lua", ".ex", ".exs", ".erl", ".hs", ".clj", ".dart", ".zig", ".nim",
    ".tf", ".dockerfile", "Dockerfile", "Makefile",
];

const NON_SOURCE_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".ico", ".webp", ".svg", ".pdf", ".zip", ".tar",
    ".gz", ".bz2", ".7z", ".rar", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".mp3", ".mp4",
    ".mov", ".avi", ".wav", ".flac", ".exe", ".dll", ".so", ".dylib", ".a", ".o", ".class",
    ".jar", ".wasm", ".pyc", ".lock", ".min.js", ".min.css", ".map", ".db", ".sqlite",
    ".parquet", ".onnx", ".bin", ".pt", ".pth", ".safetensors",
];

impl SourceClassifier for ExtensionClassifier {
    fn is_source_code(&self, file_name: &str, content: &[u8]) -> bool {
        let lower = file_name.to_ascii_lowercase();
        if NON_SOURCE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
            return false;
        }
        if SOURCE_SUFFIXES.iter().any(|suffix| lower.ends_with(&suffix.to_ascii_lowercase())) {
            return true;
        }
        looks_like_text(content)
    }
}

fn looks_like_text(content: &[u8]) -> bool {
    if content.is_empty() {
        return true;
    }
    if content.contains(&0) {
        return false;
    }
    let sample = &content[..content.len().min(4096)];
    let printable = sample
        .iter()
        .filter(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
        .count();
    (printable as f64 / sample.len() as f64) > 0.85
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_source_suffix_passes_without_sniffing() {
        let classifier = ExtensionClassifier;
        assert!(classifier.is_source_code("main.rs", &[0, 1, 2]));
    }

    #[test]
    fn known_binary_suffix_fails_without_sniffing() {
        let classifier = ExtensionClassifier;
        assert!(!classifier.is_source_code("logo.png", b"not actually binary"));
    }

    #[test]
    fn unknown_suffix_falls_back_to_content_sniff() {
        let classifier = ExtensionClassifier;
        assert!(classifier.is_source_code("LICENSE", b"Apache License\nVersion 2.0\n"));
        assert!(!classifier.is_source_code("blob", &[0u8, 159, 146, 150]));
    }
}
