//! Directory/file exclusion rules applied during the tree walk.

/// Tunable exclusion rules: which directories never get walked, which
/// file suffixes are skipped outright, and the size cutoff beyond which
/// a file is excluded regardless of content.
#[derive(Debug, Clone)]
pub struct IdentifierConfig {
    pub excluded_dir_names: Vec<String>,
    pub excluded_file_suffixes: Vec<String>,
    pub max_file_bytes: u64,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            excluded_dir_names: vec![
                ".git".into(),
                ".github".into(),
                ".vscode".into(),
                ".idea".into(),
                "node_modules".into(),
                "venv".into(),
                ".venv".into(),
                "target".into(),
                "dist".into(),
                "build".into(),
                "patch".into(),
                "packages/blobs".into(),
                "__pycache__".into(),
                "vendor".into(),
            ],
            excluded_file_suffixes: vec![
                ".lock".into(),
                ".min.js".into(),
                ".min.css".into(),
                ".map".into(),
            ],
            max_file_bytes: 247_500,
        }
    }
}

impl IdentifierConfig {
    /// Directories are excluded by exact basename match against the
    /// configured list, or by the generic dotfile/underscore-prefix rule.
    pub fn excludes_dir(&self, name: &str) -> bool {
        if name == "node_modules" || name.starts_with('.') || name.starts_with('_') {
            return true;
        }
        self.excluded_dir_names.iter().any(|excluded| excluded == name)
    }

    /// Files are excluded by dotfile/underscore-prefix rule or configured
    /// suffix match; size and content-classification are checked
    /// separately by the caller.
    pub fn excludes_file_name(&self, name: &str) -> bool {
        if name.starts_with('.') || name.starts_with('_') {
            return true;
        }
        let lower = name.to_ascii_lowercase();
        self.excluded_file_suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
    }
}
