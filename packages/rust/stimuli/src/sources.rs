//! Stimulus source resolution: path/glob patterns → concrete loadable files.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// On-disk format of a stimulus source, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Jsonl,
}

impl SourceFormat {
    /// Infer the format from a file path, if the extension is supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => Some(Self::Csv),
            Some("tsv") => Some(Self::Tsv),
            Some("jsonl") | Some("ndjson") => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// A concrete, loadable stimulus source file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedSource {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// File name, for logging.
    pub basename: String,
    pub format: SourceFormat,
}

impl ResolvedSource {
    fn new(path: PathBuf, format: SourceFormat) -> Self {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            basename,
            format,
        }
    }
}

/// Expand one source pattern (literal path or glob) relative to `root`.
///
/// Literal paths resolve even if the file is currently absent — the loader
/// degrades to zero records at load time. Glob patterns expand to every
/// matching file under `root` in sorted path order; unsupported extensions
/// are skipped with a warning.
pub fn expand_source(root: &Path, pattern: &str) -> Vec<ResolvedSource> {
    if !is_glob(pattern) {
        let path = root.join(pattern);
        return match SourceFormat::from_path(&path) {
            Some(format) => vec![ResolvedSource::new(path, format)],
            None => {
                warn!(source = pattern, "unsupported stimulus source extension, skipping");
                Vec::new()
            }
        };
    }

    let Some(matcher) = glob_to_regex(pattern) else {
        warn!(source = pattern, "invalid source glob pattern, skipping");
        return Vec::new();
    };

    let mut matches: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let relative = relative.to_string_lossy().replace('\\', "/");
            matcher.is_match(&relative).then(|| entry.into_path())
        })
        .collect();
    matches.sort();

    if matches.is_empty() {
        warn!(source = pattern, root = %root.display(), "glob matched no stimulus files");
    }

    matches
        .into_iter()
        .filter_map(|path| match SourceFormat::from_path(&path) {
            Some(format) => Some(ResolvedSource::new(path, format)),
            None => {
                warn!(path = %path.display(), "unsupported stimulus source extension, skipping");
                None
            }
        })
        .collect()
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Convert a glob-like pattern to an anchored regex over relative paths.
fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*/", "(?:[^/]+/)*")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    regex::Regex::new(&format!("^{escaped}$")).ok()
}
