//! File intake: turning paths into in-memory source records.
//!
//! Intake never decodes anything — it reads bytes, enforces the per-file
//! size ceiling, and reports failures as per-file messages instead of
//! aborting a batch. Directory walks pick up every file whose extension has
//! a compiled-in decoder.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions with working decoders compiled in.
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp"];

/// Message recorded on items that exceed the intake ceiling.
pub const SIZE_LIMIT_MESSAGE: &str = "File size exceeds 5MB limit.";

/// One source file as handed to the session: a display name plus either its
/// bytes or the human-readable reason intake rejected it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Result<Vec<u8>, String>,
}

impl SourceFile {
    /// Wrap in-memory bytes, applying the same ceiling as the file path.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>, max_bytes: u64) -> Self {
        let outcome = if bytes.len() as u64 > max_bytes {
            Err(SIZE_LIMIT_MESSAGE.to_string())
        } else {
            Ok(bytes)
        };
        Self {
            name: name.into(),
            bytes: outcome,
        }
    }
}

/// Whether a path looks like a decodable image.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Read one file, checking the size ceiling before touching its contents.
pub fn load_file(path: &Path, max_bytes: u64) -> SourceFile {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let outcome = match std::fs::metadata(path) {
        Ok(meta) if meta.len() > max_bytes => Err(SIZE_LIMIT_MESSAGE.to_string()),
        Ok(_) => std::fs::read(path).map_err(|e| format!("Error reading file: {e}")),
        Err(e) => Err(format!("Error reading file: {e}")),
    };

    debug!(path = %path.display(), ok = outcome.is_ok(), "intake");
    SourceFile {
        name,
        bytes: outcome,
    }
}

/// Collect supported image files under `root`, sorted for stable batch
/// order. A single readable file is returned as-is regardless of extension.
pub fn collect_sources(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_supported(path))
        .collect();
    paths.sort();
    paths
}
