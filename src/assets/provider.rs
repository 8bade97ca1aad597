//! Asset providers.

use axum::body::Bytes;
use axum::http::HeaderValue;
use mime_guess::mime;
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Read-only view of a built frontend bundle.
///
/// Paths are relative, `/`-separated and never start with `/`
/// (`index.html`, `assets/app.abc123.js`).
pub trait AssetProvider: Send + Sync + 'static {
    /// Contents of the file at `path`, or `None` if it does not exist.
    fn open(&self, path: &str) -> Option<Bytes>;
}

/// Bundle held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Bytes>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content at `path`.
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Bytes>) {
        let path = path.into();
        self.files
            .insert(path.trim_start_matches('/').to_string(), contents.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetProvider for MemoryAssets {
    fn open(&self, path: &str) -> Option<Bytes> {
        self.files.get(path).cloned()
    }
}

/// Bundle snapshotted from a build directory at startup.
#[derive(Debug, Clone)]
pub struct DirAssets {
    inner: MemoryAssets,
}

impl DirAssets {
    /// Read every regular file under `root` into memory.
    pub fn load(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        let mut inner = MemoryAssets::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let Ok(relative) = path.strip_prefix(root) else {
                        continue;
                    };
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    inner.insert(key, std::fs::read(&path)?);
                }
            }
        }

        tracing::info!(root = %root.display(), files = inner.len(), "Loaded static bundle");
        Ok(Self { inner })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AssetProvider for DirAssets {
    fn open(&self, path: &str) -> Option<Bytes> {
        self.inner.open(path)
    }
}

/// `Content-Type` for a bundle file, guessed from its extension.
///
/// Text types carry an explicit UTF-8 charset; unknown extensions are
/// `application/octet-stream`.
pub fn content_type(path: &str) -> HeaderValue {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let value = if mime.type_() == mime::TEXT && mime.get_param(mime::CHARSET).is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    };
    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("application/octet-stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_assets_uses_relative_slash_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("assets").join("app.abc123.js"), "console.log(1)").unwrap();

        let assets = DirAssets::load(dir.path()).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets.open("index.html").unwrap(), Bytes::from_static(b"<html></html>"));
        assert!(assets.open("assets/app.abc123.js").is_some());
        assert!(assets.open("/index.html").is_none());
    }

    #[test]
    fn missing_dir_is_error() {
        assert!(DirAssets::load("/no/such/bundle").is_err());
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("assets/style.3f2a.css"), "text/css; charset=utf-8");
        assert!(content_type("assets/app.abc123.js")
            .to_str()
            .unwrap()
            .contains("javascript"));
        assert_eq!(content_type("logo.png"), "image/png");
        assert_eq!(content_type("app.wasm"), "application/wasm");
        assert_eq!(content_type("LICENSE"), "application/octet-stream");
    }
}
