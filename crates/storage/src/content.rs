//! Read-only sources for bundled lesson and quiz documents.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use course_core::model::ContentKey;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised while resolving or decoding a content document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed document {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves a `ContentKey` to the raw JSON text of the document.
///
/// A missing document is `Ok(None)`, not an error.
pub trait ContentSource: Send + Sync {
    /// Read the document behind `key`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Io` if the document exists but cannot be read.
    fn read(&self, key: &ContentKey) -> Result<Option<String>, ContentError>;

    /// Whether a document is present for `key`.
    fn exists(&self, key: &ContentKey) -> bool {
        matches!(self.read(key), Ok(Some(_)))
    }
}

/// Read and deserialize the document behind `key`.
///
/// # Errors
///
/// Returns `ContentError` if reading fails or the JSON does not match `T`.
pub fn load<T: DeserializeOwned>(
    source: &dyn ContentSource,
    key: &ContentKey,
) -> Result<Option<T>, ContentError> {
    let Some(raw) = source.read(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ContentError::Malformed {
            path: key.path(),
            source,
        })
}

/// Documents laid out under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    root: PathBuf,
}

impl DirectoryContent {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &ContentKey) -> PathBuf {
        key.path()
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ContentSource for DirectoryContent {
    fn read(&self, key: &ContentKey) -> Result<Option<String>, ContentError> {
        let path = self.resolve(key);
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ContentError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn exists(&self, key: &ContentKey) -> bool {
        self.resolve(key).is_file()
    }
}

/// Documents held in memory, keyed by content path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContent {
    documents: HashMap<String, String>,
}

impl InMemoryContent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ContentKey, json: impl Into<String>) {
        self.documents.insert(key.path(), json.into());
    }

    #[must_use]
    pub fn with(mut self, key: ContentKey, json: impl Into<String>) -> Self {
        self.insert(key, json);
        self
    }
}

impl ContentSource for InMemoryContent {
    fn read(&self, key: &ContentKey) -> Result<Option<String>, ContentError> {
        Ok(self.documents.get(&key.path()).cloned())
    }
}
