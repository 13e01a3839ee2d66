// src/resource.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

const BLOB_PREFIX: &str = "blob:affirm/";
const FILE_PREFIX: &str = "file://";

/// Opaque handle to audio bytes: an in-memory blob or a path on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceUrl(String);

impl ResourceUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blob(&self) -> bool {
        self.0.starts_with(BLOB_PREFIX)
    }

    /// Filesystem path for non-blob urls.
    pub fn to_path(&self) -> Option<PathBuf> {
        if self.is_blob() {
            return None;
        }
        let raw = self.0.strip_prefix(FILE_PREFIX).unwrap_or(&self.0);
        Some(PathBuf::from(raw))
    }

    /// Lowercased file extension, used as a format hint when probing.
    pub fn extension(&self) -> Option<String> {
        self.to_path()?
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("blob {0} was revoked or never created")]
    UnknownBlob(ResourceUrl),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Arc<[u8]>,
    pub mime: Option<String>,
}

struct Blob {
    bytes: Arc<[u8]>,
    mime: String,
}

/// Registry of in-memory blobs. Clones share the same registry.
#[derive(Clone, Default)]
pub struct ResourceStore {
    blobs: Arc<Mutex<HashMap<ResourceUrl, Blob>>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>, mime: &str) -> ResourceUrl {
        let url = ResourceUrl(format!("{BLOB_PREFIX}{}", Uuid::new_v4()));
        log::debug!("created {url} ({} bytes, {mime})", bytes.len());
        self.lock().insert(
            url.clone(),
            Blob {
                bytes: bytes.into(),
                mime: mime.to_string(),
            },
        );
        url
    }

    /// Release a blob. Returns false when it was already gone or is not a blob.
    pub fn revoke(&self, url: &ResourceUrl) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            log::debug!("revoked {url}");
        }
        removed
    }

    pub fn contains(&self, url: &ResourceUrl) -> bool {
        self.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub async fn fetch(&self, url: &ResourceUrl) -> Result<Fetched, FetchError> {
        match url.to_path() {
            None => {
                let blobs = self.lock();
                let blob = blobs
                    .get(url)
                    .ok_or_else(|| FetchError::UnknownBlob(url.clone()))?;
                Ok(Fetched {
                    bytes: blob.bytes.clone(),
                    mime: Some(blob.mime.clone()),
                })
            }
            Some(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|source| FetchError::Io { path, source })?;
                Ok(Fetched {
                    bytes: bytes.into(),
                    mime: None,
                })
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceUrl, Blob>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
