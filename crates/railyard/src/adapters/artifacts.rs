/*
 *  Copyright 2025-2026 Railyard Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Artifact store adapter.
//!
//! Train source artifacts (Dockerfile, requirements, entry script) and
//! result archives live as named byte blobs in buckets. The production
//! implementation is filesystem-rooted: a bucket is a directory under the
//! store root, an object is a file in it. Stations that keep their object
//! volume mounted locally need nothing more; an HTTP-backed object store
//! can be plugged in behind the same trait.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the artifact store adapter.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object '{name}' not found in bucket '{bucket}'")]
    NotFound { bucket: String, name: String },

    #[error("Invalid object name '{name}'")]
    InvalidName { name: String },

    #[error("Artifact store backend error: {0}")]
    Backend(#[source] std::io::Error),
}

/// Contract for reading and writing named byte blobs in buckets.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Fetches an object's bytes.
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores an object, replacing any previous content.
    async fn put(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError>;
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    root: PathBuf,
}

impl FilesystemArtifactStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `bucket/name` below the root, rejecting names that would
    /// escape it.
    fn object_path(&self, bucket: &str, name: &str) -> Result<PathBuf, StorageError> {
        for segment in [bucket, name] {
            let path = Path::new(segment);
            let escapes = path.is_absolute()
                || path
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
            if segment.is_empty() || escapes {
                return Err(StorageError::InvalidName {
                    name: segment.to_string(),
                });
            }
        }
        Ok(self.root.join(bucket).join(name))
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(bucket, name, size = data.len(), "fetched artifact");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(StorageError::Backend(e)),
        }
    }

    async fn put(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.object_path(bucket, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::Backend)?;
        }
        debug!(bucket, name, size = data.len(), "storing artifact");
        tokio::fs::write(&path, data)
            .await
            .map_err(StorageError::Backend)
    }
}
