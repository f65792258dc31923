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

//! Container runtime adapter.
//!
//! The production implementation talks to the local Docker daemon via
//! bollard. File movement in and out of containers goes through tar
//! archives because that is the only file-injection primitive the Docker
//! API offers; callers that need to place a single file must wrap it in a
//! single-entry archive first.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, DownloadFromContainerOptions, StartContainerOptions,
    UploadToContainerOptions, WaitContainerOptions,
};
use bollard::image::BuildImageOptions;
use bollard::Docker;
use futures::StreamExt;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors raised by the container runtime adapter.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Container runtime unreachable: {0}")]
    Connection(#[source] bollard::errors::Error),

    #[error("Image build failed: {0}")]
    BuildFailed(String),

    #[error("Build context I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container runtime operation failed: {0}")]
    Api(#[from] bollard::errors::Error),

    #[error("Container runtime returned a malformed reply: {0}")]
    MalformedReply(String),
}

/// Terminal state of a waited-on container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Process exit code reported by the runtime.
    pub code: i64,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Contract for building images and driving containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Builds an image from the given build-context directory, attaching
    /// the labels to the image, and returns a reference to it.
    async fn build(
        &self,
        context_dir: &Path,
        labels: &HashMap<String, String>,
    ) -> Result<String, RuntimeError>;

    /// Creates a container from an image without starting it.
    async fn create_container(&self, image: &str) -> Result<String, RuntimeError>;

    /// Injects a tar archive into the container filesystem at `path`.
    async fn inject_archive(
        &self,
        container: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError>;

    /// Blocks until the container is no longer running and returns its
    /// exit status.
    async fn wait(&self, container: &str) -> Result<ExitStatus, RuntimeError>;

    /// Commits the container's filesystem into a new image and returns
    /// the committed `repository:tag` reference.
    async fn commit(
        &self,
        container: &str,
        repository: &str,
        tag: &str,
    ) -> Result<String, RuntimeError>;

    /// Starts a fresh container from an image with the given environment
    /// and returns the container id.
    async fn run(
        &self,
        image: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, RuntimeError>;

    /// Extracts `path` from the container filesystem as a tar archive.
    async fn extract_archive(&self, container: &str, path: &str) -> Result<Vec<u8>, RuntimeError>;
}

/// Docker implementation of [`ContainerRuntime`] over the daemon socket.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connects to the daemon, via the given socket path or the
    /// platform defaults.
    pub fn connect(socket: Option<&str>) -> Result<Self, RuntimeError> {
        let docker = match socket {
            Some(path) => Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION),
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(RuntimeError::Connection)?;
        Ok(Self { docker })
    }

    /// Packs a build-context directory into an in-memory tar archive.
    fn archive_directory(dir: &Path) -> std::io::Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());
        builder.append_dir_all(".", dir)?;
        builder.into_inner()
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn build(
        &self,
        context_dir: &Path,
        labels: &HashMap<String, String>,
    ) -> Result<String, RuntimeError> {
        let context = Self::archive_directory(context_dir)?;
        let build_tag = format!("railyard-build:{}", Uuid::new_v4().simple());

        let options = BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_string(),
            t: build_tag.clone(),
            rm: true,
            labels: labels.clone(),
            ..Default::default()
        };

        debug!(tag = %build_tag, "building train image");
        let mut stream = self.docker.build_image(options, None, Some(context.into()));
        while let Some(update) = stream.next().await {
            let update = update?;
            if let Some(error) = update.error {
                return Err(RuntimeError::BuildFailed(error));
            }
        }

        info!(tag = %build_tag, "train image built");
        Ok(build_tag)
    }

    async fn create_container(&self, image: &str) -> Result<String, RuntimeError> {
        let config = Config::<String> {
            image: Some(image.to_string()),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container::<String, String>(None, config)
            .await?;
        Ok(created.id)
    }

    async fn inject_archive(
        &self,
        container: &str,
        path: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        let options = UploadToContainerOptions::<String> {
            path: path.to_string(),
            ..Default::default()
        };
        self.docker
            .upload_to_container(container, Some(options), archive.into())
            .await?;
        Ok(())
    }

    async fn wait(&self, container: &str) -> Result<ExitStatus, RuntimeError> {
        let options = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut stream = self.docker.wait_container(container, Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(ExitStatus {
                code: response.status_code,
            }),
            // The daemon reports nonzero exits through the error channel;
            // for the adapter they are ordinary terminal states.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => {
                Ok(ExitStatus { code })
            }
            Some(Err(e)) => Err(RuntimeError::Api(e)),
            None => Err(RuntimeError::MalformedReply(
                "wait stream ended without a status".to_string(),
            )),
        }
    }

    async fn commit(
        &self,
        container: &str,
        repository: &str,
        tag: &str,
    ) -> Result<String, RuntimeError> {
        let options = bollard::image::CommitContainerOptions::<String> {
            container: container.to_string(),
            repo: repository.to_string(),
            tag: tag.to_string(),
            pause: true,
            ..Default::default()
        };
        self.docker
            .commit_container(options, Config::<String>::default())
            .await?;

        let reference = format!("{}:{}", repository, tag);
        info!(image = %reference, "committed train image");
        Ok(reference)
    }

    async fn run(
        &self,
        image: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, RuntimeError> {
        let env: Vec<String> = env
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        let config = Config::<String> {
            image: Some(image.to_string()),
            env: Some(env),
            ..Default::default()
        };
        let created = self
            .docker
            .create_container::<String, String>(None, config)
            .await?;
        self.docker
            .start_container::<String>(&created.id, None::<StartContainerOptions<String>>)
            .await?;
        debug!(container = %created.id, %image, "started train container");
        Ok(created.id)
    }

    async fn extract_archive(&self, container: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        let options = DownloadFromContainerOptions {
            path: path.to_string(),
        };
        let mut stream = self.docker.download_from_container(container, Some(options));
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes)
    }
}
