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

//! Local Build-Run-Collect Pipeline
//!
//! Executes a train entirely on the local host, for trains whose source
//! artifacts (Dockerfile, requirements, ignore file, entry script) live
//! in the artifact store rather than as a registry image. The protocol
//! is strictly ordered:
//!
//! 1. fetch the build-context objects into a fresh scratch directory
//! 2. build an image from it, labeled with the run's parameter map
//! 3. create (not start) a container from the build image
//! 4. fetch the endpoint object, wrap it in a single-entry tar archive
//!    and inject it at the container root, then wait for it to settle
//! 5. commit the container as the runnable image; the labeled build
//!    image itself is never the one executed
//! 6. run a fresh container from the committed image with the parameter
//!    map as environment and wait for its exit
//! 7. extract the results path as an archive and write it to a local
//!    results file
//! 8. upload the results archive back to the originating bucket
//!
//! A failure at any step aborts the remaining steps; the error names the
//! step so build, run and upload failures stay distinguishable. No
//! retries and no compensating actions happen at this layer. Scratch
//! files live in a per-invocation temp directory and are not cleaned up
//! beyond what the temp dir's lifetime provides.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::adapters::artifacts::{ArtifactStore, StorageError};
use crate::adapters::runtime::{ContainerRuntime, RuntimeError};

/// Container path the finished train writes its results under.
pub const RESULTS_PATH: &str = "opt/pht_results";

/// Object name the results archive is uploaded as.
pub const RESULTS_OBJECT: &str = "results.tar";

/// The pipeline step an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    FetchContext,
    BuildImage,
    CreateContainer,
    InjectEndpoint,
    CommitImage,
    RunTrain,
    CollectResults,
    UploadResults,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::FetchContext => "fetch-context",
            PipelineStep::BuildImage => "build-image",
            PipelineStep::CreateContainer => "create-container",
            PipelineStep::InjectEndpoint => "inject-endpoint",
            PipelineStep::CommitImage => "commit-image",
            PipelineStep::RunTrain => "run-train",
            PipelineStep::CollectResults => "collect-results",
            PipelineStep::UploadResults => "upload-results",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the local pipeline, tagged with the failing step.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Artifact store failed during {step}: {source}")]
    Storage {
        step: PipelineStep,
        #[source]
        source: StorageError,
    },

    #[error("Container runtime failed during {step}: {source}")]
    Runtime {
        step: PipelineStep,
        #[source]
        source: RuntimeError,
    },

    #[error("Scratch I/O failed during {step}: {source}")]
    Io {
        step: PipelineStep,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// The step the pipeline aborted in.
    pub fn step(&self) -> PipelineStep {
        match self {
            PipelineError::Storage { step, .. }
            | PipelineError::Runtime { step, .. }
            | PipelineError::Io { step, .. } => *step,
        }
    }
}

/// Specification of a single local train run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Bucket holding the train's source artifacts; results are uploaded
    /// back to it
    pub bucket: String,
    /// Object name of the Dockerfile
    pub dockerfile: String,
    /// Object name of the requirements file
    pub requirements: String,
    /// Object name of the dockerignore file
    pub dockerignore: String,
    /// Object name of the entry script; also determines the committed
    /// repository name
    pub endpoint: String,
    /// Parameter map for the run: build labels and run-time environment
    /// (endpoint credentials and the like)
    pub params: HashMap<String, String>,
}

impl RunSpec {
    /// Repository name the runnable image is committed under.
    pub fn committed_repository(&self) -> String {
        format!("local_train_{}", self.endpoint.to_lowercase())
    }
}

/// Outcome of a completed local run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Exit code of the train container
    pub exit_code: i64,
    /// The committed runnable image reference
    pub image: String,
    /// Bucket-qualified name of the uploaded results archive
    pub results_object: String,
}

/// The local build-run-collect pipeline.
pub struct LocalTrainPipeline {
    store: Arc<dyn ArtifactStore>,
    runtime: Arc<dyn ContainerRuntime>,
}

impl LocalTrainPipeline {
    /// Creates a pipeline over the given adapter handles.
    pub fn new(store: Arc<dyn ArtifactStore>, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { store, runtime }
    }

    /// Runs the full protocol for one train.
    pub async fn execute(&self, spec: &RunSpec) -> Result<PipelineOutcome, PipelineError> {
        let scratch = tempfile::tempdir().map_err(|source| PipelineError::Io {
            step: PipelineStep::FetchContext,
            source,
        })?;

        // 1. Build context into the scratch directory, under the object
        //    names the Dockerfile expects.
        for name in [&spec.dockerfile, &spec.requirements, &spec.dockerignore] {
            let bytes = self
                .store
                .get(&spec.bucket, name)
                .await
                .map_err(|source| PipelineError::Storage {
                    step: PipelineStep::FetchContext,
                    source,
                })?;
            tokio::fs::write(scratch.path().join(name), bytes)
                .await
                .map_err(|source| PipelineError::Io {
                    step: PipelineStep::FetchContext,
                    source,
                })?;
        }
        debug!(bucket = %spec.bucket, "fetched build context");

        // 2. Build, labeled with the run parameters.
        let build_image = self
            .runtime
            .build(scratch.path(), &spec.params)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::BuildImage,
                source,
            })?;

        // 3. Created, not started: the container only exists to receive
        //    the endpoint file.
        let container = self
            .runtime
            .create_container(&build_image)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::CreateContainer,
                source,
            })?;

        // 4. The runtime's injection primitive accepts archive streams
        //    only, so the endpoint file travels wrapped in a single-entry
        //    tar archive.
        let endpoint = self
            .store
            .get(&spec.bucket, &spec.endpoint)
            .await
            .map_err(|source| PipelineError::Storage {
                step: PipelineStep::InjectEndpoint,
                source,
            })?;
        let archive =
            single_entry_archive(&spec.endpoint, &endpoint).map_err(|source| PipelineError::Io {
                step: PipelineStep::InjectEndpoint,
                source,
            })?;
        self.runtime
            .inject_archive(&container, "/", archive)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::InjectEndpoint,
                source,
            })?;
        self.runtime
            .wait(&container)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::InjectEndpoint,
                source,
            })?;

        // 5. Only the post-injection commit is runnable; the
        //    credential-labeled build image never executes.
        let image = self
            .runtime
            .commit(&container, &spec.committed_repository(), "latest")
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::CommitImage,
                source,
            })?;

        // 6. Run with the parameter map as environment.
        let runner = self
            .runtime
            .run(&image, &spec.params)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::RunTrain,
                source,
            })?;
        let exit = self
            .runtime
            .wait(&runner)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::RunTrain,
                source,
            })?;
        info!(container = %runner, exit_code = exit.code, "train run finished");

        // 7. Results out of the container, into a local archive file.
        let results = self
            .runtime
            .extract_archive(&runner, RESULTS_PATH)
            .await
            .map_err(|source| PipelineError::Runtime {
                step: PipelineStep::CollectResults,
                source,
            })?;
        let results_file = scratch.path().join(RESULTS_OBJECT);
        tokio::fs::write(&results_file, &results)
            .await
            .map_err(|source| PipelineError::Io {
                step: PipelineStep::CollectResults,
                source,
            })?;

        // 8. Upload back to the originating bucket.
        let bytes = tokio::fs::read(&results_file)
            .await
            .map_err(|source| PipelineError::Io {
                step: PipelineStep::UploadResults,
                source,
            })?;
        self.store
            .put(&spec.bucket, RESULTS_OBJECT, bytes)
            .await
            .map_err(|source| PipelineError::Storage {
                step: PipelineStep::UploadResults,
                source,
            })?;

        info!(
            bucket = %spec.bucket,
            image = %image,
            "uploaded train results"
        );
        Ok(PipelineOutcome {
            exit_code: exit.code,
            image,
            results_object: format!("{}/{}", spec.bucket, RESULTS_OBJECT),
        })
    }
}

/// Wraps a single file in an in-memory tar archive entry carrying its
/// name.
fn single_entry_archive(name: &str, data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, data)?;
    builder.into_inner()
}
