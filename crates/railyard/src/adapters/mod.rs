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

//! Adapters for the station's external collaborators.
//!
//! Each adapter is a trait seam plus a production implementation:
//!
//! - [`workflow::WorkflowEngine`] / [`workflow::AirflowClient`]: triggers
//!   remote train executions and reports run state
//! - [`registry::ImageRegistry`] / [`registry::HarborClient`]: lists the
//!   image repositories visible to a station
//! - [`artifacts::ArtifactStore`] / [`artifacts::FilesystemArtifactStore`]:
//!   named byte blobs in buckets
//! - [`runtime::ContainerRuntime`] / [`runtime::DockerRuntime`]: image
//!   build, container lifecycle and archive movement
//!
//! The engine and the local pipeline receive these as explicitly
//! constructed handles at construction time; there is no lazily
//! initialized shared client state.

pub mod artifacts;
pub mod registry;
pub mod runtime;
pub mod workflow;

pub use artifacts::{ArtifactStore, FilesystemArtifactStore, StorageError};
pub use registry::{HarborClient, ImageRegistry, RegistryError};
pub use runtime::{ContainerRuntime, DockerRuntime, ExitStatus, RuntimeError};
pub use workflow::{AirflowClient, WorkflowEngine, WorkflowError, WorkflowRunState};

/// Result of an adapter health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unavailable,
}
