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

//! Shared fixtures and scripted adapter doubles for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;

use railyard::adapters::artifacts::{ArtifactStore, StorageError};
use railyard::adapters::registry::{ImageRegistry, RegistryError};
use railyard::adapters::runtime::{ContainerRuntime, ExitStatus, RuntimeError};
use railyard::adapters::workflow::{WorkflowEngine, WorkflowError, WorkflowRunState};
use railyard::adapters::HealthStatus;
use railyard::{Database, TrainEngine};

static LOGGING: Lazy<()> = Lazy::new(|| railyard::init_logging(Some("warn")));

/// Creates a fresh in-memory database with migrations applied.
pub async fn test_database() -> Database {
    Lazy::force(&LOGGING);

    let url = format!(
        "file:railyard_test_{}?mode=memory&cache=shared",
        uuid::Uuid::new_v4().simple()
    );
    let database = Database::new(&url, 1);
    database.run_migrations().await.expect("migrations apply");
    database
}

/// Workflow engine double: records triggers, can be scripted to fail,
/// reports a configurable run state.
pub struct MockWorkflowEngine {
    pub triggers: Mutex<Vec<(String, serde_json::Value)>>,
    fail_next: AtomicBool,
    counter: AtomicUsize,
    run_state: Mutex<WorkflowRunState>,
}

impl MockWorkflowEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            triggers: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            counter: AtomicUsize::new(0),
            run_state: Mutex::new(WorkflowRunState::Running),
        })
    }

    /// Makes every subsequent trigger fail as if the engine were down.
    pub fn fail_triggers(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn set_run_state(&self, state: WorkflowRunState) {
        *self.run_state.lock().unwrap() = state;
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowEngine for MockWorkflowEngine {
    async fn trigger(
        &self,
        workflow: &str,
        conf: serde_json::Value,
    ) -> Result<String, WorkflowError> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(WorkflowError::Rejected {
                status: 503,
                detail: "scheduler unavailable".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.triggers
            .lock()
            .unwrap()
            .push((workflow.to_string(), conf));
        Ok(format!("manual__{:04}", n))
    }

    async fn run_state(
        &self,
        _workflow: &str,
        _run_id: &str,
    ) -> Result<WorkflowRunState, WorkflowError> {
        Ok(*self.run_state.lock().unwrap())
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// Image registry double backed by a fixed station -> repositories map.
pub struct MockImageRegistry {
    repos: HashMap<i64, Vec<String>>,
}

impl MockImageRegistry {
    pub fn new(repos: HashMap<i64, Vec<String>>) -> Arc<Self> {
        Arc::new(Self { repos })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(HashMap::new())
    }
}

#[async_trait]
impl ImageRegistry for MockImageRegistry {
    async fn repositories_for_station(
        &self,
        station_id: i64,
    ) -> Result<Vec<String>, RegistryError> {
        self.repos
            .get(&station_id)
            .cloned()
            .ok_or(RegistryError::UnknownStation { station_id })
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

/// In-memory artifact store.
pub struct MemoryArtifactStore {
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
        })
    }

    pub fn insert(&self, bucket: &str, name: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), data.to_vec());
    }

    pub fn get_object(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        self.get_object(bucket, name)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            })
    }

    async fn put(&self, bucket: &str, name: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), data);
        Ok(())
    }
}

/// Container runtime double recording every call in order.
pub struct ScriptedRuntime {
    pub calls: Mutex<Vec<String>>,
    fail_build: AtomicBool,
}

impl ScriptedRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail_build: AtomicBool::new(false),
        })
    }

    pub fn fail_builds(&self) {
        self.fail_build.store(true, Ordering::SeqCst);
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn build(
        &self,
        _context_dir: &Path,
        _labels: &HashMap<String, String>,
    ) -> Result<String, RuntimeError> {
        self.record("build");
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(RuntimeError::BuildFailed("missing base image".to_string()));
        }
        Ok("build-image-1".to_string())
    }

    async fn create_container(&self, image: &str) -> Result<String, RuntimeError> {
        self.record(format!("create {}", image));
        Ok("ctr-build".to_string())
    }

    async fn inject_archive(
        &self,
        container: &str,
        path: &str,
        _archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.record(format!("inject {} {}", container, path));
        Ok(())
    }

    async fn wait(&self, container: &str) -> Result<ExitStatus, RuntimeError> {
        self.record(format!("wait {}", container));
        Ok(ExitStatus { code: 0 })
    }

    async fn commit(
        &self,
        container: &str,
        repository: &str,
        tag: &str,
    ) -> Result<String, RuntimeError> {
        self.record(format!("commit {} {}:{}", container, repository, tag));
        Ok(format!("{}:{}", repository, tag))
    }

    async fn run(
        &self,
        image: &str,
        _env: &HashMap<String, String>,
    ) -> Result<String, RuntimeError> {
        self.record(format!("run {}", image));
        Ok("ctr-run".to_string())
    }

    async fn extract_archive(&self, container: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        self.record(format!("extract {} {}", container, path));
        Ok(b"results-archive".to_vec())
    }
}

/// An engine over a fresh database with scripted adapters.
pub struct TestHarness {
    pub engine: TrainEngine,
    pub workflow: Arc<MockWorkflowEngine>,
    pub registry: Arc<MockImageRegistry>,
}

/// Builds a harness for station 1 triggering the `run_train` workflow.
pub async fn harness_with_registry(registry: Arc<MockImageRegistry>) -> TestHarness {
    let database = test_database().await;
    let workflow = MockWorkflowEngine::new();
    let engine = TrainEngine::new(
        database,
        workflow.clone(),
        registry.clone(),
        1,
        "run_train",
    );
    TestHarness {
        engine,
        workflow,
        registry,
    }
}

pub async fn harness() -> TestHarness {
    harness_with_registry(MockImageRegistry::empty()).await
}
