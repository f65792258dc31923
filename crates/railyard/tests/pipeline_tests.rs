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

//! Integration tests for the local build-run-collect pipeline.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{MemoryArtifactStore, ScriptedRuntime};
use railyard::pipeline::{PipelineStep, RESULTS_OBJECT};
use railyard::{LocalTrainPipeline, PipelineError, RunSpec};

fn spec() -> RunSpec {
    RunSpec {
        bucket: "b".to_string(),
        dockerfile: "Dockerfile".to_string(),
        requirements: "requirements.txt".to_string(),
        dockerignore: ".dockerignore".to_string(),
        endpoint: "analysis.py".to_string(),
        params: HashMap::from([(
            "FHIR_SERVER".to_string(),
            "https://fhir.example.org".to_string(),
        )]),
    }
}

fn seeded_store() -> Arc<MemoryArtifactStore> {
    let store = MemoryArtifactStore::new();
    store.insert("b", "Dockerfile", b"FROM python:3.11");
    store.insert("b", "requirements.txt", b"requests==2.31");
    store.insert("b", ".dockerignore", b"*.tar");
    store.insert("b", "analysis.py", b"print('analyzing')");
    store
}

#[tokio::test]
async fn full_protocol_runs_in_order_and_uploads_results() {
    let store = seeded_store();
    let runtime = ScriptedRuntime::new();
    let pipeline = LocalTrainPipeline::new(store.clone(), runtime.clone());

    let outcome = pipeline.execute(&spec()).await.unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.image, "local_train_analysis.py:latest");
    assert_eq!(outcome.results_object, "b/results.tar");

    assert_eq!(
        runtime.call_log(),
        vec![
            "build",
            "create build-image-1",
            "inject ctr-build /",
            "wait ctr-build",
            "commit ctr-build local_train_analysis.py:latest",
            "run local_train_analysis.py:latest",
            "wait ctr-run",
            "extract ctr-run opt/pht_results",
        ]
    );

    // The results archive landed back in the originating bucket.
    let uploaded = store.get_object("b", RESULTS_OBJECT).unwrap();
    assert_eq!(uploaded, b"results-archive");
}

#[tokio::test]
async fn build_failure_stops_before_any_container_work() {
    let store = seeded_store();
    let runtime = ScriptedRuntime::new();
    runtime.fail_builds();
    let pipeline = LocalTrainPipeline::new(store.clone(), runtime.clone());

    let err = pipeline.execute(&spec()).await.unwrap_err();
    assert_eq!(err.step(), PipelineStep::BuildImage);
    assert!(matches!(err, PipelineError::Runtime { .. }));

    assert_eq!(runtime.call_log(), vec!["build"]);
    assert!(store.get_object("b", RESULTS_OBJECT).is_none());
}

#[tokio::test]
async fn missing_context_object_fails_the_fetch_step() {
    let store = MemoryArtifactStore::new();
    store.insert("b", "Dockerfile", b"FROM python:3.11");
    // requirements.txt is missing
    let runtime = ScriptedRuntime::new();
    let pipeline = LocalTrainPipeline::new(store, runtime.clone());

    let err = pipeline.execute(&spec()).await.unwrap_err();
    assert_eq!(err.step(), PipelineStep::FetchContext);
    assert!(matches!(err, PipelineError::Storage { .. }));
    assert!(runtime.call_log().is_empty());
}

#[tokio::test]
async fn missing_endpoint_aborts_before_commit() {
    let store = MemoryArtifactStore::new();
    store.insert("b", "Dockerfile", b"FROM python:3.11");
    store.insert("b", "requirements.txt", b"requests==2.31");
    store.insert("b", ".dockerignore", b"*.tar");
    // analysis.py is missing
    let runtime = ScriptedRuntime::new();
    let pipeline = LocalTrainPipeline::new(store, runtime.clone());

    let err = pipeline.execute(&spec()).await.unwrap_err();
    assert_eq!(err.step(), PipelineStep::InjectEndpoint);

    let calls = runtime.call_log();
    assert_eq!(calls, vec!["build", "create build-image-1"]);
}
