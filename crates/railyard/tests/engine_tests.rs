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

//! Integration tests for the execution ledger and state machine.

mod common;

use std::collections::HashMap;

use common::{harness, harness_with_registry, MockImageRegistry};
use railyard::adapters::workflow::WorkflowRunState;
use railyard::{ConfigAssignment, ConfigSpec, EngineError, ErrorKind, RunConfig, RunRequest};

fn complete_config(name: &str) -> ConfigSpec {
    ConfigSpec {
        name: name.to_string(),
        repository: Some("example/repo".to_string()),
        tag: Some("latest".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn registering_a_train_creates_inactive_state() {
    let h = harness().await;

    let train = h.engine.register_train("t1", None, None).await.unwrap();
    assert_eq!(train.train_id, "t1");

    let state = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state.num_executions, 0);
    assert_eq!(state.status, "inactive");
}

#[tokio::test]
async fn duplicate_registration_fails() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let err = h.engine.register_train("t1", None, None).await.unwrap_err();
    assert!(matches!(err, EngineError::TrainAlreadyExists { .. }));
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn registering_with_unknown_config_fails() {
    let h = harness().await;

    let err = h
        .engine
        .register_train("t1", None, Some(ConfigAssignment::Existing(99)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConfigNotFound { config_id: 99 }));
}

#[tokio::test]
async fn run_on_unknown_train_is_not_found() {
    let h = harness().await;

    let err = h.engine.run("ghost", RunRequest::UseDefault).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.workflow.trigger_count(), 0);
}

#[tokio::test]
async fn unknown_config_id_fails_not_found_even_with_default_assigned() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();

    let err = h.engine.run("t1", RunRequest::ById(999)).await.unwrap_err();
    assert!(matches!(err, EngineError::ConfigNotFound { config_id: 999 }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.workflow.trigger_count(), 0);
}

#[tokio::test]
async fn default_without_assigned_config_is_rejected() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let err = h.engine.run("t1", RunRequest::UseDefault).await.unwrap_err();
    assert!(matches!(err, EngineError::NoDefaultConfig { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(h.workflow.trigger_count(), 0);
}

#[tokio::test]
async fn incomplete_config_is_rejected_before_dispatch() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h
        .engine
        .create_config(ConfigSpec {
            name: "no-image".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let err = h
        .engine
        .run("t1", RunRequest::ById(config.id))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::IncompleteConfig {
            field: "repository"
        }
    ));
    assert_eq!(h.workflow.trigger_count(), 0);

    let state = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state.num_executions, 0);
}

#[tokio::test]
async fn successful_run_records_execution_and_activates_train() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();

    let dispatched = h
        .engine
        .run("t1", RunRequest::ById(config.id))
        .await
        .unwrap();
    assert!(!dispatched.dag_run.is_empty());

    let state = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state.num_executions, 1);
    assert_eq!(state.status, "active");

    let executions = h.engine.get_executions("t1").await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].repository, "example/repo");
    assert_eq!(executions[0].tag, "latest");
    assert_eq!(executions[0].dag_run, dispatched.dag_run);

    // The workflow engine received the resolved snapshot as payload.
    let triggers = h.workflow.triggers.lock().unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].0, "run_train");
    assert_eq!(triggers[0].1["repository"], "example/repo");
}

#[tokio::test]
async fn counter_matches_ledger_after_repeated_runs() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();

    for _ in 0..5 {
        h.engine.run("t1", RunRequest::UseDefault).await.unwrap();
    }

    let state = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state.num_executions, 5);

    let executions = h.engine.get_executions("t1").await.unwrap();
    assert_eq!(executions.len(), 5);
    for pair in executions.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }
}

#[tokio::test]
async fn inline_config_runs_without_stored_rows() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let request = RunRequest::Inline(RunConfig {
        repository: Some("adhoc/repo".to_string()),
        tag: Some("v2".to_string()),
        ..Default::default()
    });

    h.engine.run("t1", request).await.unwrap();

    let executions = h.engine.get_executions("t1").await.unwrap();
    assert_eq!(executions[0].repository, "adhoc/repo");
    assert_eq!(executions[0].tag, "v2");
}

#[tokio::test]
async fn failed_dispatch_leaves_ledger_untouched() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();
    h.engine.run("t1", RunRequest::UseDefault).await.unwrap();

    let state_before = h.engine.get_state("t1").await.unwrap();
    let executions_before = h.engine.get_executions("t1").await.unwrap();

    h.workflow.fail_triggers();
    let err = h.engine.run("t1", RunRequest::UseDefault).await.unwrap_err();
    assert!(matches!(err, EngineError::Dispatch(_)));
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);

    let state_after = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state_before.num_executions, state_after.num_executions);
    assert_eq!(state_before.status, state_after.status);

    let executions_after = h.engine.get_executions("t1").await.unwrap();
    assert_eq!(executions_before.len(), executions_after.len());
    for (before, after) in executions_before.iter().zip(&executions_after) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.dag_run, after.dag_run);
    }
}

#[tokio::test]
async fn concurrent_runs_for_one_train_are_gap_free() {
    let h = std::sync::Arc::new(harness().await);

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.engine.run("t1", RunRequest::UseDefault).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let state = h.engine.get_state("t1").await.unwrap();
    assert_eq!(state.num_executions, 8);
    let executions = h.engine.get_executions("t1").await.unwrap();
    assert_eq!(executions.len(), 8);
    for pair in executions.windows(2) {
        assert_eq!(pair[0].id + 1, pair[1].id);
    }
}

#[tokio::test]
async fn refresh_state_clears_active_on_terminal_run() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();
    h.engine.run("t1", RunRequest::UseDefault).await.unwrap();

    // Still running: the flag stays up.
    h.workflow.set_run_state(WorkflowRunState::Running);
    let state = h.engine.refresh_state("t1").await.unwrap();
    assert_eq!(state.status, "active");

    // Terminal: the flag clears, counter and ledger stay put.
    h.workflow.set_run_state(WorkflowRunState::Succeeded);
    let state = h.engine.refresh_state("t1").await.unwrap();
    assert_eq!(state.status, "inactive");
    assert_eq!(state.num_executions, 1);
    assert_eq!(h.engine.get_executions("t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn synchronize_is_idempotent() {
    let registry = MockImageRegistry::new(HashMap::from([(
        1,
        vec![
            "station_1/breast-cancer-study".to_string(),
            "station_1/covid-survey".to_string(),
        ],
    )]));
    let h = harness_with_registry(registry).await;

    let created = h.engine.synchronize(None).await.unwrap();
    assert_eq!(created.len(), 2);
    let trains = h.engine.list_trains(None).await.unwrap();
    assert_eq!(trains.len(), 2);
    assert!(trains.iter().any(|t| t.train_id == "breast-cancer-study"));

    let created_again = h.engine.synchronize(None).await.unwrap();
    assert!(created_again.is_empty());
    assert_eq!(h.engine.list_trains(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn synchronize_with_unknown_station_is_not_found() {
    let h = harness().await;

    let err = h.engine.synchronize(Some(123)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::StationNotFound { station_id: 123 }
    ));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn config_catalog_operations() {
    let h = harness().await;

    let config = h.engine.create_config(complete_config("c1")).await.unwrap();

    // Duplicate name collides.
    let err = h
        .engine
        .create_config(complete_config("c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConfigAlreadyExists { .. }));

    // Update replaces fields in place.
    let updated = h
        .engine
        .update_config(
            config.id,
            ConfigSpec {
                name: "c1-renamed".to_string(),
                repository: Some("example/repo".to_string()),
                tag: Some("v2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "c1-renamed");
    assert_eq!(updated.tag.as_deref(), Some("v2"));

    let err = h
        .engine
        .update_config(999, complete_config("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ConfigNotFound { config_id: 999 }));
}

#[tokio::test]
async fn config_for_train_requires_an_assignment() {
    let h = harness().await;

    h.engine.register_train("t1", None, None).await.unwrap();
    let err = h.engine.config_for_train("t1").await.unwrap_err();
    assert!(matches!(err, EngineError::NoDefaultConfig { .. }));

    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    h.engine.assign_config("t1", config.id).await.unwrap();
    let assigned = h.engine.config_for_train("t1").await.unwrap();
    assert_eq!(assigned.id, config.id);
}

#[tokio::test]
async fn assign_config_validates_both_sides() {
    let h = harness().await;

    let config = h.engine.create_config(complete_config("c1")).await.unwrap();
    let err = h.engine.assign_config("ghost", config.id).await.unwrap_err();
    assert!(matches!(err, EngineError::TrainNotFound { .. }));

    h.engine.register_train("t1", None, None).await.unwrap();
    let err = h.engine.assign_config("t1", 321).await.unwrap_err();
    assert!(matches!(err, EngineError::ConfigNotFound { config_id: 321 }));
}

#[tokio::test]
async fn register_with_inline_config_assigns_it() {
    let h = harness().await;

    let train = h
        .engine
        .register_train(
            "t1",
            Some("train with new config".to_string()),
            Some(ConfigAssignment::Inline(complete_config("inline-c"))),
        )
        .await
        .unwrap();
    assert!(train.config_id.is_some());

    let config = h.engine.config_for_train("t1").await.unwrap();
    assert_eq!(config.name, "inline-c");
}
