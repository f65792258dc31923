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

//! Train Execution Engine
//!
//! The engine owns the canonical lifecycle state of each train and the
//! ordered history of its executions. It is constructed with an explicit
//! bundle of dependencies (database, workflow engine, image registry)
//! and exposes the operations the transport layer calls into.
//!
//! Dispatching a run is the one sequence with irreversible external
//! effect: once the workflow engine acknowledges a trigger, the ledger
//! write must happen. The engine therefore runs trigger + record on a
//! spawned task (caller cancellation cannot lose an acknowledged
//! dispatch) and serializes the whole resolve->trigger->record sequence
//! per train id so concurrent dispatches for one train produce a
//! gap-free execution sequence. A crash between acknowledgement and
//! record can still lose the ledger write; no reconciliation is
//! attempted for that case.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::registry::{ImageRegistry, RegistryError};
use crate::adapters::workflow::WorkflowEngine;
use crate::adapters::HealthStatus;
use crate::dal::DAL;
use crate::database::Database;
use crate::error::EngineError;
use crate::models::train::{NewTrain, Train};
use crate::models::train_config::{ConfigSpec, TrainConfig};
use crate::models::train_execution::TrainExecution;
use crate::models::train_state::{TrainState, TrainStatus};
use crate::resolver::{ConfigResolver, RunRequest};

/// A successfully dispatched execution.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedRun {
    /// Ledger id of the recorded execution
    pub execution_id: i32,
    /// Workflow engine run identifier
    pub dag_run: String,
}

/// Config reference accepted at train registration: an existing config
/// id, or an inline spec created and assigned on the spot.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConfigAssignment {
    Existing(i32),
    Inline(ConfigSpec),
}

/// Health of the engine's remote collaborators.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DependencyHealth {
    pub workflow: HealthStatus,
    pub registry: HealthStatus,
}

/// The train execution engine.
pub struct TrainEngine {
    dal: DAL,
    workflow: Arc<dyn WorkflowEngine>,
    registry: Arc<dyn ImageRegistry>,
    station_id: i64,
    dag_id: String,
    /// Per-train dispatch locks. Entries are created on first dispatch
    /// and live for the engine's lifetime; the train catalog is small
    /// and bounded by what the registry grants the station.
    dispatch_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TrainEngine {
    /// Creates an engine over the given database and adapter handles.
    ///
    /// `dag_id` names the workflow triggered for remote executions
    /// (e.g. `run_train`); `station_id` is this station's identity at
    /// the image registry.
    pub fn new(
        database: Database,
        workflow: Arc<dyn WorkflowEngine>,
        registry: Arc<dyn ImageRegistry>,
        station_id: i64,
        dag_id: impl Into<String>,
    ) -> Self {
        Self {
            dal: DAL::new(database),
            workflow,
            registry,
            station_id,
            dag_id: dag_id.into(),
            dispatch_locks: Mutex::new(HashMap::new()),
        }
    }

    fn dispatch_lock(&self, train_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.dispatch_locks.lock();
        locks
            .entry(train_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn require_train(&self, train_id: &str) -> Result<Train, EngineError> {
        self.dal
            .trains()
            .get_by_train_id(train_id)
            .await?
            .ok_or_else(|| EngineError::TrainNotFound {
                train_id: train_id.to_string(),
            })
    }

    /// Registers a new train, with an optional config assignment.
    pub async fn register_train(
        &self,
        train_id: &str,
        name: Option<String>,
        config: Option<ConfigAssignment>,
    ) -> Result<Train, EngineError> {
        if self.dal.trains().get_by_train_id(train_id).await?.is_some() {
            return Err(EngineError::TrainAlreadyExists {
                train_id: train_id.to_string(),
            });
        }

        let config_id = match config {
            None => None,
            Some(ConfigAssignment::Existing(config_id)) => {
                self.dal
                    .configs()
                    .get(config_id)
                    .await?
                    .ok_or(EngineError::ConfigNotFound { config_id })?;
                Some(config_id)
            }
            Some(ConfigAssignment::Inline(spec)) => Some(self.create_config(spec).await?.id),
        };

        let train = self
            .dal
            .trains()
            .create(NewTrain::new(train_id, name, config_id))
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    EngineError::TrainAlreadyExists {
                        train_id: train_id.to_string(),
                    }
                } else {
                    EngineError::Database(e)
                }
            })?;

        info!(train_id = %train.train_id, "registered train");
        Ok(train)
    }

    /// Retrieves a train by its external identifier.
    pub async fn get_train(&self, train_id: &str) -> Result<Train, EngineError> {
        self.require_train(train_id).await
    }

    /// Lists registered trains.
    pub async fn list_trains(&self, limit: Option<i64>) -> Result<Vec<Train>, EngineError> {
        Ok(self.dal.trains().list(limit).await?)
    }

    /// Creates a stored config.
    pub async fn create_config(&self, spec: ConfigSpec) -> Result<TrainConfig, EngineError> {
        let name = spec.name.clone();
        self.dal.configs().create(spec).await.map_err(|e| {
            if e.is_unique_violation() {
                EngineError::ConfigAlreadyExists { name }
            } else {
                EngineError::Database(e)
            }
        })
    }

    /// Retrieves a stored config by id.
    pub async fn get_config(&self, config_id: i32) -> Result<TrainConfig, EngineError> {
        self.dal
            .configs()
            .get(config_id)
            .await?
            .ok_or(EngineError::ConfigNotFound { config_id })
    }

    /// Lists all stored configs.
    pub async fn list_configs(&self) -> Result<Vec<TrainConfig>, EngineError> {
        Ok(self.dal.configs().list().await?)
    }

    /// Replaces a stored config's fields in place.
    pub async fn update_config(
        &self,
        config_id: i32,
        spec: ConfigSpec,
    ) -> Result<TrainConfig, EngineError> {
        self.dal
            .configs()
            .update(config_id, spec)
            .await?
            .ok_or(EngineError::ConfigNotFound { config_id })
    }

    /// Assigns a stored config as a train's default.
    pub async fn assign_config(
        &self,
        train_id: &str,
        config_id: i32,
    ) -> Result<Train, EngineError> {
        let train = self.require_train(train_id).await?;
        self.dal
            .configs()
            .get(config_id)
            .await?
            .ok_or(EngineError::ConfigNotFound { config_id })?;

        let train = self.dal.trains().assign_config(train.id, config_id).await?;
        info!(train_id = %train.train_id, config_id, "assigned default config");
        Ok(train)
    }

    /// Retrieves the config assigned to a train.
    pub async fn config_for_train(&self, train_id: &str) -> Result<TrainConfig, EngineError> {
        let train = self.require_train(train_id).await?;
        let config_id = train.config_id.ok_or_else(|| EngineError::NoDefaultConfig {
            train_id: train_id.to_string(),
        })?;
        self.get_config(config_id).await
    }

    /// Resolves the request and dispatches an execution of the train.
    ///
    /// On workflow engine acknowledgement, the execution row, the counter
    /// increment and the `active` status are written in one transaction
    /// and the engine's run identifier is returned. On adapter failure
    /// nothing is written: the ledger is left exactly as it was.
    pub async fn run(
        &self,
        train_id: &str,
        request: RunRequest,
    ) -> Result<DispatchedRun, EngineError> {
        let lock = self.dispatch_lock(train_id);
        let _guard = lock.lock().await;

        let train = self.require_train(train_id).await?;
        let resolved = ConfigResolver::new(&self.dal).resolve(&train, &request).await?;

        // The critical section runs on its own task: once the engine has
        // acknowledged the trigger, dropping the caller's future must not
        // lose the ledger write.
        let dal = self.dal.clone();
        let workflow = Arc::clone(&self.workflow);
        let dag_id = self.dag_id.clone();
        let external_id = train.train_id.clone();
        let train_pk = train.id;
        let handle = tokio::spawn(async move {
            let dag_run = workflow
                .trigger(&dag_id, resolved.to_conf_payload())
                .await
                .map_err(|e| {
                    warn!(train_id = %external_id, error = %e, "execution dispatch failed");
                    EngineError::Dispatch(e)
                })?;

            let execution = dal
                .executions()
                .record_dispatch(train_pk, &resolved, &dag_run)
                .await?;

            info!(
                train_id = %external_id,
                execution_id = execution.id,
                dag_run = %dag_run,
                "dispatched train execution"
            );
            Ok(DispatchedRun {
                execution_id: execution.id,
                dag_run,
            })
        });

        handle
            .await
            .map_err(|e| EngineError::Internal(format!("dispatch task failed: {}", e)))?
    }

    /// Retrieves a train's lifecycle state.
    pub async fn get_state(&self, train_id: &str) -> Result<TrainState, EngineError> {
        let train = self.require_train(train_id).await?;
        self.state_for(&train).await
    }

    /// Retrieves a train's execution history in dispatch order.
    pub async fn get_executions(
        &self,
        train_id: &str,
    ) -> Result<Vec<TrainExecution>, EngineError> {
        let train = self.require_train(train_id).await?;
        Ok(self.dal.executions().list_for_train(train.id).await?)
    }

    /// Re-observes the train's most recent execution at the workflow
    /// engine and clears the `active` flag once its state is terminal.
    ///
    /// The counter and the execution rows are never touched here; only
    /// the status flag moves.
    pub async fn refresh_state(&self, train_id: &str) -> Result<TrainState, EngineError> {
        let train = self.require_train(train_id).await?;
        let state = self.state_for(&train).await?;
        if state.train_status() != TrainStatus::Active {
            return Ok(state);
        }

        let latest = self.dal.executions().latest_for_train(train.id).await?;
        let Some(latest) = latest else {
            return Ok(state);
        };

        let run_state = self
            .workflow
            .run_state(&self.dag_id, &latest.dag_run)
            .await
            .map_err(EngineError::Dispatch)?;
        if !run_state.is_terminal() {
            return Ok(state);
        }

        info!(
            train_id = %train.train_id,
            dag_run = %latest.dag_run,
            state = ?run_state,
            "observed terminal run state"
        );
        Ok(self
            .dal
            .states()
            .set_status(train.id, TrainStatus::Inactive)
            .await?)
    }

    /// Reconciles the local train catalog against the repositories the
    /// registry grants a station. Creates rows for untracked
    /// repositories and leaves existing rows untouched; running it twice
    /// with no registry changes is a no-op.
    pub async fn synchronize(&self, station_id: Option<i64>) -> Result<Vec<Train>, EngineError> {
        let station_id = station_id.unwrap_or(self.station_id);
        let repositories = self
            .registry
            .repositories_for_station(station_id)
            .await
            .map_err(|e| match e {
                RegistryError::UnknownStation { station_id } => {
                    EngineError::StationNotFound { station_id }
                }
                other => EngineError::Registry(other),
            })?;

        let mut created = Vec::new();
        for repository in repositories {
            // Repository names carry the station project prefix; the
            // train identity is the path below it.
            let train_id = repository
                .split_once('/')
                .map(|(_, rest)| rest)
                .unwrap_or(repository.as_str());

            if self.dal.trains().get_by_train_id(train_id).await?.is_none() {
                let train = self
                    .dal
                    .trains()
                    .create(NewTrain::new(train_id, None, None))
                    .await?;
                created.push(train);
            }
        }

        info!(
            station_id,
            created = created.len(),
            "synchronized train catalog with registry"
        );
        Ok(created)
    }

    /// Probes the engine's remote collaborators.
    pub async fn dependency_health(&self) -> DependencyHealth {
        let (workflow, registry) =
            tokio::join!(self.workflow.health(), self.registry.health());
        DependencyHealth { workflow, registry }
    }

    async fn state_for(&self, train: &Train) -> Result<TrainState, EngineError> {
        self.dal
            .states()
            .get_for_train(train.id)
            .await?
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "state row missing for train '{}'",
                    train.train_id
                ))
            })
    }
}
