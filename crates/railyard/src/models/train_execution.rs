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

//! Train Execution Model
//!
//! One row per dispatched execution: the resolved configuration snapshot
//! actually used, plus the workflow engine's run identifier. Rows are
//! append-only and form the audit trail; ids are assigned in creation
//! order.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::train_config::{EnvVar, VolumeMount};

/// Represents a recorded train execution.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::train_executions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrainExecution {
    /// Auto-incrementing id, ordered by creation
    pub id: i32,
    /// Owning train (surrogate key into `trains`)
    pub train_id: i32,
    /// Snapshot: registry repository the execution ran from
    pub repository: String,
    /// Snapshot: image tag
    pub tag: String,
    /// Snapshot: JSON-encoded env list
    pub env: Option<String>,
    /// Snapshot: JSON-encoded volume list
    pub volumes: Option<String>,
    /// Workflow engine run identifier returned by the trigger
    pub dag_run: String,
    pub created_at: NaiveDateTime,
}

impl TrainExecution {
    /// Decodes the snapshot env column.
    pub fn env_vars(&self) -> Result<Vec<EnvVar>, serde_json::Error> {
        self.env
            .as_deref()
            .map(serde_json::from_str)
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Decodes the snapshot volumes column.
    pub fn volume_mounts(&self) -> Result<Vec<VolumeMount>, serde_json::Error> {
        self.volumes
            .as_deref()
            .map(serde_json::from_str)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Represents a new execution record to be appended to the ledger.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::train_executions)]
pub struct NewTrainExecution {
    pub train_id: i32,
    pub repository: String,
    pub tag: String,
    pub env: Option<String>,
    pub volumes: Option<String>,
    pub dag_run: String,
    pub created_at: NaiveDateTime,
}
