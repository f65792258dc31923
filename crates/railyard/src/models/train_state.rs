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

//! Train State Model
//!
//! Exactly one state row exists per train. The row is created with the
//! train and mutated only inside ledger transactions, never
//! independently.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a train.
///
/// A train is `Active` while an execution has been dispatched and its
/// terminal state has not yet been observed; otherwise it is `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainStatus {
    Inactive,
    Active,
}

impl TrainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainStatus::Inactive => "inactive",
            TrainStatus::Active => "active",
        }
    }
}

impl std::str::FromStr for TrainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(TrainStatus::Inactive),
            "active" => Ok(TrainStatus::Active),
            other => Err(format!("unknown train status '{}'", other)),
        }
    }
}

impl std::fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a train's lifecycle state in the database.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::train_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrainState {
    pub id: i32,
    /// Owning train (surrogate key into `trains`)
    pub train_id: i32,
    /// Current status, `inactive` or `active`
    pub status: String,
    /// Number of executions dispatched for this train; monotonically
    /// non-decreasing, equal to the count of ledger rows
    pub num_executions: i32,
    pub updated_at: NaiveDateTime,
}

impl TrainState {
    /// Parses the stored status column.
    pub fn train_status(&self) -> TrainStatus {
        self.status.parse().unwrap_or(TrainStatus::Inactive)
    }
}

/// Represents a new state row, inserted together with its train.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::train_states)]
pub struct NewTrainState {
    pub train_id: i32,
    pub status: String,
    pub num_executions: i32,
    pub updated_at: NaiveDateTime,
}

impl NewTrainState {
    /// Builds the initial state for a freshly registered train.
    pub fn initial(train_id: i32) -> Self {
        Self {
            train_id,
            status: TrainStatus::Inactive.as_str().to_string(),
            num_executions: 0,
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }
}
