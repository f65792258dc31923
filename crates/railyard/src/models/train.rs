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

//! Train Model
//!
//! A train is a portable analysis task registered at this station. The
//! row carries the externally assigned identity and the optional default
//! config reference; lifecycle state lives in `train_states`.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Represents a registered train in the database.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::trains)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Train {
    /// Surrogate primary key
    pub id: i32,
    /// Externally assigned train identifier, unique and immutable
    pub train_id: String,
    /// Optional human-readable name
    pub name: Option<String>,
    /// The assigned default config, if any
    pub config_id: Option<i32>,
    /// Timestamp when the train was registered
    pub created_at: NaiveDateTime,
    /// Timestamp when the train row was last updated
    pub updated_at: NaiveDateTime,
}

/// Represents a new train to be inserted into the database.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::trains)]
pub struct NewTrain {
    /// Externally assigned train identifier
    pub train_id: String,
    /// Optional human-readable name
    pub name: Option<String>,
    /// The assigned default config, if any
    pub config_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewTrain {
    /// Builds an insertable train with client-side timestamps.
    pub fn new(train_id: impl Into<String>, name: Option<String>, config_id: Option<i32>) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            train_id: train_id.into(),
            name,
            config_id,
            created_at: now,
            updated_at: now,
        }
    }
}
