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

//! Train Config Model
//!
//! A config names the image (registry repository + tag) a train runs
//! from, plus the environment variables and volume mounts the execution
//! receives. Env and volume lists are stored as JSON text columns.
//! Repository and tag are nullable at the store level; completeness is
//! enforced by the resolver at dispatch time, not at creation.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A single environment variable passed to a train execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// A volume mount made available to a train execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    /// Mount mode, e.g. `ro` or `rw`
    pub mode: String,
}

/// Represents a stored train configuration.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::train_configs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrainConfig {
    /// Unique identifier for the config
    pub id: i32,
    /// Unique human-readable name
    pub name: String,
    /// Registry repository the train image lives in
    pub repository: Option<String>,
    /// Image tag
    pub tag: Option<String>,
    /// JSON-encoded list of [`EnvVar`]
    pub env: Option<String>,
    /// JSON-encoded list of [`VolumeMount`]
    pub volumes: Option<String>,
    /// Whether newly synchronized trains using this config should be
    /// executed without operator interaction
    pub auto_execute: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TrainConfig {
    /// Decodes the JSON env column. An absent column is an empty list.
    pub fn env_vars(&self) -> Result<Vec<EnvVar>, serde_json::Error> {
        self.env
            .as_deref()
            .map(serde_json::from_str)
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Decodes the JSON volumes column. An absent column is an empty list.
    pub fn volume_mounts(&self) -> Result<Vec<VolumeMount>, serde_json::Error> {
        self.volumes
            .as_deref()
            .map(serde_json::from_str)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Represents a new config to be inserted into the database.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::train_configs)]
pub struct NewTrainConfig {
    pub name: String,
    pub repository: Option<String>,
    pub tag: Option<String>,
    pub env: Option<String>,
    pub volumes: Option<String>,
    pub auto_execute: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Caller-facing specification for creating or updating a config.
///
/// This is the decoded form of the transport layer's config payload; the
/// DAL serializes the env/volume lists into the JSON columns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSpec {
    pub name: String,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub auto_execute: bool,
}

impl ConfigSpec {
    /// Converts the spec into an insertable row, serializing the env and
    /// volume lists.
    pub fn into_new_config(self) -> Result<NewTrainConfig, serde_json::Error> {
        let now = chrono::Utc::now().naive_utc();
        Ok(NewTrainConfig {
            name: self.name,
            repository: self.repository,
            tag: self.tag,
            env: encode_list(&self.env)?,
            volumes: encode_list(&self.volumes)?,
            auto_execute: self.auto_execute,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Serializes a list column, mapping an empty list to NULL.
pub(crate) fn encode_list<T: Serialize>(list: &[T]) -> Result<Option<String>, serde_json::Error> {
    if list.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(list)?))
    }
}
