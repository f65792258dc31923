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

//! Configuration resolver.
//!
//! A run request arrives in one of three shapes: a stored config id, an
//! inline one-off configuration, or a reference to the train's assigned
//! default. The wire format is decoded once, at the boundary, into the
//! [`RunRequest`] union; everything past that point works with the typed
//! variants. Resolution is a pure read: it never mutates the train or
//! config rows, so it is safe under concurrent requests.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::dal::DAL;
use crate::error::EngineError;
use crate::models::train::Train;
use crate::models::train_config::{EnvVar, TrainConfig, VolumeMount};

/// An inline, ad-hoc run configuration. Same shape as a stored config's
/// execution fields, but never persisted as a first-class config row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
}

/// A decoded run request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RunRequest {
    /// Run with the stored config of the given id.
    ById(i32),
    /// Run with an inline one-off configuration.
    Inline(RunConfig),
    /// Run with the train's assigned default config. An absent or empty
    /// request body decodes to this variant.
    #[default]
    UseDefault,
}

/// Wire shape of a run request body. `config_id` takes precedence over
/// `config_json`; the literal string `"default"` in `config_id` selects
/// the train's default config, as does an empty body.
#[derive(Deserialize)]
struct RawRunRequest {
    #[serde(default)]
    config_id: Option<ConfigSelector>,
    #[serde(default)]
    config_json: Option<RunConfig>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigSelector {
    Id(i32),
    Sentinel(String),
}

impl<'de> Deserialize<'de> for RunRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawRunRequest::deserialize(deserializer)?;
        match (raw.config_id, raw.config_json) {
            (Some(ConfigSelector::Id(id)), _) => Ok(RunRequest::ById(id)),
            (Some(ConfigSelector::Sentinel(s)), _) if s == "default" => Ok(RunRequest::UseDefault),
            (Some(ConfigSelector::Sentinel(s)), _) => Err(D::Error::custom(format!(
                "unknown config selector '{}', expected an id or \"default\"",
                s
            ))),
            (None, Some(config)) => Ok(RunRequest::Inline(config)),
            (None, None) => Ok(RunRequest::UseDefault),
        }
    }
}

impl RunRequest {
    /// Decodes an optional JSON request body. A missing body selects the
    /// default config.
    pub fn decode(body: Option<&serde_json::Value>) -> Result<Self, EngineError> {
        match body {
            None => Ok(RunRequest::UseDefault),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| EngineError::MalformedRequest(e.to_string())),
        }
    }
}

/// A fully resolved, validated execution configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub repository: String,
    pub tag: String,
    pub env: Vec<EnvVar>,
    pub volumes: Vec<VolumeMount>,
}

impl ResolvedConfig {
    /// Renders the configuration as the parameter payload handed to the
    /// workflow engine.
    pub fn to_conf_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "repository": self.repository,
            "tag": self.tag,
            "env": self.env,
            "volumes": self.volumes,
        })
    }

    /// Validates execution-critical fields, guarding against configs
    /// created without them.
    fn from_parts(
        repository: Option<String>,
        tag: Option<String>,
        env: Vec<EnvVar>,
        volumes: Vec<VolumeMount>,
    ) -> Result<Self, EngineError> {
        let repository = repository
            .filter(|r| !r.is_empty())
            .ok_or(EngineError::IncompleteConfig {
                field: "repository",
            })?;
        let tag = tag
            .filter(|t| !t.is_empty())
            .ok_or(EngineError::IncompleteConfig { field: "tag" })?;
        Ok(Self {
            repository,
            tag,
            env,
            volumes,
        })
    }

    fn from_stored(config: &TrainConfig) -> Result<Self, EngineError> {
        let env = config
            .env_vars()
            .map_err(crate::error::DatabaseError::Encoding)?;
        let volumes = config
            .volume_mounts()
            .map_err(crate::error::DatabaseError::Encoding)?;
        Self::from_parts(config.repository.clone(), config.tag.clone(), env, volumes)
    }
}

/// Resolves run requests against the stored catalog.
pub struct ConfigResolver<'a> {
    dal: &'a DAL,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Produces exactly one validated configuration for the train, or
    /// fails without side effects.
    pub async fn resolve(
        &self,
        train: &Train,
        request: &RunRequest,
    ) -> Result<ResolvedConfig, EngineError> {
        let resolved = match request {
            RunRequest::ById(config_id) => {
                let config = self.dal.configs().get(*config_id).await?.ok_or(
                    EngineError::ConfigNotFound {
                        config_id: *config_id,
                    },
                )?;
                ResolvedConfig::from_stored(&config)?
            }
            RunRequest::Inline(config) => ResolvedConfig::from_parts(
                config.repository.clone(),
                config.tag.clone(),
                config.env.clone(),
                config.volumes.clone(),
            )?,
            RunRequest::UseDefault => {
                let config_id =
                    train
                        .config_id
                        .ok_or_else(|| EngineError::NoDefaultConfig {
                            train_id: train.train_id.clone(),
                        })?;
                let config = self.dal.configs().get(config_id).await?.ok_or(
                    EngineError::ConfigNotFound { config_id },
                )?;
                ResolvedConfig::from_stored(&config)?
            }
        };

        debug!(
            train_id = %train.train_id,
            repository = %resolved.repository,
            tag = %resolved.tag,
            "resolved run configuration"
        );
        Ok(resolved)
    }
}
