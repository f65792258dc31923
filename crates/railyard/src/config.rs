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

//! Station configuration.
//!
//! Loaded from a TOML file, with environment variables overriding the
//! credentials and endpoints the station installer traditionally
//! provides through the environment (`STATION_ID`, `AIRFLOW_API_URL`,
//! `HARBOR_URL`, `HARBOR_USER`, `HARBOR_PW`). Validation happens once at
//! load; adapter constructors can assume well-formed values.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field} URL: {url}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("Invalid station id: {id} (must be positive)")]
    InvalidStationId { id: i64 },

    #[error("Invalid pool size: {size} (must be between 1 and 100)")]
    InvalidPoolSize { size: u32 },

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Top-level station configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub station: StationSection,
    pub database: DatabaseSection,
    pub airflow: AirflowSection,
    pub registry: RegistrySection,
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub docker: DockerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationSection {
    /// This station's identity at the central registry
    pub station_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    /// SQLite path or `sqlite://` URL
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirflowSection {
    /// Base API URL including the version prefix
    pub api_url: String,
    pub user: String,
    pub password: String,
    /// The workflow triggered for remote train executions
    #[serde(default = "default_dag_id")]
    pub dag_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySection {
    pub api_url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsSection {
    /// Root directory of the filesystem artifact store
    pub root: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DockerSection {
    /// Daemon socket path; platform default when absent
    pub socket: Option<String>,
}

fn default_pool_size() -> u32 {
    1
}

fn default_dag_id() -> String {
    "run_train".to_string()
}

impl StationConfig {
    /// Loads and validates the configuration from a TOML file.
    ///
    /// `.env` files are honored before environment overrides are read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        dotenvy::dotenv().ok();

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: StationConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Applies the installer-provided environment overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(id) = env_var("STATION_ID").and_then(|v| v.parse().ok()) {
            self.station.station_id = id;
        }
        if let Some(url) = env_var("AIRFLOW_API_URL") {
            self.airflow.api_url = url;
        }
        if let Some(url) = env_var("HARBOR_URL") {
            self.registry.api_url = url;
        }
        if let Some(user) = env_var("HARBOR_USER") {
            self.registry.user = user;
        }
        if let Some(password) = env_var("HARBOR_PW") {
            self.registry.password = password;
        }
    }

    /// Validates endpoints and bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.station.station_id < 1 {
            return Err(ConfigError::InvalidStationId {
                id: self.station.station_id,
            });
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            });
        }
        if self.database.pool_size < 1 || self.database.pool_size > 100 {
            return Err(ConfigError::InvalidPoolSize {
                size: self.database.pool_size,
            });
        }
        if Url::parse(&self.airflow.api_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                field: "airflow.api_url",
                url: self.airflow.api_url.clone(),
            });
        }
        if Url::parse(&self.registry.api_url).is_err() {
            return Err(ConfigError::InvalidUrl {
                field: "registry.api_url",
                url: self.registry.api_url.clone(),
            });
        }
        if self.airflow.dag_id.is_empty() {
            return Err(ConfigError::MissingField {
                field: "airflow.dag_id",
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
