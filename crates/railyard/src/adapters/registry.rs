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

//! Image registry adapter.
//!
//! The production implementation targets a Harbor-compatible registry
//! API. Each station owns a `station_<id>` project; the repositories in
//! that project are the trains visible to the station.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::HealthStatus;

const PAGE_SIZE: usize = 100;

/// Errors raised by the image registry adapter.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Image registry unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Station '{station_id}' has no project in the registry")]
    UnknownStation { station_id: i64 },

    #[error("Image registry rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Image registry returned a malformed reply: {0}")]
    MalformedReply(String),
}

/// Contract for querying the image repositories available to a station.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Lists the repository names in the station's registry project.
    ///
    /// Names are returned as the registry reports them, project prefix
    /// included (e.g. `station_1/breast-cancer-study`).
    async fn repositories_for_station(&self, station_id: i64)
        -> Result<Vec<String>, RegistryError>;

    /// Probes the registry's health endpoint.
    async fn health(&self) -> HealthStatus;
}

/// HTTP client for a Harbor-compatible registry API.
#[derive(Clone)]
pub struct HarborClient {
    http: reqwest::Client,
    api_url: String,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct RepositoryEntry {
    name: String,
}

impl HarborClient {
    /// Creates a new client against the given registry base URL. The
    /// `api/v2.0` prefix is appended here, matching how the registry
    /// publishes its REST API.
    pub fn new(base_url: &str, user: &str, password: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_url: format!("{}/api/v2.0", base_url.trim_end_matches('/')),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }
}

#[async_trait]
impl ImageRegistry for HarborClient {
    async fn repositories_for_station(
        &self,
        station_id: i64,
    ) -> Result<Vec<String>, RegistryError> {
        let url = self.endpoint(&format!("projects/station_{}/repositories", station_id));
        let mut names = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self
                .http
                .get(&url)
                .basic_auth(&self.user, Some(&self.password))
                .query(&[("page", page.to_string()), ("page_size", PAGE_SIZE.to_string())])
                .send()
                .await
                .map_err(RegistryError::Unreachable)?;

            match response.status() {
                StatusCode::NOT_FOUND => {
                    return Err(RegistryError::UnknownStation { station_id });
                }
                status if !status.is_success() => {
                    let detail = response.text().await.unwrap_or_default();
                    return Err(RegistryError::Rejected {
                        status: status.as_u16(),
                        detail,
                    });
                }
                _ => {}
            }

            let entries: Vec<RepositoryEntry> = response
                .json()
                .await
                .map_err(|e| RegistryError::MalformedReply(e.to_string()))?;
            let page_len = entries.len();
            names.extend(entries.into_iter().map(|entry| entry.name));

            if page_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!(station_id, count = names.len(), "listed station repositories");
        Ok(names)
    }

    async fn health(&self) -> HealthStatus {
        let url = self.endpoint("health");
        match self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => HealthStatus::Healthy,
            Ok(_) | Err(_) => HealthStatus::Unavailable,
        }
    }
}
