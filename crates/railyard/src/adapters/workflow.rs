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

//! Workflow engine adapter.
//!
//! The production implementation targets an Airflow-compatible REST API:
//! triggering a workflow POSTs to `dags/{dag_id}/dagRuns` with the
//! resolved configuration as the `conf` payload and returns the engine's
//! run identifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::HealthStatus;

/// Errors raised by the workflow engine adapter.
///
/// `Unreachable` and `Rejected` are kept distinct so callers can report
/// "engine down" separately from "engine refused the trigger".
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow engine unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Workflow engine rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Workflow engine returned a malformed reply: {0}")]
    MalformedReply(String),
}

/// State of a workflow run as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowRunState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl WorkflowRunState {
    /// True for states the run can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowRunState::Succeeded | WorkflowRunState::Failed)
    }
}

/// Contract for triggering and observing remote train executions.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Triggers the named workflow with the given parameter payload and
    /// returns the engine's run identifier.
    async fn trigger(
        &self,
        workflow: &str,
        conf: serde_json::Value,
    ) -> Result<String, WorkflowError>;

    /// Reports the state of a previously triggered run.
    async fn run_state(
        &self,
        workflow: &str,
        run_id: &str,
    ) -> Result<WorkflowRunState, WorkflowError>;

    /// Probes the engine's health endpoint.
    async fn health(&self) -> HealthStatus;
}

/// HTTP client for an Airflow-compatible workflow engine API.
#[derive(Clone)]
pub struct AirflowClient {
    http: reqwest::Client,
    api_url: String,
    user: String,
    password: String,
}

#[derive(Deserialize)]
struct TriggerReply {
    dag_run_id: String,
}

#[derive(Deserialize)]
struct RunStateReply {
    state: String,
}

impl AirflowClient {
    /// Creates a new client against the given API base URL (including
    /// the API version prefix, e.g. `http://airflow:8080/api/v1`).
    pub fn new(api_url: &str, user: &str, password: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path)
    }
}

#[async_trait]
impl WorkflowEngine for AirflowClient {
    async fn trigger(
        &self,
        workflow: &str,
        conf: serde_json::Value,
    ) -> Result<String, WorkflowError> {
        let url = self.endpoint(&format!("dags/{}/dagRuns", workflow));
        debug!(%workflow, "triggering workflow run");

        let response = self
            .http
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&serde_json::json!({ "conf": conf }))
            .send()
            .await
            .map_err(WorkflowError::Unreachable)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            warn!(%workflow, status, "workflow trigger rejected");
            return Err(WorkflowError::Rejected { status, detail });
        }

        let reply: TriggerReply = response
            .json()
            .await
            .map_err(|e| WorkflowError::MalformedReply(e.to_string()))?;
        Ok(reply.dag_run_id)
    }

    async fn run_state(
        &self,
        workflow: &str,
        run_id: &str,
    ) -> Result<WorkflowRunState, WorkflowError> {
        let url = self.endpoint(&format!("dags/{}/dagRuns/{}", workflow, run_id));

        let response = self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(WorkflowError::Unreachable)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Rejected { status, detail });
        }

        let reply: RunStateReply = response
            .json()
            .await
            .map_err(|e| WorkflowError::MalformedReply(e.to_string()))?;
        Ok(match reply.state.as_str() {
            "success" => WorkflowRunState::Succeeded,
            "failed" => WorkflowRunState::Failed,
            "running" => WorkflowRunState::Running,
            _ => WorkflowRunState::Queued,
        })
    }

    async fn health(&self) -> HealthStatus {
        let url = self.endpoint("health");
        match self.http.get(url).send().await {
            Ok(response) if response.status() == StatusCode::OK => HealthStatus::Healthy,
            Ok(_) | Err(_) => HealthStatus::Unavailable,
        }
    }
}
