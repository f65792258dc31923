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

//! Railyard is the train execution engine of a federated-analytics
//! station: it manages portable containerized analysis tasks ("trains")
//! distributed to data-holding sites.
//!
//! The crate covers three concerns:
//!
//! - **Configuration resolution**: a run request in one of several wire
//!   shapes becomes exactly one validated execution configuration
//!   ([`resolver`]).
//! - **The execution ledger and state machine**: each train's lifecycle
//!   state and its append-only execution history, with dispatch recorded
//!   atomically alongside the workflow engine's acknowledgement
//!   ([`engine`], [`dal`]).
//! - **The local build-run-collect pipeline**: building a train image
//!   from stored artifacts, running it against the station's local
//!   environment and returning results to the artifact store
//!   ([`pipeline`]).
//!
//! External collaborators (workflow engine, image registry, artifact
//! store, container runtime) are reached through the trait seams in
//! [`adapters`] and injected at construction time. HTTP transport, auth
//! and installer tooling live outside this crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use railyard::adapters::{AirflowClient, HarborClient};
//! use railyard::{Database, RunRequest, TrainEngine};
//!
//! # async fn example() -> Result<(), railyard::EngineError> {
//! let database = Database::new("station.db", 1);
//! database.run_migrations().await?;
//!
//! let engine = TrainEngine::new(
//!     database,
//!     Arc::new(AirflowClient::new("http://airflow:8080/api/v1", "admin", "admin")),
//!     Arc::new(HarborClient::new("https://harbor.example.org", "robot", "secret")),
//!     1,
//!     "run_train",
//! );
//!
//! let dispatched = engine.run("breast-cancer-study", RunRequest::UseDefault).await?;
//! println!("dispatched as {}", dispatched.dag_run);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod dal;
pub mod database;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod resolver;

pub use adapters::{ArtifactStore, ContainerRuntime, ImageRegistry, WorkflowEngine};
pub use config::{ConfigError, StationConfig};
pub use dal::DAL;
pub use database::Database;
pub use engine::{ConfigAssignment, DispatchedRun, TrainEngine};
pub use error::{DatabaseError, EngineError, ErrorKind};
pub use models::{ConfigSpec, Train, TrainConfig, TrainExecution, TrainState, TrainStatus};
pub use pipeline::{LocalTrainPipeline, PipelineError, PipelineOutcome, RunSpec};
pub use resolver::{ResolvedConfig, RunConfig, RunRequest};

/// Initializes tracing with an env-filter subscriber.
///
/// `filter` overrides the `RUST_LOG` environment variable when given.
/// Safe to call more than once; later calls are no-ops when a subscriber
/// is already installed.
pub fn init_logging(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let env_filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
