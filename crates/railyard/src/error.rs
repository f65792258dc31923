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

//! Error types for the train execution engine.
//!
//! The engine exposes a single error enum, [`EngineError`], whose
//! [`EngineError::kind`] classification tells the transport layer which
//! family of status codes a failure maps to. Validation failures are
//! raised before any side effect; dependency failures carry the adapter
//! error that caused them.

use thiserror::Error;

use crate::adapters::registry::RegistryError;
use crate::adapters::workflow::WorkflowError;

/// Transport-facing classification of an [`EngineError`].
///
/// The HTTP layer (out of scope for this crate) maps these onto status
/// codes: `NotFound` -> 404, `InvalidRequest` -> 400, `AlreadyExists` ->
/// 400/409, `DependencyFailure` -> 502/503, `Internal` -> 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A train, config or station referenced by the request is unknown.
    NotFound,
    /// The request is incomplete or inconsistent with stored state.
    InvalidRequest,
    /// A create collided with an existing train or config.
    AlreadyExists,
    /// An external collaborator was unreachable or rejected the call.
    DependencyFailure,
    /// An unexpected internal failure (database, task join).
    Internal,
}

/// Errors raised by database operations in the DAL.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to get a connection from the pool: {0}")]
    ConnectionPool(String),

    #[error("Database query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Failed to encode column value: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Database migration failed: {0}")]
    Migration(String),
}

impl DatabaseError {
    /// True when the underlying query hit a UNIQUE constraint. The engine
    /// uses this to turn DAL failures into `AlreadyExists` errors.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::Query(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }
}

/// Errors returned by every [`TrainEngine`](crate::engine::TrainEngine)
/// operation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Train '{train_id}' not found")]
    TrainNotFound { train_id: String },

    #[error("Config with id '{config_id}' not found")]
    ConfigNotFound { config_id: i32 },

    #[error("Station '{station_id}' is not known to the image registry")]
    StationNotFound { station_id: i64 },

    #[error("Train '{train_id}' has no default config assigned")]
    NoDefaultConfig { train_id: String },

    #[error("Resolved configuration is missing '{field}'")]
    IncompleteConfig { field: &'static str },

    #[error("Malformed run request: {0}")]
    MalformedRequest(String),

    #[error("Train with id '{train_id}' already exists")]
    TrainAlreadyExists { train_id: String },

    #[error("A config named '{name}' already exists")]
    ConfigAlreadyExists { name: String },

    #[error("Execution dispatch failed: {0}")]
    Dispatch(#[source] WorkflowError),

    #[error("Image registry request failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal engine failure: {0}")]
    Internal(String),
}

impl EngineError {
    /// Classifies this error for the transport layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TrainNotFound { .. }
            | EngineError::ConfigNotFound { .. }
            | EngineError::StationNotFound { .. } => ErrorKind::NotFound,
            EngineError::NoDefaultConfig { .. }
            | EngineError::IncompleteConfig { .. }
            | EngineError::MalformedRequest(_) => ErrorKind::InvalidRequest,
            EngineError::TrainAlreadyExists { .. } | EngineError::ConfigAlreadyExists { .. } => {
                ErrorKind::AlreadyExists
            }
            EngineError::Dispatch(_) | EngineError::Registry(_) => ErrorKind::DependencyFailure,
            EngineError::Database(_) | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }
}
