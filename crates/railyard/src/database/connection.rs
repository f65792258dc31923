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

//! SQLite connection pool for the station ledger.
//!
//! This module provides an async connection pool implementation using
//! `deadpool-diesel`. The station database is local to the host and has a
//! single writer (the engine), so the pool is sized at one connection:
//! SQLite has limited concurrent write support even with WAL mode, and a
//! single connection avoids "database is locked" errors while making
//! ledger transactions serial at the database as well.
//!
//! Accepted connection strings:
//!
//! - `sqlite://` prefixed paths
//! - plain file paths (relative or absolute)
//! - `:memory:` or `file:...?mode=memory&cache=shared` URIs (tests)

use deadpool_diesel::sqlite::{Manager, Pool, Runtime};
use tracing::info;

use crate::error::DatabaseError;

/// A pool of connections to the station's SQLite database.
///
/// The struct is `Clone`; each clone references the same underlying pool,
/// so it can be shared freely between the engine, the DAL and tests.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database(sqlite)")
    }
}

impl Database {
    /// Creates a new connection pool for the given connection string.
    ///
    /// # Panics
    ///
    /// Panics if the pool cannot be constructed. Pool construction only
    /// fails on invalid builder parameters, not on connection problems,
    /// so this is a programming error rather than a runtime condition.
    pub fn new(connection_string: &str, _max_size: u32) -> Self {
        let connection_url = Self::build_sqlite_url(connection_string);
        let manager = Manager::new(connection_url, Runtime::Tokio1);
        // SQLite has limited concurrent write support even with WAL mode.
        // Using a single connection avoids "database is locked" errors.
        // For read-heavy workloads, consider increasing this with proper
        // busy_timeout configuration on each connection.
        let sqlite_pool_size = 1;
        let pool = Pool::builder(manager)
            .max_size(sqlite_pool_size)
            .build()
            .expect("Failed to create SQLite connection pool");

        info!(
            "SQLite connection pool initialized (size: {})",
            sqlite_pool_size
        );

        Self { pool }
    }

    /// Gets a connection from the pool.
    pub async fn get_connection(
        &self,
    ) -> Result<deadpool::managed::Object<Manager>, DatabaseError> {
        self.pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))
    }

    /// Strips the `sqlite://` prefix if present.
    fn build_sqlite_url(connection_string: &str) -> String {
        if let Some(path) = connection_string.strip_prefix("sqlite://") {
            path.to_string()
        } else {
            connection_string.to_string()
        }
    }

    /// Runs pending migrations and sets the WAL/busy_timeout pragmas.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        use diesel_migrations::MigrationHarness;

        let conn = self.get_connection().await?;
        conn.interact(|conn| {
            use diesel::prelude::*;

            // WAL mode allows concurrent reads during writes.
            diesel::sql_query("PRAGMA journal_mode=WAL;")
                .execute(conn)
                .map_err(|e| DatabaseError::Migration(format!("Failed to set WAL mode: {}", e)))?;
            // busy_timeout makes SQLite wait instead of immediately
            // failing on locks.
            diesel::sql_query("PRAGMA busy_timeout=30000;")
                .execute(conn)
                .map_err(|e| {
                    DatabaseError::Migration(format!("Failed to set busy_timeout: {}", e))
                })?;
            diesel::sql_query("PRAGMA foreign_keys=ON;")
                .execute(conn)
                .map_err(|e| {
                    DatabaseError::Migration(format!("Failed to enable foreign keys: {}", e))
                })?;

            conn.run_pending_migrations(crate::database::MIGRATIONS)
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
    }
}
