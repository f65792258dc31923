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

//! Data Access Layer for the station ledger.
//!
//! This module realizes the Train/Config repository contract consumed by
//! the engine: train catalog operations, config CRUD, state reads and the
//! transactional dispatch record. Writes that must be observably atomic
//! (execution insert + counter increment + status flip) happen inside a
//! single SQL transaction in [`TrainExecutionDAL::record_dispatch`].

pub mod train;
pub mod train_config;
pub mod train_execution;
pub mod train_state;

pub use train::TrainDAL;
pub use train_config::TrainConfigDAL;
pub use train_execution::TrainExecutionDAL;
pub use train_state::TrainStateDAL;

use crate::database::Database;

/// The main Data Access Layer struct.
#[derive(Clone)]
pub struct DAL {
    /// The database handle shared by all entity DALs.
    pub database: Database,
}

impl DAL {
    /// Creates a new DAL instance over the given database.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns a TrainDAL for train catalog operations.
    pub fn trains(&self) -> TrainDAL {
        TrainDAL { dal: self }
    }

    /// Returns a TrainConfigDAL for config operations.
    pub fn configs(&self) -> TrainConfigDAL {
        TrainConfigDAL { dal: self }
    }

    /// Returns a TrainStateDAL for state reads and status updates.
    pub fn states(&self) -> TrainStateDAL {
        TrainStateDAL { dal: self }
    }

    /// Returns a TrainExecutionDAL for ledger operations.
    pub fn executions(&self) -> TrainExecutionDAL {
        TrainExecutionDAL { dal: self }
    }
}
