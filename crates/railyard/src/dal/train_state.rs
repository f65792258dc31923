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

//! Train state DAL.
//!
//! The counter-bearing transition lives in
//! [`TrainExecutionDAL::record_dispatch`](super::TrainExecutionDAL::record_dispatch);
//! this DAL only reads state rows and flips the status flag when a
//! terminal run state has been observed.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::train_states;
use crate::error::DatabaseError;
use crate::models::train_state::{TrainState, TrainStatus};

/// Data access layer for train state operations.
#[derive(Clone)]
pub struct TrainStateDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> TrainStateDAL<'a> {
    /// Retrieves the state row for a train.
    pub async fn get_for_train(&self, train_pk: i32) -> Result<Option<TrainState>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            train_states::table
                .filter(train_states::train_id.eq(train_pk))
                .first::<TrainState>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Sets the status flag without touching the execution counter.
    pub async fn set_status(
        &self,
        train_pk: i32,
        status: TrainStatus,
    ) -> Result<TrainState, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let now = chrono::Utc::now().naive_utc();
        conn.interact(move |conn| {
            diesel::update(train_states::table.filter(train_states::train_id.eq(train_pk)))
                .set((
                    train_states::status.eq(status.as_str()),
                    train_states::updated_at.eq(now),
                ))
                .get_result(conn)
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }
}
