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

//! Execution ledger DAL.
//!
//! The dispatch record is transactional: appending the execution row,
//! incrementing `num_executions` and setting the status to `active` are
//! one atomic write. If any part fails, all of it rolls back, preserving
//! the invariant that the counter always equals the number of ledger
//! rows.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::{train_executions, train_states};
use crate::error::DatabaseError;
use crate::models::train_config::encode_list;
use crate::models::train_execution::{NewTrainExecution, TrainExecution};
use crate::models::train_state::TrainStatus;
use crate::resolver::ResolvedConfig;

/// Data access layer for execution ledger operations.
#[derive(Clone)]
pub struct TrainExecutionDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> TrainExecutionDAL<'a> {
    /// Appends a dispatch record to the ledger.
    ///
    /// Inserts the execution row with the resolved config snapshot and
    /// the workflow engine's run identifier, increments the train's
    /// execution counter and flips its status to `active`, all in one
    /// transaction.
    pub async fn record_dispatch(
        &self,
        train_pk: i32,
        resolved: &ResolvedConfig,
        dag_run: &str,
    ) -> Result<TrainExecution, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let now = chrono::Utc::now().naive_utc();
        let new_execution = NewTrainExecution {
            train_id: train_pk,
            repository: resolved.repository.clone(),
            tag: resolved.tag.clone(),
            env: encode_list(&resolved.env)?,
            volumes: encode_list(&resolved.volumes)?,
            dag_run: dag_run.to_string(),
            created_at: now,
        };

        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let execution: TrainExecution = diesel::insert_into(train_executions::table)
                    .values(&new_execution)
                    .get_result(conn)?;

                diesel::update(train_states::table.filter(train_states::train_id.eq(train_pk)))
                    .set((
                        train_states::num_executions.eq(train_states::num_executions + 1),
                        train_states::status.eq(TrainStatus::Active.as_str()),
                        train_states::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                Ok(execution)
            })
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Lists all executions for a train in dispatch order.
    pub async fn list_for_train(
        &self,
        train_pk: i32,
    ) -> Result<Vec<TrainExecution>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            train_executions::table
                .filter(train_executions::train_id.eq(train_pk))
                .order(train_executions::id.asc())
                .load(conn)
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Retrieves the most recently dispatched execution for a train.
    pub async fn latest_for_train(
        &self,
        train_pk: i32,
    ) -> Result<Option<TrainExecution>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            train_executions::table
                .filter(train_executions::train_id.eq(train_pk))
                .order(train_executions::id.desc())
                .first::<TrainExecution>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }
}
