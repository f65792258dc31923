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

//! Train catalog DAL.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::{train_states, trains};
use crate::error::DatabaseError;
use crate::models::train::{NewTrain, Train};
use crate::models::train_state::NewTrainState;

/// Data access layer for train catalog operations.
#[derive(Clone)]
pub struct TrainDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> TrainDAL<'a> {
    /// Creates a new train together with its initial state row.
    ///
    /// The two inserts run in one transaction: a train without a state
    /// row must never be observable.
    pub async fn create(&self, new_train: NewTrain) -> Result<Train, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let train: Train = diesel::insert_into(trains::table)
                    .values(&new_train)
                    .get_result(conn)?;

                diesel::insert_into(train_states::table)
                    .values(&NewTrainState::initial(train.id))
                    .execute(conn)?;

                Ok(train)
            })
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Retrieves a train by its external identifier.
    pub async fn get_by_train_id(&self, train_id: &str) -> Result<Option<Train>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let train_id = train_id.to_string();
        conn.interact(move |conn| {
            trains::table
                .filter(trains::train_id.eq(train_id))
                .first::<Train>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Lists registered trains, most recently registered last.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Train>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            let query = trains::table.order(trains::id.asc());
            match limit {
                Some(limit) => query.limit(limit).load(conn),
                None => query.load(conn),
            }
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Assigns a config as the train's default and returns the updated
    /// row.
    pub async fn assign_config(
        &self,
        train_pk: i32,
        config_id: i32,
    ) -> Result<Train, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let now = chrono::Utc::now().naive_utc();
        conn.interact(move |conn| {
            diesel::update(trains::table.find(train_pk))
                .set((trains::config_id.eq(Some(config_id)), trains::updated_at.eq(now)))
                .get_result(conn)
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }
}
