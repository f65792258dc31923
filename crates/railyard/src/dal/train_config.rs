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

//! Train config DAL.

use diesel::prelude::*;

use super::DAL;
use crate::database::schema::train_configs;
use crate::error::DatabaseError;
use crate::models::train_config::{encode_list, ConfigSpec, TrainConfig};

/// Data access layer for train config operations.
#[derive(Clone)]
pub struct TrainConfigDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> TrainConfigDAL<'a> {
    /// Creates a new config from a caller-facing spec.
    pub async fn create(&self, spec: ConfigSpec) -> Result<TrainConfig, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let new_config = spec.into_new_config()?;
        conn.interact(move |conn| {
            diesel::insert_into(train_configs::table)
                .values(&new_config)
                .get_result(conn)
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Retrieves a config by id.
    pub async fn get(&self, config_id: i32) -> Result<Option<TrainConfig>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| {
            train_configs::table
                .find(config_id)
                .first::<TrainConfig>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Retrieves a config by its unique name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<TrainConfig>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let name = name.to_string();
        conn.interact(move |conn| {
            train_configs::table
                .filter(train_configs::name.eq(name))
                .first::<TrainConfig>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }

    /// Lists all configs in creation order.
    pub async fn list(&self) -> Result<Vec<TrainConfig>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        conn.interact(move |conn| train_configs::table.order(train_configs::id.asc()).load(conn))
            .await
            .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
            .map_err(DatabaseError::Query)
    }

    /// Replaces a config's fields in place and returns the updated row.
    ///
    /// Returns `Ok(None)` when no config with the given id exists.
    pub async fn update(
        &self,
        config_id: i32,
        spec: ConfigSpec,
    ) -> Result<Option<TrainConfig>, DatabaseError> {
        let conn = self.dal.database.get_connection().await?;

        let env = encode_list(&spec.env)?;
        let volumes = encode_list(&spec.volumes)?;
        let now = chrono::Utc::now().naive_utc();
        conn.interact(move |conn| {
            diesel::update(train_configs::table.find(config_id))
                .set((
                    train_configs::name.eq(spec.name),
                    train_configs::repository.eq(spec.repository),
                    train_configs::tag.eq(spec.tag),
                    train_configs::env.eq(env),
                    train_configs::volumes.eq(volumes),
                    train_configs::auto_execute.eq(spec.auto_execute),
                    train_configs::updated_at.eq(now),
                ))
                .get_result::<TrainConfig>(conn)
                .optional()
        })
        .await
        .map_err(|e| DatabaseError::ConnectionPool(e.to_string()))?
        .map_err(DatabaseError::Query)
    }
}
