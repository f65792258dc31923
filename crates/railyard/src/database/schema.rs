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

//! Diesel table definitions for the station ledger.

diesel::table! {
    train_configs (id) {
        id -> Integer,
        name -> Text,
        repository -> Nullable<Text>,
        tag -> Nullable<Text>,
        env -> Nullable<Text>,
        volumes -> Nullable<Text>,
        auto_execute -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    trains (id) {
        id -> Integer,
        train_id -> Text,
        name -> Nullable<Text>,
        config_id -> Nullable<Integer>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    train_states (id) {
        id -> Integer,
        train_id -> Integer,
        status -> Text,
        num_executions -> Integer,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    train_executions (id) {
        id -> Integer,
        train_id -> Integer,
        repository -> Text,
        tag -> Text,
        env -> Nullable<Text>,
        volumes -> Nullable<Text>,
        dag_run -> Text,
        created_at -> Timestamp,
    }
}

diesel::joinable!(trains -> train_configs (config_id));
diesel::joinable!(train_states -> trains (train_id));
diesel::joinable!(train_executions -> trains (train_id));

diesel::allow_tables_to_appear_in_same_query!(trains, train_configs, train_states, train_executions);
