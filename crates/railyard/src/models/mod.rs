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

//! Data models for trains, configs, per-train state and the execution
//! ledger.

pub mod train;
pub mod train_config;
pub mod train_execution;
pub mod train_state;

pub use train::{NewTrain, Train};
pub use train_config::{ConfigSpec, EnvVar, NewTrainConfig, TrainConfig, VolumeMount};
pub use train_execution::{NewTrainExecution, TrainExecution};
pub use train_state::{NewTrainState, TrainState, TrainStatus};
