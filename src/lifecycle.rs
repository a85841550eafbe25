// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The model lifecycle collaborator: the external subsystem that actually
//! loads and unloads model versions. The repository manager only drives it
//! and mirrors its state into the dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{Error, Status};
use crate::identifier::ModelIdentifier;
use crate::model_config::ModelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ModelReadyState {
    Unknown,
    Ready,
    Unavailable,
    Loading,
    Unloading,
}

/// State of one version of one model, with a human-readable reason when the
/// version is not ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersionState {
    pub state: ModelReadyState,
    #[serde(default)]
    pub reason: String,
}

impl ModelVersionState {
    pub fn new(state: ModelReadyState) -> Self {
        Self {
            state,
            reason: String::new(),
        }
    }

    pub fn with_reason(state: ModelReadyState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: reason.into(),
        }
    }
}

pub type VersionStateMap = BTreeMap<i64, ModelVersionState>;
pub type ModelStateMap = BTreeMap<ModelIdentifier, VersionStateMap>;

/// Opaque handle to a live model instance owned by the lifecycle.
pub trait ModelHandle: Send + Sync {
    fn id(&self) -> &ModelIdentifier;
    fn version(&self) -> i64;
}

/// Capability the lifecycle subsystem provides to the repository manager.
///
/// `load` and `unload` are idempotent per `(identifier, version)`; a reload
/// with a config that drops previously served versions is expected to retire
/// those versions on the lifecycle side. Loads of distinct identifiers may be
/// invoked concurrently.
#[async_trait]
pub trait ModelLifecycle: Send + Sync {
    async fn load(&self, id: &ModelIdentifier, version: i64, config: &ModelConfig) -> Status;

    /// Unload every version of the model. Draining in-flight inference is the
    /// lifecycle's concern, not the manager's.
    async fn unload(&self, id: &ModelIdentifier) -> Status;

    /// Versions of the model currently live (ready or still loading).
    fn loaded_versions(&self, id: &ModelIdentifier) -> BTreeSet<i64>;

    /// States of all versions of all live models. With `strict_readiness`
    /// only models with at least one ready version are considered live.
    fn live_model_states(&self, strict_readiness: bool) -> ModelStateMap;

    /// States of all versions of every model ever (attempted to be) loaded.
    fn model_states(&self) -> ModelStateMap;

    fn version_states(&self, id: &ModelIdentifier) -> VersionStateMap;

    fn model_state(&self, id: &ModelIdentifier, version: i64) -> Result<ModelReadyState, Error>;

    fn get_model(
        &self,
        id: &ModelIdentifier,
        version: i64,
    ) -> Result<Arc<dyn ModelHandle>, Error>;

    /// Stop accepting new inference requests on every model while letting
    /// in-flight work finish.
    async fn stop_all(&self);

    /// `(name, version, inflight_count)` for every version with in-flight
    /// inference.
    fn inflight_status(&self) -> BTreeSet<(String, i64, usize)>;
}
