// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Model repository management for inference serving.
//!
//! The [`manager::ModelRepositoryManager`] reconciles a mutating set of model
//! definitions (discovered by a [`repository::RepositoryPoller`]) into a live
//! set of loaded model versions (driven through a
//! [`lifecycle::ModelLifecycle`]), maintaining a dependency graph so that an
//! ensemble is only loaded once its composing models are, failures propagate
//! downstream, and unloads cascade to dependency-only models.

pub mod config;
pub mod dependency;
pub mod error;
pub mod identifier;
pub mod lifecycle;
pub mod manager;
pub mod mocker;
pub mod model_config;
pub mod repository;

pub use config::{ModelRepositoryOptions, ModelRepositoryOptionsBuilder};
pub use error::{Error, ModelStatusMap, Status, summarize};
pub use identifier::{GLOBAL_NAMESPACE, ModelIdentifier, is_global_namespace};
pub use lifecycle::{
    ModelHandle, ModelLifecycle, ModelReadyState, ModelStateMap, ModelVersionState,
    VersionStateMap,
};
pub use manager::{
    ActionType, MODEL_READY_REASON_DUPLICATE, ModelIndex, ModelRepositoryManager,
};
pub use model_config::{EnsembleConfig, EnsembleStep, ModelConfig, UpstreamReference};
pub use repository::{
    LoadParameter, ModelInfo, ModelInfoMap, ModelMapping, PollRequest, PollResult,
    RepositoryPoller,
};
