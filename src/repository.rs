// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The repository poller collaborator: the subsystem that scans model
//! repositories (or caller-supplied definitions) and reports what changed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::identifier::ModelIdentifier;
use crate::model_config::ModelConfig;

/// Immutable snapshot of one model produced by a poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_config: ModelConfig,

    /// True iff the model was requested by name from the control API or was
    /// discovered by a full-repository poll; dependency-discovered models
    /// carry `false`, which makes them eligible for cascading unload.
    pub explicitly_load: bool,

    /// Freshness marker, only compared for equality to decide "modified".
    pub mtime_ns: u64,
}

pub type ModelInfoMap = BTreeMap<ModelIdentifier, ModelInfo>;

/// Per-model parameter supplied with an explicit load request.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadParameter {
    /// JSON-serialized [`ModelConfig`] overriding whatever is on disk.
    Config(String),
    /// Load the model definition from this directory instead of the
    /// registered repositories.
    ModelDirectory(PathBuf),
}

/// Mapping from an (overridden) model name to where it actually lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMapping {
    pub repository: PathBuf,
    pub subdirectory: String,
}

/// One poll request. An empty `requested` map means "poll the whole set of
/// registered repositories".
pub struct PollRequest<'a> {
    pub requested: &'a BTreeMap<String, Vec<LoadParameter>>,
    /// The manager's current snapshot, used to compute deltas.
    pub prior: &'a ModelInfoMap,
    pub repository_paths: &'a BTreeSet<PathBuf>,
    pub model_mappings: &'a BTreeMap<String, ModelMapping>,
    pub strict_model_config: bool,
    pub enable_namespacing: bool,
}

/// Deltas and fresh snapshots from one poll.
#[derive(Debug, Clone, Default)]
pub struct PollResult {
    pub added: BTreeSet<ModelIdentifier>,
    pub deleted: BTreeSet<ModelIdentifier>,
    pub modified: BTreeSet<ModelIdentifier>,
    pub unmodified: BTreeSet<ModelIdentifier>,
    /// Fresh snapshots for every model in `added`, `modified` and
    /// `unmodified`.
    pub infos: ModelInfoMap,
    /// Names rejected because they appear in two or more repositories.
    pub conflicts: BTreeSet<String>,
    /// False when some models failed to read; their prior state is retained
    /// by the caller.
    pub all_polled: bool,
}

#[async_trait]
pub trait RepositoryPoller: Send + Sync {
    async fn poll_models(&self, request: PollRequest<'_>) -> Result<PollResult, Error>;
}
