// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The model repository manager: turns a mutating set of model definitions
//! into a live, consistent set of loaded model versions, respecting
//! inter-model dependencies.
//!
//! All write operations are serialized on one async mutex and may block for
//! as long as the lifecycle collaborator needs; read operations delegate to
//! the lifecycle and take no manager lock.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use serde::Serialize;
use strum::Display;
use tokio::sync::Mutex;

use crate::config::ModelRepositoryOptions;
use crate::dependency::DependencyGraph;
use crate::error::{Error, ModelStatusMap, Status, summarize};
use crate::identifier::ModelIdentifier;
use crate::lifecycle::{
    ModelHandle, ModelLifecycle, ModelReadyState, ModelStateMap, VersionStateMap,
};
use crate::model_config::ModelConfig;
use crate::repository::{LoadParameter, ModelInfoMap, ModelMapping, PollRequest, RepositoryPoller};

/// Reason attached to repository-index rows for models rejected because the
/// same name appears in more than one repository.
pub const MODEL_READY_REASON_DUPLICATE: &str = "model appears in two or more repositories";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ActionType {
    Load,
    Unload,
}

/// One row of the repository index. `version` is `None` for name-only rows,
/// models known on disk but without any version state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelIndex {
    pub id: ModelIdentifier,
    pub version: Option<i64>,
    pub state: ModelReadyState,
    pub reason: String,
}

/// State guarded by the manager-wide write mutex.
struct ManagerState {
    graph: DependencyGraph,
    infos: ModelInfoMap,
    repository_paths: BTreeSet<PathBuf>,
    model_mappings: BTreeMap<String, ModelMapping>,
}

pub struct ModelRepositoryManager {
    options: ModelRepositoryOptions,
    poller: Arc<dyn RepositoryPoller>,
    lifecycle: Arc<dyn ModelLifecycle>,
    /// Serializes every write operation, held across lifecycle awaits.
    state: Mutex<ManagerState>,
    /// Read-path snapshot of known model names, refreshed by write
    /// operations so lookups never touch the write mutex.
    name_index: RwLock<BTreeMap<String, BTreeSet<ModelIdentifier>>>,
}

impl ModelRepositoryManager {
    /// Create the manager and perform its startup action: an initial
    /// repository poll when model control is disabled, or loading
    /// `startup_models` when it is enabled.
    pub async fn create(
        options: ModelRepositoryOptions,
        poller: Arc<dyn RepositoryPoller>,
        lifecycle: Arc<dyn ModelLifecycle>,
    ) -> Result<Arc<Self>, Error> {
        options.check()?;
        let manager = Arc::new(Self {
            state: Mutex::new(ManagerState {
                graph: DependencyGraph::new(options.enable_model_namespacing),
                infos: ModelInfoMap::new(),
                repository_paths: options.repository_paths.clone(),
                model_mappings: BTreeMap::new(),
            }),
            name_index: RwLock::new(BTreeMap::new()),
            poller,
            lifecycle,
            options,
        });

        if manager.options.model_control_enabled {
            if !manager.options.startup_models.is_empty() {
                let models: BTreeMap<String, Vec<LoadParameter>> = manager
                    .options
                    .startup_models
                    .iter()
                    .map(|name| (name.clone(), Vec::new()))
                    .collect();
                let statuses = manager
                    .load_unload_model(&models, ActionType::Load, false)
                    .await?;
                summarize(&statuses)?;
            }
        } else {
            let mut state = manager.state.lock().await;
            let statuses = manager.poll_and_update_internal(&mut state).await?;
            manager.refresh_name_index(&state);
            if let Err(e) = summarize(&statuses) {
                tracing::warn!(error = %e, "some models failed to load at startup");
            }
        }
        Ok(manager)
    }

    /// Poll every registered repository, reconcile the dependency graph with
    /// the result and drive loads/unloads until the graph reaches a fixed
    /// point. Only allowed when polling is enabled.
    ///
    /// Per-model outcomes are returned in the map; fold them with
    /// [`summarize`] for an overall status.
    pub async fn poll_and_update(&self) -> Result<ModelStatusMap, Error> {
        if !self.options.polling_enabled {
            return Err(Error::Unsupported(
                "repository polling is not enabled".to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        let result = self.poll_and_update_internal(&mut state).await;
        self.refresh_name_index(&state);
        result
    }

    /// Load or unload the named models. Only allowed when model control is
    /// enabled. Loading an ensemble also pulls in and loads its composing
    /// models; `unload_dependents` controls whether unloading cascades to
    /// dependency-only models left without any dependent.
    ///
    /// Returns the per-model outcome map (including auto-discovered
    /// dependencies); errors are operation-level failures such as an unknown
    /// model or a disabled control API.
    pub async fn load_unload_model(
        &self,
        models: &BTreeMap<String, Vec<LoadParameter>>,
        action: ActionType,
        unload_dependents: bool,
    ) -> Result<ModelStatusMap, Error> {
        if !self.options.model_control_enabled {
            return Err(Error::Unsupported(
                "explicit model load / unload is not allowed if model control is disabled"
                    .to_string(),
            ));
        }
        if models.is_empty() {
            return Ok(ModelStatusMap::new());
        }
        let mut state = self.state.lock().await;
        let result = match action {
            ActionType::Load => self.load_requested_models(&mut state, models).await,
            ActionType::Unload => {
                self.unload_requested_models(&mut state, models, unload_dependents)
                    .await
            }
        };
        self.refresh_name_index(&state);
        match &result {
            Ok(statuses) => {
                if let Err(e) = summarize(statuses) {
                    tracing::warn!(
                        action = %action,
                        error = %e,
                        "load/unload completed with per-model failures"
                    );
                }
            }
            Err(e) => {
                tracing::error!(action = %action, error = %e, "load/unload failed");
            }
        }
        result
    }

    /// Unload every known model. Called before shutting the manager down.
    pub async fn unload_all_models(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let ids: BTreeSet<ModelIdentifier> = state.infos.keys().cloned().collect();
        let statuses = self.unload_models(&ids).await;
        for id in &ids {
            if let Some(node) = state.graph.node_mut(id) {
                node.loaded_versions.clear();
            }
        }
        summarize(&statuses)
    }

    /// Instruct all models to stop accepting new inference requests while
    /// letting in-flight work finish.
    pub async fn stop_all_models(&self) -> Result<(), Error> {
        let _state = self.state.lock().await;
        self.lifecycle.stop_all().await;
        Ok(())
    }

    /// Register a repository path, optionally mapping model names onto
    /// subdirectories. Registration never loads anything by itself.
    pub async fn register_model_repository(
        &self,
        repository: &Path,
        model_mapping: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.options.model_control_enabled {
            return Err(Error::Unsupported(
                "model repository registration is only allowed when model control is enabled"
                    .to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        if state.repository_paths.contains(repository) {
            return Err(Error::AlreadyExists(format!(
                "model repository '{}' has already been registered",
                repository.display()
            )));
        }
        for name in model_mapping.keys() {
            let collides = state.model_mappings.contains_key(name)
                || state.infos.keys().any(|id| &id.name == name);
            if collides {
                return Err(Error::AlreadyExists(format!(
                    "failed to register model repository '{}', model '{name}' already exists",
                    repository.display()
                )));
            }
        }
        state.repository_paths.insert(repository.to_path_buf());
        for (name, subdirectory) in model_mapping {
            state.model_mappings.insert(
                name.clone(),
                ModelMapping {
                    repository: repository.to_path_buf(),
                    subdirectory: subdirectory.clone(),
                },
            );
        }
        tracing::info!(repository = %repository.display(), "registered model repository");
        Ok(())
    }

    /// Unregister a repository path. Models from it appear as deleted on the
    /// next poll or are unloaded explicitly by the caller.
    pub async fn unregister_model_repository(&self, repository: &Path) -> Result<(), Error> {
        if !self.options.model_control_enabled {
            return Err(Error::Unsupported(
                "model repository unregistration is only allowed when model control is enabled"
                    .to_string(),
            ));
        }
        let mut state = self.state.lock().await;
        if !state.repository_paths.remove(repository) {
            return Err(Error::NotFound(format!(
                "failed to unregister model repository '{}', it is not registered",
                repository.display()
            )));
        }
        state
            .model_mappings
            .retain(|_, mapping| mapping.repository != repository);
        tracing::info!(repository = %repository.display(), "unregistered model repository");
        Ok(())
    }

    pub fn live_model_states(&self, strict_readiness: bool) -> ModelStateMap {
        self.lifecycle.live_model_states(strict_readiness)
    }

    pub fn model_states(&self) -> ModelStateMap {
        self.lifecycle.model_states()
    }

    /// Version states across every namespace carrying this model name.
    pub fn version_states(&self, name: &str) -> VersionStateMap {
        let ids = self.ids_for_name(name);
        let mut states = VersionStateMap::new();
        for id in ids {
            states.extend(self.lifecycle.version_states(&id));
        }
        states
    }

    pub fn model_state(
        &self,
        name: &str,
        version: i64,
    ) -> Result<ModelReadyState, Error> {
        let id = self.resolve_name(name)?;
        self.lifecycle.model_state(&id, version)
    }

    /// Look up a model by bare name. Fails with `InvalidArgument` when the
    /// name exists in more than one namespace.
    pub fn get_model(
        &self,
        name: &str,
        version: i64,
    ) -> Result<Arc<dyn ModelHandle>, Error> {
        let id = self.resolve_name(name)?;
        self.lifecycle.get_model(&id, version)
    }

    pub fn get_model_in_namespace(
        &self,
        namespace: &str,
        name: &str,
        version: i64,
    ) -> Result<Arc<dyn ModelHandle>, Error> {
        let id = ModelIdentifier::new(namespace, name);
        self.lifecycle.get_model(&id, version)
    }

    /// In-flight inference counts per `(name, version)`.
    pub fn inflight_status(&self) -> BTreeSet<(String, i64, usize)> {
        self.lifecycle.inflight_status()
    }

    /// Index of every model in every repository plus every model the
    /// lifecycle has ever seen, including models rejected for duplicate
    /// names.
    pub async fn repository_index(&self, ready_only: bool) -> Result<Vec<ModelIndex>, Error> {
        let state = self.state.lock().await;
        let requested = BTreeMap::new();
        let polled = self
            .poller
            .poll_models(self.poll_request(&requested, &state))
            .await?;

        let mut ids: BTreeSet<ModelIdentifier> = polled.infos.keys().cloned().collect();
        ids.extend(state.infos.keys().cloned());
        ids.extend(self.lifecycle.model_states().keys().cloned());

        let mut index = Vec::new();
        for id in ids {
            let states = self.lifecycle.version_states(&id);
            if states.is_empty() {
                if !ready_only {
                    index.push(ModelIndex {
                        id,
                        version: None,
                        state: ModelReadyState::Unknown,
                        reason: String::new(),
                    });
                }
                continue;
            }
            for (version, version_state) in states {
                if ready_only && version_state.state != ModelReadyState::Ready {
                    continue;
                }
                index.push(ModelIndex {
                    id: id.clone(),
                    version: Some(version),
                    state: version_state.state,
                    reason: version_state.reason,
                });
            }
        }
        if !ready_only {
            for name in polled.conflicts {
                index.push(ModelIndex {
                    id: ModelIdentifier::local(name),
                    version: None,
                    state: ModelReadyState::Unknown,
                    reason: MODEL_READY_REASON_DUPLICATE.to_string(),
                });
            }
        }
        Ok(index)
    }

    async fn poll_and_update_internal(
        &self,
        state: &mut ManagerState,
    ) -> Result<ModelStatusMap, Error> {
        let requested = BTreeMap::new();
        let result = self
            .poller
            .poll_models(self.poll_request(&requested, state))
            .await?;
        tracing::info!(
            added = result.added.len(),
            deleted = result.deleted.len(),
            modified = result.modified.len(),
            unmodified = result.unmodified.len(),
            "polled model repositories"
        );

        for id in &result.deleted {
            state.infos.remove(id);
        }
        for (id, info) in result.infos {
            state.infos.insert(id, info);
        }

        let removed = Self::update_dependency_graph(
            state,
            &result.added,
            &result.deleted,
            &result.modified,
            true,
        );
        let mut statuses = self.unload_models(&removed).await;
        for id in &removed {
            state.infos.remove(id);
        }
        statuses.extend(self.load_model_by_dependency(state).await);
        Self::merge_failed_states(state, &mut statuses);

        if let Err(e) = summarize(&statuses) {
            tracing::warn!(error = %e, "some models failed to reach their target state");
        }
        if !result.all_polled {
            return Err(Error::Internal(
                "failed to poll all models from the model repositories".to_string(),
            ));
        }
        Ok(statuses)
    }

    /// Explicit load: poll the requested models, then keep polling whatever
    /// upstream names are still unresolved, so loading an ensemble pulls in
    /// its composing models as non-explicit dependencies.
    async fn load_requested_models(
        &self,
        state: &mut ManagerState,
        models: &BTreeMap<String, Vec<LoadParameter>>,
    ) -> Result<ModelStatusMap, Error> {
        let mut all_polled = true;
        let mut round = models.clone();
        let mut attempted: BTreeSet<String> = round.keys().cloned().collect();
        let mut explicit_round = true;

        loop {
            let result = self
                .poller
                .poll_models(self.poll_request(&round, state))
                .await?;
            all_polled &= result.all_polled;

            if explicit_round {
                for name in round.keys() {
                    if !result.infos.keys().any(|id| &id.name == name) {
                        return Err(Error::NotFound(format!(
                            "failed to load model '{name}', no model configuration was found"
                        )));
                    }
                }
            }

            let mut round_added = BTreeSet::new();
            let mut round_modified = BTreeSet::new();
            for (id, mut info) in result.infos {
                info.explicitly_load = explicit_round;
                if state.infos.contains_key(&id) {
                    round_modified.insert(id.clone());
                } else {
                    round_added.insert(id.clone());
                }
                state.infos.insert(id, info);
            }
            Self::update_dependency_graph(
                state,
                &round_added,
                &BTreeSet::new(),
                &round_modified,
                false,
            );

            round = state
                .graph
                .missing_names()
                .into_iter()
                .filter(|name| !attempted.contains(name))
                .map(|name| (name, Vec::new()))
                .collect();
            if round.is_empty() {
                break;
            }
            attempted.extend(round.keys().cloned());
            explicit_round = false;
        }

        let mut statuses = self.load_model_by_dependency(state).await;
        Self::merge_failed_states(state, &mut statuses);
        if !all_polled {
            return Err(Error::Internal(
                "failed to poll all requested models from the model repositories".to_string(),
            ));
        }
        Ok(statuses)
    }

    /// Explicit unload: the requested models are forced into the deleted set
    /// without a poll, since they may already be gone from disk.
    async fn unload_requested_models(
        &self,
        state: &mut ManagerState,
        models: &BTreeMap<String, Vec<LoadParameter>>,
        unload_dependents: bool,
    ) -> Result<ModelStatusMap, Error> {
        let mut deleted = BTreeSet::new();
        for name in models.keys() {
            let ids: Vec<ModelIdentifier> = state
                .infos
                .keys()
                .filter(|id| &id.name == name)
                .cloned()
                .collect();
            if ids.is_empty() {
                return Err(Error::NotFound(format!(
                    "failed to unload model '{name}', the model was never loaded"
                )));
            }
            deleted.extend(ids);
        }

        let removed = Self::update_dependency_graph(
            state,
            &BTreeSet::new(),
            &deleted,
            &BTreeSet::new(),
            unload_dependents,
        );
        for id in &removed {
            state.infos.remove(id);
        }
        let mut statuses = self.unload_models(&removed).await;
        statuses.extend(self.load_model_by_dependency(state).await);
        Self::merge_failed_states(state, &mut statuses);
        Ok(statuses)
    }

    /// Nodes that failed during graph construction never enter the scheduler
    /// frontier; their status still belongs in the operation's result.
    fn merge_failed_states(state: &ManagerState, statuses: &mut ModelStatusMap) {
        for (id, status) in state.graph.failed_states() {
            statuses.entry(id).or_insert(status);
        }
    }

    /// Apply poll deltas to the dependency graph, then re-resolve upstream
    /// edges and re-run the cycle check for every affected node. Returns the
    /// removed set so the caller can drive lifecycle unloads.
    fn update_dependency_graph(
        state: &mut ManagerState,
        added: &BTreeSet<ModelIdentifier>,
        deleted: &BTreeSet<ModelIdentifier>,
        modified: &BTreeSet<ModelIdentifier>,
        cascading: bool,
    ) -> BTreeSet<ModelIdentifier> {
        let (mut affected, removed) = state.graph.remove_nodes(deleted, cascading);
        affected.extend(state.graph.update_nodes(modified, &state.infos));
        affected.extend(state.graph.add_nodes(added, &state.infos));

        // Wire every affected node before checking for cycles so each member
        // of a cycle sees the complete loop and fails individually.
        for id in &affected {
            if state.graph.contains_node(id) {
                state.graph.connect_upstreams(id);
            }
        }
        for id in &affected {
            if state.graph.contains_node(id) {
                if let Err(e) = state.graph.circularity_check(id) {
                    tracing::warn!(model = %id, error = %e, "dependency cycle detected");
                }
            }
        }
        removed
    }

    /// The load scheduler: iterate to a fixed point, each round acting on
    /// every node whose upstreams are settled, fanning lifecycle calls out
    /// concurrently and propagating upstream failures downstream.
    async fn load_model_by_dependency(&self, state: &mut ManagerState) -> ModelStatusMap {
        let min_compute_capability = self.options.min_compute_capability;
        let mut model_load_status = ModelStatusMap::new();
        let mut frontier = state.graph.unchecked_ids();

        while !frontier.is_empty() {
            let mut ready = Vec::new();
            let mut blocked = BTreeSet::new();
            for id in &frontier {
                if state.graph.check_node(id) {
                    ready.push(id.clone());
                } else {
                    blocked.insert(id.clone());
                }
            }
            if ready.is_empty() {
                // Unreachable while the cycle check holds; fail loudly
                // instead of spinning.
                for id in blocked {
                    let err = Error::Internal(format!(
                        "dependency scheduling stalled for model '{id}'"
                    ));
                    if let Some(node) = state.graph.node_mut(&id) {
                        node.checked = true;
                        node.status = Err(err.clone());
                    }
                    model_load_status.insert(id, Err(err));
                }
                break;
            }

            let mut loads: Vec<(ModelIdentifier, i64, ModelConfig)> = Vec::new();
            let mut unloads: Vec<ModelIdentifier> = Vec::new();
            let mut completed: BTreeSet<ModelIdentifier> = BTreeSet::new();

            for id in &ready {
                let Some(node) = state.graph.node_mut(id) else {
                    continue;
                };
                node.checked = true;

                if let Err(e) = node.status.clone() {
                    model_load_status.insert(id.clone(), Err(e));
                    if node.loaded_versions.is_empty() {
                        completed.insert(id.clone());
                    } else {
                        unloads.push(id.clone());
                    }
                    continue;
                }
                if let Err(e) = node.model_config.check(min_compute_capability) {
                    node.status = Err(e.clone());
                    model_load_status.insert(id.clone(), Err(e));
                    if node.loaded_versions.is_empty() {
                        completed.insert(id.clone());
                    } else {
                        unloads.push(id.clone());
                    }
                    continue;
                }
                let desired: BTreeSet<i64> = node.model_config.versions.iter().copied().collect();
                if desired.is_empty() {
                    let e = Error::ConfigInvalid(format!(
                        "model '{id}' has no versions available to load"
                    ));
                    node.status = Err(e.clone());
                    model_load_status.insert(id.clone(), Err(e));
                    if node.loaded_versions.is_empty() {
                        completed.insert(id.clone());
                    } else {
                        unloads.push(id.clone());
                    }
                    continue;
                }
                if !node.reload_pending && desired == node.loaded_versions {
                    // Already in the requested state, nothing to do.
                    model_load_status.insert(id.clone(), Ok(()));
                    completed.insert(id.clone());
                    continue;
                }
                node.reload_pending = false;
                for version in &desired {
                    loads.push((id.clone(), *version, node.model_config.clone()));
                }
            }

            let mut operations: Vec<BoxFuture<'static, (ModelIdentifier, Option<i64>, Status)>> =
                Vec::new();
            for id in unloads {
                let lifecycle = self.lifecycle.clone();
                operations.push(
                    async move {
                        let status = lifecycle.unload(&id).await;
                        (id, None, status)
                    }
                    .boxed(),
                );
            }
            for (id, version, config) in loads {
                let lifecycle = self.lifecycle.clone();
                operations.push(
                    async move {
                        let status = lifecycle.load(&id, version, &config).await;
                        (id, Some(version), status)
                    }
                    .boxed(),
                );
            }

            for (id, version, status) in join_all(operations).await {
                completed.insert(id.clone());
                match status {
                    Ok(()) => {
                        // Keep an earlier failure of a sibling version.
                        model_load_status.entry(id).or_insert(Ok(()));
                    }
                    Err(e) => {
                        tracing::warn!(
                            model = %id,
                            version = ?version,
                            kind = e.kind_str(),
                            error = %e,
                            "lifecycle operation failed"
                        );
                        if let Some(node) = state.graph.node_mut(&id) {
                            if node.status.is_ok() {
                                node.status = Err(e.clone());
                            }
                        }
                        model_load_status.insert(id, Err(e));
                    }
                }
            }

            for id in &completed {
                let live = self.lifecycle.loaded_versions(id);
                if let Some(node) = state.graph.node_mut(id) {
                    node.loaded_versions = live;
                }
            }

            let mut next = blocked;
            for id in &completed {
                let downstreams = state
                    .graph
                    .node(id)
                    .map(|node| node.downstreams.clone())
                    .unwrap_or_default();
                for downstream in downstreams {
                    if state
                        .graph
                        .node(&downstream)
                        .is_some_and(|node| !node.checked)
                    {
                        next.insert(downstream);
                    }
                }
            }
            frontier = next;
        }
        model_load_status
    }

    async fn unload_models(&self, ids: &BTreeSet<ModelIdentifier>) -> ModelStatusMap {
        let mut operations: Vec<BoxFuture<'static, (ModelIdentifier, Status)>> = Vec::new();
        for id in ids {
            let lifecycle = self.lifecycle.clone();
            let id = id.clone();
            operations.push(
                async move {
                    let status = lifecycle.unload(&id).await;
                    (id, status)
                }
                .boxed(),
            );
        }
        let mut statuses = ModelStatusMap::new();
        for (id, status) in join_all(operations).await {
            if let Err(e) = &status {
                tracing::warn!(model = %id, error = %e, "failed to unload model");
            }
            statuses.insert(id, status);
        }
        statuses
    }

    fn poll_request<'a>(
        &'a self,
        requested: &'a BTreeMap<String, Vec<LoadParameter>>,
        state: &'a ManagerState,
    ) -> PollRequest<'a> {
        PollRequest {
            requested,
            prior: &state.infos,
            repository_paths: &state.repository_paths,
            model_mappings: &state.model_mappings,
            strict_model_config: self.options.strict_model_config,
            enable_namespacing: self.options.enable_model_namespacing,
        }
    }

    fn refresh_name_index(&self, state: &ManagerState) {
        let mut index: BTreeMap<String, BTreeSet<ModelIdentifier>> = BTreeMap::new();
        for id in state.infos.keys() {
            index.entry(id.name.clone()).or_default().insert(id.clone());
        }
        *self.name_index.write() = index;
    }

    fn ids_for_name(&self, name: &str) -> BTreeSet<ModelIdentifier> {
        self.name_index
            .read()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn resolve_name(&self, name: &str) -> Result<ModelIdentifier, Error> {
        let ids = self.ids_for_name(name);
        match ids.len() {
            0 => Err(Error::NotFound(format!("model '{name}' is not found"))),
            1 => Ok(ids.into_iter().next().ok_or_else(|| {
                Error::Internal("name index entry vanished".to_string())
            })?),
            _ => Err(Error::InvalidArgument(format!(
                "model name '{name}' exists in more than one namespace, a namespace is required"
            ))),
        }
    }
}
