// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! In-memory mock collaborators for testing the repository manager without a
//! filesystem or a real model runtime.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Status};
use crate::identifier::{GLOBAL_NAMESPACE, ModelIdentifier};
use crate::lifecycle::{
    ModelHandle, ModelLifecycle, ModelReadyState, ModelStateMap, ModelVersionState,
    VersionStateMap,
};
use crate::model_config::ModelConfig;
use crate::repository::{
    LoadParameter, ModelInfo, PollRequest, PollResult, RepositoryPoller,
};

#[derive(Debug, Clone)]
struct MockModel {
    config: ModelConfig,
    mtime_ns: u64,
}

#[derive(Debug, Default)]
struct MockRepositoryState {
    /// repository path -> subdirectory (model) name -> definition
    repositories: BTreeMap<PathBuf, BTreeMap<String, MockModel>>,
    /// Names whose polls fail; their prior state is retained by the manager.
    failing: BTreeSet<String>,
    next_mtime: u64,
}

/// Programmable in-memory stand-in for the filesystem poller.
#[derive(Debug, Default)]
pub struct MockRepositoryPoller {
    inner: Mutex<MockRepositoryState>,
}

impl MockRepositoryPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a model definition, bumping its freshness marker.
    pub fn put_model(&self, repository: impl Into<PathBuf>, config: ModelConfig) {
        let mut state = self.inner.lock();
        state.next_mtime += 1;
        let mtime_ns = state.next_mtime;
        state
            .repositories
            .entry(repository.into())
            .or_default()
            .insert(config.name.clone(), MockModel { config, mtime_ns });
    }

    pub fn remove_model(&self, repository: &Path, name: &str) {
        let mut state = self.inner.lock();
        if let Some(models) = state.repositories.get_mut(repository) {
            models.remove(name);
        }
    }

    /// Bump the freshness marker of every definition with this name, so the
    /// next poll reports it as modified.
    pub fn touch_model(&self, name: &str) {
        let mut state = self.inner.lock();
        state.next_mtime += 1;
        let mtime_ns = state.next_mtime;
        for models in state.repositories.values_mut() {
            if let Some(model) = models.get_mut(name) {
                model.mtime_ns = mtime_ns;
            }
        }
    }

    pub fn fail_model(&self, name: impl Into<String>) {
        self.inner.lock().failing.insert(name.into());
    }

    pub fn clear_failure(&self, name: &str) {
        self.inner.lock().failing.remove(name);
    }
}

fn identifier_for(config: &ModelConfig, enable_namespacing: bool) -> ModelIdentifier {
    let namespace = if enable_namespacing {
        config.namespace.clone().unwrap_or_default()
    } else {
        GLOBAL_NAMESPACE.to_string()
    };
    ModelIdentifier::new(namespace, config.name.clone())
}

#[async_trait]
impl RepositoryPoller for MockRepositoryPoller {
    async fn poll_models(&self, request: PollRequest<'_>) -> Result<PollResult, Error> {
        let mut state = self.inner.lock();

        // Everything visible through the registered repositories and the
        // name mappings, grouped per identifier to spot duplicates.
        let mut sources: BTreeMap<ModelIdentifier, Vec<MockModel>> = BTreeMap::new();
        for (repository, models) in &state.repositories {
            if !request.repository_paths.contains(repository) {
                continue;
            }
            for model in models.values() {
                let id = identifier_for(&model.config, request.enable_namespacing);
                sources.entry(id).or_default().push(model.clone());
            }
        }
        for (mapped_name, mapping) in request.model_mappings {
            if let Some(model) = state
                .repositories
                .get(&mapping.repository)
                .and_then(|models| models.get(&mapping.subdirectory))
            {
                let mut model = model.clone();
                model.config.name = mapped_name.clone();
                let id = identifier_for(&model.config, request.enable_namespacing);
                sources.entry(id).or_default().push(model);
            }
        }

        let mut conflicts = BTreeSet::new();
        let mut snapshot: BTreeMap<ModelIdentifier, MockModel> = BTreeMap::new();
        for (id, mut found) in sources {
            if found.len() > 1 {
                conflicts.insert(id.name.clone());
                continue;
            }
            if let Some(model) = found.pop() {
                snapshot.insert(id, model);
            }
        }

        let full_poll = request.requested.is_empty();
        if !full_poll {
            snapshot.retain(|id, _| request.requested.contains_key(&id.name));
            for (name, params) in request.requested {
                for param in params {
                    match param {
                        LoadParameter::Config(payload) => {
                            let mut config = ModelConfig::from_json(payload)?;
                            if config.name.is_empty() {
                                config.name = name.clone();
                            }
                            let id = identifier_for(&config, request.enable_namespacing);
                            let mtime_ns = match request.prior.get(&id) {
                                Some(prior) if prior.model_config == config => prior.mtime_ns,
                                _ => {
                                    state.next_mtime += 1;
                                    state.next_mtime
                                }
                            };
                            snapshot.insert(id, MockModel { config, mtime_ns });
                        }
                        LoadParameter::ModelDirectory(path) => {
                            if let Some(model) = state
                                .repositories
                                .get(path)
                                .and_then(|models| models.get(name))
                            {
                                let id =
                                    identifier_for(&model.config, request.enable_namespacing);
                                snapshot.insert(id, model.clone());
                            }
                        }
                    }
                }
            }
        }

        let mut all_polled = true;
        let unreadable: Vec<ModelIdentifier> = snapshot
            .keys()
            .filter(|id| state.failing.contains(&id.name))
            .cloned()
            .collect();
        for id in unreadable {
            snapshot.remove(&id);
            all_polled = false;
        }

        let mut result = PollResult {
            conflicts,
            all_polled,
            ..Default::default()
        };
        for (id, model) in snapshot {
            let info = ModelInfo {
                model_config: model.config,
                explicitly_load: full_poll,
                mtime_ns: model.mtime_ns,
            };
            match request.prior.get(&id) {
                None => {
                    result.added.insert(id.clone());
                }
                Some(prior) if prior.mtime_ns != info.mtime_ns => {
                    result.modified.insert(id.clone());
                }
                Some(_) => {
                    result.unmodified.insert(id.clone());
                }
            }
            result.infos.insert(id, info);
        }
        if full_poll {
            for id in request.prior.keys() {
                if !result.infos.contains_key(id) && !state.failing.contains(&id.name) {
                    result.deleted.insert(id.clone());
                }
            }
        } else {
            for name in request.requested.keys() {
                for id in request.prior.keys().filter(|id| &id.name == name) {
                    if !result.infos.contains_key(id) {
                        result.deleted.insert(id.clone());
                    }
                }
            }
        }
        Ok(result)
    }
}

/// Everything the mock lifecycle did, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Load(ModelIdentifier, i64),
    Unload(ModelIdentifier),
}

#[derive(Debug, Default)]
struct MockLifecycleState {
    states: ModelStateMap,
    failing: BTreeSet<String>,
    events: Vec<LifecycleEvent>,
    inflight: BTreeSet<(String, i64, usize)>,
    stopped: bool,
}

/// In-memory stand-in for the model lifecycle, with a call log and failure
/// injection.
#[derive(Debug, Default)]
pub struct MockModelLifecycle {
    inner: Mutex<MockLifecycleState>,
}

struct MockModelHandle {
    id: ModelIdentifier,
    version: i64,
}

impl ModelHandle for MockModelHandle {
    fn id(&self) -> &ModelIdentifier {
        &self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

impl MockModelLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent load of this model name fail.
    pub fn fail_model(&self, name: impl Into<String>) {
        self.inner.lock().failing.insert(name.into());
    }

    pub fn clear_failure(&self, name: &str) {
        self.inner.lock().failing.remove(name);
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.inner.lock().events.clone()
    }

    pub fn load_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, LifecycleEvent::Load(id, _) if id.name == name))
            .count()
    }

    pub fn unload_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, LifecycleEvent::Unload(id) if id.name == name))
            .count()
    }

    pub fn stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    pub fn set_inflight(&self, name: impl Into<String>, version: i64, count: usize) {
        self.inner.lock().inflight.insert((name.into(), version, count));
    }
}

#[async_trait]
impl ModelLifecycle for MockModelLifecycle {
    async fn load(&self, id: &ModelIdentifier, version: i64, _config: &ModelConfig) -> Status {
        let mut state = self.inner.lock();
        state.events.push(LifecycleEvent::Load(id.clone(), version));
        if state.failing.contains(&id.name) {
            state.states.entry(id.clone()).or_default().insert(
                version,
                ModelVersionState::with_reason(
                    ModelReadyState::Unavailable,
                    "injected load failure",
                ),
            );
            return Err(Error::Internal(format!(
                "injected load failure for model '{id}'"
            )));
        }
        state
            .states
            .entry(id.clone())
            .or_default()
            .insert(version, ModelVersionState::new(ModelReadyState::Ready));
        Ok(())
    }

    async fn unload(&self, id: &ModelIdentifier) -> Status {
        let mut state = self.inner.lock();
        state.events.push(LifecycleEvent::Unload(id.clone()));
        if let Some(versions) = state.states.get_mut(id) {
            for version_state in versions.values_mut() {
                *version_state =
                    ModelVersionState::with_reason(ModelReadyState::Unavailable, "unloaded");
            }
        }
        Ok(())
    }

    fn loaded_versions(&self, id: &ModelIdentifier) -> BTreeSet<i64> {
        self.inner
            .lock()
            .states
            .get(id)
            .map(|versions| {
                versions
                    .iter()
                    .filter(|(_, vs)| vs.state == ModelReadyState::Ready)
                    .map(|(version, _)| *version)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn live_model_states(&self, strict_readiness: bool) -> ModelStateMap {
        self.inner
            .lock()
            .states
            .iter()
            .filter(|(_, versions)| {
                versions.values().any(|vs| {
                    if strict_readiness {
                        vs.state == ModelReadyState::Ready
                    } else {
                        matches!(
                            vs.state,
                            ModelReadyState::Ready
                                | ModelReadyState::Loading
                                | ModelReadyState::Unloading
                        )
                    }
                })
            })
            .map(|(id, versions)| (id.clone(), versions.clone()))
            .collect()
    }

    fn model_states(&self) -> ModelStateMap {
        self.inner.lock().states.clone()
    }

    fn version_states(&self, id: &ModelIdentifier) -> VersionStateMap {
        self.inner
            .lock()
            .states
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    fn model_state(
        &self,
        id: &ModelIdentifier,
        version: i64,
    ) -> Result<ModelReadyState, Error> {
        self.inner
            .lock()
            .states
            .get(id)
            .and_then(|versions| versions.get(&version))
            .map(|vs| vs.state)
            .ok_or_else(|| {
                Error::NotFound(format!("model '{id}' version {version} was never loaded"))
            })
    }

    fn get_model(
        &self,
        id: &ModelIdentifier,
        version: i64,
    ) -> Result<Arc<dyn ModelHandle>, Error> {
        let state = self.inner.lock();
        let version_state = state
            .states
            .get(id)
            .and_then(|versions| versions.get(&version))
            .ok_or_else(|| Error::NotFound(format!("model '{id}' version {version} is not found")))?;
        if version_state.state != ModelReadyState::Ready {
            return Err(Error::NotFound(format!(
                "model '{id}' version {version} is not available: {}",
                version_state.reason
            )));
        }
        Ok(Arc::new(MockModelHandle {
            id: id.clone(),
            version,
        }))
    }

    async fn stop_all(&self) {
        self.inner.lock().stopped = true;
    }

    fn inflight_status(&self) -> BTreeSet<(String, i64, usize)> {
        self.inner.lock().inflight.clone()
    }
}
