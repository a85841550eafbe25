// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The dependency graph over the models known to the repository manager.
//!
//! Nodes are owned by the graph and keyed by [`ModelIdentifier`]; edges are
//! identifier references, never pointers, so removal can never dangle. An
//! ensemble's upstream references that cannot be resolved yet are parked in
//! `missing_index` and heal automatically when a model with that name
//! appears.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, ModelStatusMap, Status};
use crate::identifier::ModelIdentifier;
use crate::model_config::ModelConfig;
use crate::repository::ModelInfoMap;

/// A vertex in the dependency graph, one per model seen by the manager.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub model_id: ModelIdentifier,
    pub model_config: ModelConfig,
    /// Sticky flag: models loaded by name from the control API (or discovered
    /// by a full-repository poll) are not eligible for cascading unload.
    pub explicitly_load: bool,
    pub status: Status,
    /// True once the scheduler has validated the node since the last change
    /// to it or to any of its upstreams.
    pub checked: bool,
    /// Freshness marker of the snapshot this node was built from.
    pub mtime_ns: u64,
    /// True when the model's definition changed and the loaded versions must
    /// be replaced even if the version set is unchanged. Cleared once the
    /// scheduler issues the loads.
    pub reload_pending: bool,
    pub loaded_versions: BTreeSet<i64>,
    /// Upstream model -> versions this node requires of it. An empty version
    /// set is satisfied by any loaded version.
    pub upstreams: BTreeMap<ModelIdentifier, BTreeSet<i64>>,
    pub downstreams: BTreeSet<ModelIdentifier>,
    /// Upstream names that did not resolve at the last connect.
    pub missing_upstreams: BTreeSet<String>,
    /// Upstream names that resolved across namespaces.
    pub fuzzy_matched_upstreams: BTreeSet<String>,
}

impl DependencyNode {
    fn new(
        model_id: ModelIdentifier,
        model_config: ModelConfig,
        explicitly_load: bool,
        mtime_ns: u64,
    ) -> Self {
        Self {
            model_id,
            model_config,
            explicitly_load,
            status: Ok(()),
            checked: false,
            mtime_ns,
            reload_pending: false,
            loaded_versions: BTreeSet::new(),
            upstreams: BTreeMap::new(),
            downstreams: BTreeSet::new(),
            missing_upstreams: BTreeSet::new(),
            fuzzy_matched_upstreams: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    enable_namespacing: bool,
    nodes: BTreeMap<ModelIdentifier, DependencyNode>,
    /// name -> identifiers sharing that name, for fuzzy lookup.
    by_name: BTreeMap<String, BTreeSet<ModelIdentifier>>,
    /// name -> nodes waiting for a model with that name to appear.
    missing_index: BTreeMap<String, BTreeSet<ModelIdentifier>>,
}

impl DependencyGraph {
    pub fn new(enable_namespacing: bool) -> Self {
        Self {
            enable_namespacing,
            ..Default::default()
        }
    }

    pub fn node(&self, id: &ModelIdentifier) -> Option<&DependencyNode> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &ModelIdentifier) -> Option<&mut DependencyNode> {
        self.nodes.get_mut(id)
    }

    pub fn contains_node(&self, id: &ModelIdentifier) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn unchecked_ids(&self) -> BTreeSet<ModelIdentifier> {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.checked)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Names some node depends on that have no matching model yet.
    pub fn missing_names(&self) -> BTreeSet<String> {
        self.missing_index.keys().cloned().collect()
    }

    /// Current failure status of every failed node. Nodes that fail during
    /// graph construction (e.g. cycle members) never enter the scheduler
    /// frontier, so write operations merge this into their result map.
    pub fn failed_states(&self) -> ModelStatusMap {
        self.nodes
            .iter()
            .filter(|(_, node)| node.status.is_err())
            .map(|(id, node)| (id.clone(), node.status.clone()))
            .collect()
    }

    /// Add fresh nodes for `ids`, waking any nodes that were waiting on their
    /// names. Upstream edges of the added nodes themselves are not connected
    /// here; the caller runs [`Self::connect_upstreams`] over the returned
    /// set.
    pub fn add_nodes(
        &mut self,
        ids: &BTreeSet<ModelIdentifier>,
        infos: &ModelInfoMap,
    ) -> BTreeSet<ModelIdentifier> {
        let mut affected = BTreeSet::new();
        for id in ids {
            let Some(info) = infos.get(id) else {
                tracing::warn!(model = %id, "no model info for added node, skipping");
                continue;
            };
            self.nodes.insert(
                id.clone(),
                DependencyNode::new(
                    id.clone(),
                    info.model_config.clone(),
                    info.explicitly_load,
                    info.mtime_ns,
                ),
            );
            self.by_name
                .entry(id.name.clone())
                .or_default()
                .insert(id.clone());
            affected.insert(id.clone());

            // Wake nodes waiting on this name. Nodes bound to this name by a
            // fuzzy match must also re-resolve: the new entry may have made
            // the name ambiguous.
            let mut wake: BTreeSet<ModelIdentifier> = self
                .missing_index
                .get(&id.name)
                .cloned()
                .unwrap_or_default();
            wake.extend(self.fuzzy_dependents(&id.name));
            for waiter in wake {
                if waiter == *id {
                    continue;
                }
                self.uncheck_downstream([waiter.clone()]);
                affected.insert(waiter);
            }
        }
        affected
    }

    /// Refresh `ids` from the latest poll. All upstream edges of each updated
    /// node are dropped for re-resolution; downstreams are unchecked so the
    /// scheduler re-validates them.
    pub fn update_nodes(
        &mut self,
        ids: &BTreeSet<ModelIdentifier>,
        infos: &ModelInfoMap,
    ) -> BTreeSet<ModelIdentifier> {
        let mut updated = BTreeSet::new();
        for id in ids {
            if !self.nodes.contains_key(id) {
                continue;
            }
            let Some(info) = infos.get(id) else {
                tracing::warn!(model = %id, "no model info for updated node, skipping");
                continue;
            };
            let downstreams = self
                .nodes
                .get(id)
                .map(|node| node.downstreams.clone())
                .unwrap_or_default();
            self.uncheck_downstream(downstreams);
            self.disconnect_upstreams(id);
            if let Some(node) = self.nodes.get_mut(id) {
                let changed = node.mtime_ns != info.mtime_ns
                    || node.model_config != info.model_config;
                node.model_config = info.model_config.clone();
                node.explicitly_load = info.explicitly_load;
                node.mtime_ns = info.mtime_ns;
                if changed {
                    node.reload_pending = true;
                }
                node.checked = false;
                node.status = Ok(());
                updated.insert(id.clone());
            }
        }
        updated
    }

    /// Remove `ids` and, when `cascading`, any upstream left with no
    /// downstreams that was not explicitly loaded. Returns the surviving
    /// nodes needing re-evaluation and everything removed.
    pub fn remove_nodes(
        &mut self,
        ids: &BTreeSet<ModelIdentifier>,
        cascading: bool,
    ) -> (BTreeSet<ModelIdentifier>, BTreeSet<ModelIdentifier>) {
        let mut all_affected = BTreeSet::new();
        let mut all_removed = BTreeSet::new();
        let mut frontier = ids.clone();
        while !frontier.is_empty() {
            let mut next = BTreeSet::new();
            for id in &frontier {
                let (upstreams, downstreams) = self.remove_node(id);

                if cascading {
                    for uid in &upstreams {
                        if let Some(upstream) = self.nodes.get(uid) {
                            if upstream.downstreams.is_empty() && !upstream.explicitly_load {
                                next.insert(uid.clone());
                            }
                        }
                    }
                }

                all_affected.extend(downstreams);

                // Nodes still waiting on this name may resolve differently
                // now that by_name changed.
                let waiters: Vec<ModelIdentifier> = self
                    .missing_index
                    .get(&id.name)
                    .map(|waiters| waiters.iter().cloned().collect())
                    .unwrap_or_default();
                for waiter in waiters {
                    self.uncheck_downstream([waiter.clone()]);
                    all_affected.insert(waiter);
                }

                all_removed.insert(id.clone());
            }
            frontier = next;
        }
        for id in &all_removed {
            all_affected.remove(id);
        }
        (all_affected, all_removed)
    }

    /// Remove one node and every reference to it. Returns the identifiers of
    /// its former upstreams (cascading-removal candidates) and downstreams
    /// (re-evaluation candidates). No-op if the node is already gone.
    pub fn remove_node(
        &mut self,
        id: &ModelIdentifier,
    ) -> (BTreeSet<ModelIdentifier>, BTreeSet<ModelIdentifier>) {
        let Some(node) = self.nodes.get(id) else {
            return (BTreeSet::new(), BTreeSet::new());
        };
        let upstream_ids: BTreeSet<ModelIdentifier> = node.upstreams.keys().cloned().collect();
        let downstream_ids = node.downstreams.clone();
        let missing: Vec<String> = node.missing_upstreams.iter().cloned().collect();

        for uid in &upstream_ids {
            if let Some(upstream) = self.nodes.get_mut(uid) {
                upstream.downstreams.remove(id);
            }
        }
        self.uncheck_downstream(downstream_ids.iter().cloned());
        for did in &downstream_ids {
            if let Some(downstream) = self.nodes.get_mut(did) {
                downstream.upstreams.remove(id);
            }
        }
        for name in missing {
            self.remove_missing_entry(&name, id);
        }
        self.nodes.remove(id);
        if let Some(siblings) = self.by_name.get_mut(&id.name) {
            siblings.remove(id);
            if siblings.is_empty() {
                self.by_name.remove(&id.name);
            }
        }
        (upstream_ids, downstream_ids)
    }

    /// Exact lookup, falling back to a cross-namespace match when allowed and
    /// the name is globally unique.
    pub fn resolve(
        &self,
        id: &ModelIdentifier,
        allow_fuzzy: bool,
    ) -> Option<ModelIdentifier> {
        if self.nodes.contains_key(id) {
            return Some(id.clone());
        }
        if allow_fuzzy {
            if let Some(candidates) = self.by_name.get(&id.name) {
                if candidates.len() == 1 {
                    return candidates.iter().next().cloned();
                }
            }
        }
        None
    }

    pub fn find_node(
        &self,
        id: &ModelIdentifier,
        allow_fuzzy: bool,
    ) -> Option<&DependencyNode> {
        self.resolve(id, allow_fuzzy)
            .and_then(|resolved| self.nodes.get(&resolved))
    }

    /// Clear `checked` on every checked node reachable through downstream
    /// edges from `seeds` (the seeds included). The flag itself bounds the
    /// traversal, so this is safe even on a malformed cyclic graph.
    pub fn uncheck_downstream(&mut self, seeds: impl IntoIterator<Item = ModelIdentifier>) {
        let mut stack: Vec<ModelIdentifier> = seeds.into_iter().collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&id) {
                if node.checked {
                    node.checked = false;
                    node.status = Ok(());
                    stack.extend(node.downstreams.iter().cloned());
                }
            }
        }
    }

    /// Re-resolve the node's declared upstream references from its current
    /// config, replacing whatever edges it had. Unresolved names are parked
    /// in the missing index. Returns true iff the config declares at least
    /// one upstream.
    pub fn connect_upstreams(&mut self, id: &ModelIdentifier) -> bool {
        self.disconnect_upstreams(id);
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let references = node.model_config.upstream_references();
        if references.is_empty() {
            return false;
        }
        let own_namespace = id.namespace.clone();

        struct Resolution {
            name: String,
            required: BTreeSet<i64>,
            target: Option<(ModelIdentifier, bool)>,
        }

        // Resolution only reads the graph; collect first, then wire up.
        let mut resolutions = Vec::with_capacity(references.len());
        for reference in references {
            let namespace = reference.namespace.clone().filter(|ns| !ns.is_empty());
            let allow_fuzzy = self.enable_namespacing && namespace.is_none();
            let lookup = ModelIdentifier::new(
                namespace.unwrap_or_else(|| own_namespace.clone()),
                reference.name.clone(),
            );
            let target = self
                .resolve(&lookup, allow_fuzzy)
                .map(|resolved| {
                    let fuzzy = resolved != lookup;
                    (resolved, fuzzy)
                });
            resolutions.push(Resolution {
                name: reference.name,
                required: reference.required_versions,
                target,
            });
        }

        for resolution in resolutions {
            match resolution.target {
                Some((uid, fuzzy)) => {
                    if let Some(upstream) = self.nodes.get_mut(&uid) {
                        upstream.downstreams.insert(id.clone());
                    }
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.upstreams
                            .entry(uid)
                            .or_default()
                            .extend(resolution.required);
                        if fuzzy {
                            node.fuzzy_matched_upstreams.insert(resolution.name);
                        }
                    }
                }
                None => {
                    tracing::debug!(
                        model = %id,
                        upstream = %resolution.name,
                        "upstream model not present, deferring edge"
                    );
                    if let Some(node) = self.nodes.get_mut(id) {
                        node.missing_upstreams.insert(resolution.name.clone());
                    }
                    self.missing_index
                        .entry(resolution.name)
                        .or_default()
                        .insert(id.clone());
                }
            }
        }
        true
    }

    /// Fail the node if it can reach itself through downstream edges. Must
    /// run after [`Self::connect_upstreams`] for every newly connected node;
    /// the offender is marked checked so the scheduler never issues it.
    pub fn circularity_check(&mut self, start: &ModelIdentifier) -> Status {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<ModelIdentifier> = self
            .nodes
            .get(start)
            .map(|node| node.downstreams.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if id == *start {
                let err = Error::Cycle(format!(
                    "circular dependency involving model '{start}'"
                ));
                if let Some(node) = self.nodes.get_mut(start) {
                    node.status = Err(err.clone());
                    node.checked = true;
                }
                return Err(err);
            }
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.downstreams.iter().cloned());
            }
        }
        Ok(())
    }

    /// Scheduler readiness probe. Returns true when the node can be acted on
    /// this iteration: either every upstream is checked, loaded and healthy,
    /// or the node is already known to be invalid (in which case its status
    /// carries the failure to record). Returns false while some upstream is
    /// still unchecked.
    pub(crate) fn check_node(&mut self, id: &ModelIdentifier) -> bool {
        enum Outcome {
            Blocked,
            Ready,
            Failed(Error),
        }

        let outcome = {
            let Some(node) = self.nodes.get(id) else {
                return false;
            };
            if node.status.is_err() {
                Outcome::Ready
            } else if !node.missing_upstreams.is_empty() {
                let missing: Vec<String> = node.missing_upstreams.iter().cloned().collect();
                Outcome::Failed(Error::DependencyFailed(format!(
                    "model '{}' depends on missing model(s): {}",
                    id,
                    missing.join(", ")
                )))
            } else {
                let mut outcome = Outcome::Ready;
                for (uid, required) in &node.upstreams {
                    let Some(upstream) = self.nodes.get(uid) else {
                        outcome = Outcome::Failed(Error::Internal(format!(
                            "upstream '{uid}' of model '{id}' is not in the dependency graph"
                        )));
                        break;
                    };
                    if !upstream.checked {
                        outcome = Outcome::Blocked;
                        break;
                    }
                    if let Err(e) = &upstream.status {
                        outcome = Outcome::Failed(Error::DependencyFailed(format!(
                            "upstream '{uid}' failed to load: {e}"
                        )));
                        break;
                    }
                    let satisfied = if required.is_empty() {
                        !upstream.loaded_versions.is_empty()
                    } else {
                        required
                            .intersection(&upstream.loaded_versions)
                            .next()
                            .is_some()
                    };
                    if !satisfied {
                        outcome = Outcome::Failed(Error::DependencyFailed(format!(
                            "required versions of upstream '{uid}' are not loaded"
                        )));
                        break;
                    }
                }
                outcome
            }
        };

        match outcome {
            Outcome::Blocked => false,
            Outcome::Ready => true,
            Outcome::Failed(e) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.status = Err(e);
                }
                true
            }
        }
    }

    /// Drop all upstream edges of the node along with its missing-name and
    /// fuzzy bookkeeping, leaving it ready for re-resolution.
    fn disconnect_upstreams(&mut self, id: &ModelIdentifier) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let upstream_ids: Vec<ModelIdentifier> = node.upstreams.keys().cloned().collect();
        let missing: Vec<String> = node.missing_upstreams.iter().cloned().collect();
        node.upstreams.clear();
        node.missing_upstreams.clear();
        node.fuzzy_matched_upstreams.clear();

        for uid in upstream_ids {
            if let Some(upstream) = self.nodes.get_mut(&uid) {
                upstream.downstreams.remove(id);
            }
        }
        for name in missing {
            self.remove_missing_entry(&name, id);
        }
    }

    fn remove_missing_entry(&mut self, name: &str, id: &ModelIdentifier) {
        if let Some(waiters) = self.missing_index.get_mut(name) {
            waiters.remove(id);
            if waiters.is_empty() {
                self.missing_index.remove(name);
            }
        }
    }

    fn fuzzy_dependents(&self, name: &str) -> BTreeSet<ModelIdentifier> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.fuzzy_matched_upstreams.contains(name))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
