// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scheduling behavior of the repository manager against the mock
//! poller and lifecycle: dependency ordering, failure propagation, cascading
//! unloads and cross-namespace resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use model_repository::mocker::{LifecycleEvent, MockModelLifecycle, MockRepositoryPoller};
use model_repository::{
    ActionType, EnsembleConfig, EnsembleStep, Error, LoadParameter, ModelConfig, ModelIdentifier,
    ModelReadyState, ModelRepositoryManager, ModelRepositoryOptions, summarize,
};

const REPO: &str = "/models";
const SECOND_REPO: &str = "/more-models";

fn versioned(name: &str, versions: &[i64]) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        versions: versions.to_vec(),
        ..Default::default()
    }
}

fn plain(name: &str) -> ModelConfig {
    versioned(name, &[1])
}

fn ensemble(name: &str, upstreams: &[&str]) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        versions: vec![1],
        ensemble: Some(EnsembleConfig {
            steps: upstreams
                .iter()
                .map(|upstream| EnsembleStep {
                    model_namespace: None,
                    model_name: upstream.to_string(),
                    model_version: -1,
                })
                .collect(),
        }),
        ..Default::default()
    }
}

fn in_namespace(mut config: ModelConfig, namespace: &str) -> ModelConfig {
    config.namespace = Some(namespace.to_string());
    config
}

fn request(names: &[&str]) -> BTreeMap<String, Vec<LoadParameter>> {
    names
        .iter()
        .map(|name| (name.to_string(), Vec::new()))
        .collect()
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_position(events: &[LifecycleEvent], name: &str) -> Option<usize> {
    events
        .iter()
        .position(|event| matches!(event, LifecycleEvent::Load(id, _) if id.name == name))
}

async fn polling_manager(
    poller: &Arc<MockRepositoryPoller>,
    lifecycle: &Arc<MockModelLifecycle>,
) -> Arc<ModelRepositoryManager> {
    init_logging();
    let options = ModelRepositoryOptions::builder()
        .polling_enabled(true)
        .repository_paths(BTreeSet::from([PathBuf::from(REPO)]))
        .build()
        .unwrap();
    ModelRepositoryManager::create(options, poller.clone(), lifecycle.clone())
        .await
        .unwrap()
}

async fn namespaced_polling_manager(
    poller: &Arc<MockRepositoryPoller>,
    lifecycle: &Arc<MockModelLifecycle>,
) -> Arc<ModelRepositoryManager> {
    init_logging();
    let options = ModelRepositoryOptions::builder()
        .polling_enabled(true)
        .enable_model_namespacing(true)
        .repository_paths(BTreeSet::from([
            PathBuf::from(REPO),
            PathBuf::from(SECOND_REPO),
        ]))
        .build()
        .unwrap();
    ModelRepositoryManager::create(options, poller.clone(), lifecycle.clone())
        .await
        .unwrap()
}

async fn explicit_manager(
    poller: &Arc<MockRepositoryPoller>,
    lifecycle: &Arc<MockModelLifecycle>,
) -> Arc<ModelRepositoryManager> {
    init_logging();
    let options = ModelRepositoryOptions::builder()
        .model_control_enabled(true)
        .repository_paths(BTreeSet::from([PathBuf::from(REPO)]))
        .build()
        .unwrap();
    ModelRepositoryManager::create(options, poller.clone(), lifecycle.clone())
        .await
        .unwrap()
}

#[tokio::test]
async fn loads_a_single_model() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, versioned("resnet", &[1, 2]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["resnet"]), ActionType::Load, false)
        .await?;
    assert!(summarize(&statuses).is_ok());

    let events = lifecycle.events();
    let resnet = ModelIdentifier::local("resnet");
    assert!(events.contains(&LifecycleEvent::Load(resnet.clone(), 1)));
    assert!(events.contains(&LifecycleEvent::Load(resnet, 2)));
    assert_eq!(manager.model_state("resnet", 1)?, ModelReadyState::Ready);
    assert_eq!(manager.model_state("resnet", 2)?, ModelReadyState::Ready);
    Ok(())
}

#[tokio::test]
async fn load_of_unknown_model_is_not_found() {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    let manager = explicit_manager(&poller, &lifecycle).await;

    let result = manager
        .load_unload_model(&request(&["ghost"]), ActionType::Load, false)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn unload_of_unknown_model_is_not_found() {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    let manager = explicit_manager(&poller, &lifecycle).await;

    let result = manager
        .load_unload_model(&request(&["ghost"]), ActionType::Unload, false)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn ensemble_waits_for_missing_upstream_and_heals() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = polling_manager(&poller, &lifecycle).await;

    // The upstream does not exist: no load may be attempted for the
    // ensemble.
    assert_eq!(lifecycle.load_count("pipeline"), 0);

    poller.put_model(REPO, plain("encoder"));
    let statuses = manager.poll_and_update().await?;
    assert!(summarize(&statuses).is_ok());

    let events = lifecycle.events();
    let encoder = load_position(&events, "encoder").expect("encoder loaded");
    let pipeline = load_position(&events, "pipeline").expect("pipeline loaded");
    assert!(encoder < pipeline, "upstream must load first");
    assert_eq!(manager.model_state("encoder", 1)?, ModelReadyState::Ready);
    assert_eq!(manager.model_state("pipeline", 1)?, ModelReadyState::Ready);
    Ok(())
}

#[tokio::test]
async fn explicit_load_reports_missing_dependency() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    let pipeline = ModelIdentifier::local("pipeline");
    assert!(matches!(
        statuses.get(&pipeline),
        Some(Err(Error::DependencyFailed(_)))
    ));
    assert!(matches!(
        summarize(&statuses),
        Err(Error::DependencyFailed(_))
    ));
    assert_eq!(lifecycle.load_count("pipeline"), 0);
    Ok(())
}

#[tokio::test]
async fn explicit_load_pulls_in_composing_models() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    assert!(summarize(&statuses).is_ok());

    let events = lifecycle.events();
    let encoder = load_position(&events, "encoder").expect("encoder loaded");
    let pipeline = load_position(&events, "pipeline").expect("pipeline loaded");
    assert!(encoder < pipeline);
    Ok(())
}

#[tokio::test]
async fn modified_upstream_reloads_and_revalidates_downstream() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = polling_manager(&poller, &lifecycle).await;
    assert_eq!(lifecycle.load_count("encoder"), 1);
    assert_eq!(lifecycle.load_count("pipeline"), 1);

    poller.touch_model("encoder");
    let statuses = manager.poll_and_update().await?;
    assert!(summarize(&statuses).is_ok());

    // The modified upstream is reloaded; the unchanged ensemble is
    // re-validated without a reload.
    assert_eq!(lifecycle.load_count("encoder"), 2);
    assert_eq!(lifecycle.load_count("pipeline"), 1);
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("pipeline")),
        Some(Ok(()))
    ));
    assert_eq!(manager.model_state("pipeline", 1)?, ModelReadyState::Ready);
    Ok(())
}

#[tokio::test]
async fn dependency_cycle_fails_both_models() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, ensemble("alpha", &["beta"]));
    poller.put_model(REPO, ensemble("beta", &["alpha"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["alpha", "beta"]), ActionType::Load, false)
        .await?;
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("alpha")),
        Some(Err(Error::Cycle(_)))
    ));
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("beta")),
        Some(Err(Error::Cycle(_)))
    ));
    assert!(matches!(summarize(&statuses), Err(Error::Cycle(_))));
    assert_eq!(lifecycle.load_count("alpha"), 0);
    assert_eq!(lifecycle.load_count("beta"), 0);
    Ok(())
}

#[tokio::test]
async fn cascading_unload_removes_dependency_only_models() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    assert_eq!(manager.model_state("encoder", 1)?, ModelReadyState::Ready);

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Unload, true)
        .await?;
    assert!(summarize(&statuses).is_ok());
    assert_eq!(lifecycle.unload_count("pipeline"), 1);
    assert_eq!(lifecycle.unload_count("encoder"), 1);
    assert!(manager.get_model("pipeline", 1).is_err());
    assert!(manager.get_model("encoder", 1).is_err());
    Ok(())
}

#[tokio::test]
async fn unload_without_cascade_keeps_dependencies() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Unload, false)
        .await?;

    assert_eq!(lifecycle.unload_count("pipeline"), 1);
    assert_eq!(lifecycle.unload_count("encoder"), 0);
    assert_eq!(manager.model_state("encoder", 1)?, ModelReadyState::Ready);
    Ok(())
}

#[tokio::test]
async fn fuzzy_cross_namespace_resolution_then_ambiguation() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, in_namespace(ensemble("pipeline", &["encoder"]), "ns1"));
    poller.put_model(REPO, in_namespace(plain("encoder"), "ns2"));
    let manager = namespaced_polling_manager(&poller, &lifecycle).await;

    // The bare reference resolves across namespaces while the name is
    // globally unique.
    let events = lifecycle.events();
    let encoder = load_position(&events, "encoder").expect("encoder loaded");
    let pipeline = load_position(&events, "pipeline").expect("pipeline loaded");
    assert!(encoder < pipeline);
    assert_eq!(manager.model_state("pipeline", 1)?, ModelReadyState::Ready);

    // A second encoder makes the reference ambiguous: the ensemble loses its
    // upstream and is unloaded.
    poller.put_model(SECOND_REPO, in_namespace(plain("encoder"), "ns3"));
    let statuses = manager.poll_and_update().await?;
    let pipeline_id = ModelIdentifier::new("ns1", "pipeline");
    assert!(matches!(
        statuses.get(&pipeline_id),
        Some(Err(Error::DependencyFailed(_)))
    ));
    assert_eq!(lifecycle.unload_count("pipeline"), 1);
    Ok(())
}

#[tokio::test]
async fn repeated_load_with_identical_config_is_a_noop() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("resnet"));
    let manager = explicit_manager(&poller, &lifecycle).await;

    manager
        .load_unload_model(&request(&["resnet"]), ActionType::Load, false)
        .await?;
    let statuses = manager
        .load_unload_model(&request(&["resnet"]), ActionType::Load, false)
        .await?;

    assert!(matches!(
        statuses.get(&ModelIdentifier::local("resnet")),
        Some(Ok(()))
    ));
    assert_eq!(lifecycle.load_count("resnet"), 1);
    assert_eq!(lifecycle.unload_count("resnet"), 0);
    Ok(())
}

#[tokio::test]
async fn quiescent_poll_changes_nothing() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("resnet"));
    let manager = polling_manager(&poller, &lifecycle).await;
    assert_eq!(lifecycle.load_count("resnet"), 1);

    let statuses = manager.poll_and_update().await?;
    assert!(statuses.is_empty());
    assert_eq!(lifecycle.load_count("resnet"), 1);
    assert_eq!(lifecycle.unload_count("resnet"), 0);
    Ok(())
}

#[tokio::test]
async fn failed_upstream_load_fails_dependents() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    lifecycle.fail_model("encoder");
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("encoder")),
        Some(Err(Error::Internal(_)))
    ));
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("pipeline")),
        Some(Err(Error::DependencyFailed(_)))
    ));
    assert_eq!(lifecycle.load_count("pipeline"), 0);
    Ok(())
}

#[tokio::test]
async fn unsatisfied_version_requirement_fails_dependent() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    let mut config = ensemble("pipeline", &["encoder"]);
    if let Some(steps) = config.ensemble.as_mut() {
        steps.steps[0].model_version = 2;
    }
    poller.put_model(REPO, config);
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("pipeline")),
        Some(Err(Error::DependencyFailed(_)))
    ));
    assert_eq!(lifecycle.load_count("encoder"), 1);
    assert_eq!(lifecycle.load_count("pipeline"), 0);
    Ok(())
}

#[tokio::test]
async fn deleted_model_is_unloaded_on_poll() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("resnet"));
    let manager = polling_manager(&poller, &lifecycle).await;
    assert_eq!(lifecycle.load_count("resnet"), 1);

    poller.remove_model(std::path::Path::new(REPO), "resnet");
    let statuses = manager.poll_and_update().await?;
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("resnet")),
        Some(Ok(()))
    ));
    assert_eq!(lifecycle.unload_count("resnet"), 1);
    assert!(manager.get_model("resnet", 1).is_err());
    Ok(())
}

#[tokio::test]
async fn unreadable_model_retains_prior_state() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("resnet"));
    let manager = polling_manager(&poller, &lifecycle).await;

    poller.touch_model("resnet");
    poller.fail_model("resnet");
    assert!(matches!(
        manager.poll_and_update().await,
        Err(Error::Internal(_))
    ));
    // The unreadable model keeps serving its previous state.
    assert_eq!(manager.model_state("resnet", 1)?, ModelReadyState::Ready);
    assert_eq!(lifecycle.unload_count("resnet"), 0);

    poller.clear_failure("resnet");
    let statuses = manager.poll_and_update().await?;
    assert!(summarize(&statuses).is_ok());
    assert_eq!(lifecycle.load_count("resnet"), 2);
    Ok(())
}

#[tokio::test]
async fn failed_model_recovers_after_reload() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    poller.put_model(REPO, plain("encoder"));
    poller.put_model(REPO, ensemble("pipeline", &["encoder"]));
    lifecycle.fail_model("encoder");
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["pipeline"]), ActionType::Load, false)
        .await?;
    assert!(summarize(&statuses).is_err());

    lifecycle.clear_failure("encoder");
    let statuses = manager
        .load_unload_model(&request(&["pipeline", "encoder"]), ActionType::Load, false)
        .await?;
    assert!(summarize(&statuses).is_ok());
    assert_eq!(manager.model_state("pipeline", 1)?, ModelReadyState::Ready);
    assert_eq!(manager.model_state("encoder", 1)?, ModelReadyState::Ready);
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_is_reported_per_model() -> Result<()> {
    let poller = Arc::new(MockRepositoryPoller::new());
    let lifecycle = Arc::new(MockModelLifecycle::new());
    // An ensemble containing itself as a step is rejected by validation.
    poller.put_model(REPO, ensemble("recursive", &["recursive"]));
    let manager = explicit_manager(&poller, &lifecycle).await;

    let statuses = manager
        .load_unload_model(&request(&["recursive"]), ActionType::Load, false)
        .await?;
    assert!(matches!(
        statuses.get(&ModelIdentifier::local("recursive")),
        Some(Err(Error::ConfigInvalid(_))) | Some(Err(Error::Cycle(_)))
    ));
    assert_eq!(lifecycle.load_count("recursive"), 0);
    Ok(())
}
