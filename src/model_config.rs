// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Parsed model configuration, the payload carried by every poll snapshot.
//!
//! For an ensemble the configuration also declares the composing models; the
//! dependency graph resolves those references into edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Error;

/// Version marker meaning "whichever version of the composing model is
/// available" in an ensemble step.
pub const ANY_VERSION: i64 = -1;

fn default_step_version() -> i64 {
    ANY_VERSION
}

/// One composing-model reference inside an ensemble configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleStep {
    /// Namespace of the composing model. Absent means "same namespace as the
    /// ensemble, falling back to a fuzzy match when namespacing is enabled".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_namespace: Option<String>,
    pub model_name: String,
    /// `-1` accepts any loaded version of the composing model.
    #[serde(default = "default_step_version")]
    pub model_version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub steps: Vec<EnsembleStep>,
}

/// An upstream reference extracted from an ensemble configuration. An empty
/// `required_versions` set is satisfied by any loaded version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReference {
    pub namespace: Option<String>,
    pub name: String,
    pub required_versions: BTreeSet<i64>,
}

/// Parsed model configuration as produced by the repository poller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ModelConfig {
    pub name: String,

    /// Namespace the model belongs to. Only meaningful when model namespacing
    /// is enabled; the poller keys everything by the global namespace
    /// otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default)]
    pub platform: String,

    #[serde(default)]
    #[validate(range(min = 0))]
    pub max_batch_size: i32,

    /// Versions available to serve, as discovered by the poller.
    #[serde(default)]
    pub versions: Vec<i64>,

    /// Minimum GPU compute capability the model's instances require, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_compute_capability: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleConfig>,
}

impl ModelConfig {
    /// Parse a configuration from its JSON representation, the format the
    /// control API supplies for config-override load parameters.
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload)
            .map_err(|e| Error::ConfigInvalid(format!("malformed model configuration: {e}")))
    }

    pub fn is_ensemble(&self) -> bool {
        self.ensemble.is_some()
    }

    /// The upstream references this configuration declares, merged per
    /// referenced model. Steps accepting any version contribute nothing to
    /// the required set.
    pub fn upstream_references(&self) -> Vec<UpstreamReference> {
        let Some(ensemble) = &self.ensemble else {
            return Vec::new();
        };
        let mut merged: BTreeMap<(Option<String>, String), BTreeSet<i64>> = BTreeMap::new();
        for step in &ensemble.steps {
            let key = (step.model_namespace.clone(), step.model_name.clone());
            let versions = merged.entry(key).or_default();
            if step.model_version != ANY_VERSION {
                versions.insert(step.model_version);
            }
        }
        merged
            .into_iter()
            .map(|((namespace, name), required_versions)| UpstreamReference {
                namespace,
                name,
                required_versions,
            })
            .collect()
    }

    /// Validate the configuration against the server's constraints. Failures
    /// are reported as `CONFIG_INVALID` and recorded on the owning node; they
    /// never abort the surrounding operation.
    pub fn check(&self, min_compute_capability: f64) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::ConfigInvalid(
                "model configuration must specify a name".to_string(),
            ));
        }
        Validate::validate(self)
            .map_err(|e| Error::ConfigInvalid(format!("model '{}': {e}", self.name)))?;
        if let Some(required) = self.required_compute_capability {
            if required < min_compute_capability {
                return Err(Error::ConfigInvalid(format!(
                    "model '{}' requires compute capability {required} below the supported minimum {min_compute_capability}",
                    self.name
                )));
            }
        }
        if let Some(ensemble) = &self.ensemble {
            if ensemble.steps.is_empty() {
                return Err(Error::ConfigInvalid(format!(
                    "ensemble '{}' must specify at least one step",
                    self.name
                )));
            }
            for step in &ensemble.steps {
                if step.model_name.is_empty() {
                    return Err(Error::ConfigInvalid(format!(
                        "ensemble '{}' contains a step without a model name",
                        self.name
                    )));
                }
                if step.model_name == self.name && step.model_namespace == self.namespace {
                    return Err(Error::ConfigInvalid(format!(
                        "ensemble '{}' cannot contain itself as a step",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensemble(name: &str, steps: &[(&str, i64)]) -> ModelConfig {
        ModelConfig {
            name: name.to_string(),
            ensemble: Some(EnsembleConfig {
                steps: steps
                    .iter()
                    .map(|(n, v)| EnsembleStep {
                        model_namespace: None,
                        model_name: n.to_string(),
                        model_version: *v,
                    })
                    .collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn upstream_references_merge_per_model() {
        let config = ensemble("e", &[("m", 1), ("m", 2), ("n", ANY_VERSION)]);
        let refs = config.upstream_references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "m");
        assert_eq!(
            refs[0].required_versions,
            BTreeSet::from([1, 2])
        );
        assert_eq!(refs[1].name, "n");
        assert!(refs[1].required_versions.is_empty());
    }

    #[test]
    fn check_rejects_self_reference() {
        let config = ensemble("e", &[("e", 1)]);
        assert!(matches!(config.check(0.0), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn check_rejects_empty_ensemble() {
        let config = ensemble("e", &[]);
        assert!(matches!(config.check(0.0), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn check_rejects_low_compute_capability() {
        let config = ModelConfig {
            name: "m".to_string(),
            required_compute_capability: Some(5.0),
            ..Default::default()
        };
        assert!(matches!(config.check(6.0), Err(Error::ConfigInvalid(_))));
        assert!(ModelConfig {
            required_compute_capability: Some(7.5),
            ..config
        }
        .check(6.0)
        .is_ok());
    }

    #[test]
    fn from_json_round_trips_ensemble_steps() {
        let config = ModelConfig::from_json(
            r#"{
                "name": "pipeline",
                "versions": [1],
                "ensemble": {"steps": [{"model_name": "preprocess"}]}
            }"#,
        )
        .unwrap();
        assert!(config.is_ensemble());
        assert_eq!(
            config.ensemble.unwrap().steps[0].model_version,
            ANY_VERSION
        );
    }
}
