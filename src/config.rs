// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::path::PathBuf;

use derive_builder::Builder;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Error;

/// Construction-time options of the repository manager, immutable once the
/// manager exists.
///
/// Set these at runtime with `MODEL_REPO_`-prefixed environment variables,
/// e.g. `MODEL_REPO_POLLING_ENABLED=true`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Builder)]
#[builder(default)]
pub struct ModelRepositoryOptions {
    /// Repositories scanned by the poller. More can be registered later when
    /// model control is enabled.
    pub repository_paths: BTreeSet<PathBuf>,

    /// Models loaded at startup when model control is enabled; ignored
    /// otherwise (everything found on disk is loaded).
    pub startup_models: BTreeSet<String>,

    /// When false the poller may autofill missing configuration fields.
    pub strict_model_config: bool,

    /// Allows `poll_and_update`. Mutually exclusive with
    /// `model_control_enabled`.
    pub polling_enabled: bool,

    /// Allows `load_unload_model` and repository registration.
    pub model_control_enabled: bool,

    /// Key models by `(namespace, name)` and resolve unambiguous upstream
    /// references across namespaces.
    pub enable_model_namespacing: bool,

    /// Minimum GPU compute capability supported by this server, passed
    /// through to model configuration validation.
    #[validate(range(min = 0.0))]
    pub min_compute_capability: f64,
}

impl Default for ModelRepositoryOptions {
    fn default() -> Self {
        Self {
            repository_paths: BTreeSet::new(),
            startup_models: BTreeSet::new(),
            strict_model_config: true,
            polling_enabled: false,
            model_control_enabled: false,
            enable_model_namespacing: false,
            min_compute_capability: 0.0,
        }
    }
}

impl ModelRepositoryOptions {
    pub fn builder() -> ModelRepositoryOptionsBuilder {
        ModelRepositoryOptionsBuilder::default()
    }

    /// Instantiates and reads options from environment variables.
    /// Panics on invalid configuration.
    pub fn from_settings() -> Self {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("MODEL_REPO_"))
            .extract()
            .unwrap() // safety: called on startup, so panic is reasonable
    }

    pub fn check(&self) -> Result<(), Error> {
        Validate::validate(self).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        if self.polling_enabled && self.model_control_enabled {
            return Err(Error::InvalidArgument(
                "repository polling and explicit model control cannot be enabled together"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_check() {
        assert!(ModelRepositoryOptions::default().check().is_ok());
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let options = ModelRepositoryOptions::builder()
            .polling_enabled(true)
            .model_control_enabled(true)
            .build()
            .unwrap();
        assert!(matches!(
            options.check(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn from_settings_falls_back_to_defaults() {
        let options = ModelRepositoryOptions::from_settings();
        assert!(!options.polling_enabled);
        assert!(!options.model_control_enabled);
        assert!(options.repository_paths.is_empty());
    }

    #[test]
    fn builder_fills_defaults() {
        let options = ModelRepositoryOptions::builder()
            .model_control_enabled(true)
            .build()
            .unwrap();
        assert!(options.strict_model_config);
        assert_eq!(options.min_compute_capability, 0.0);
    }
}
