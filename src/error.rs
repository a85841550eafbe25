// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use crate::identifier::ModelIdentifier;

/// Error kinds surfaced by the repository manager and its collaborators.
///
/// Per-model failures are recorded on the owning dependency node and reported
/// through [`ModelStatusMap`]; none of them are fatal to the manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid model configuration: {0}")]
    ConfigInvalid(String),

    #[error("dependency cycle: {0}")]
    Cycle(String),

    #[error("dependency failed: {0}")]
    DependencyFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable kind label, used as a structured logging field.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "INVALID_ARG",
            Error::NotFound(_) => "NOT_FOUND",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::Unsupported(_) => "UNSUPPORTED",
            Error::ConfigInvalid(_) => "CONFIG_INVALID",
            Error::Cycle(_) => "CYCLE_ERROR",
            Error::DependencyFailed(_) => "DEPENDENCY_FAILED",
            Error::Internal(_) => "INTERNAL",
        }
    }
}

/// Outcome of a single validation / load / unload step.
pub type Status = Result<(), Error>;

/// Per-model outcome of a write operation.
pub type ModelStatusMap = BTreeMap<ModelIdentifier, Status>;

/// Fold a per-model status map into one overall status: the first failure in
/// identifier order wins, an empty map is success.
pub fn summarize(statuses: &ModelStatusMap) -> Status {
    for status in statuses.values() {
        if let Err(e) = status {
            return Err(e.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(Error::NotFound(String::new()).kind_str(), "NOT_FOUND");
        assert_eq!(Error::Cycle(String::new()).kind_str(), "CYCLE_ERROR");
        assert_eq!(
            Error::DependencyFailed(String::new()).kind_str(),
            "DEPENDENCY_FAILED"
        );
    }

    #[test]
    fn summarize_reports_first_failure() {
        let mut statuses = ModelStatusMap::new();
        statuses.insert(ModelIdentifier::local("a"), Ok(()));
        statuses.insert(
            ModelIdentifier::local("b"),
            Err(Error::Cycle("b -> b".to_string())),
        );
        statuses.insert(ModelIdentifier::local("c"), Ok(()));
        assert_eq!(summarize(&statuses), Err(Error::Cycle("b -> b".to_string())));
        assert_eq!(summarize(&ModelStatusMap::new()), Ok(()));
    }
}
