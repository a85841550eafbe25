// SPDX-FileCopyrightText: Copyright (c) 2024-2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use serde::{Deserialize, Serialize};

/// The namespace models belong to when model namespacing is disabled.
pub const GLOBAL_NAMESPACE: &str = "";

pub fn is_global_namespace(namespace: &str) -> bool {
    namespace.is_empty()
}

/// Identity of a model known to the repository manager.
///
/// Equality is structural over both fields. The bare `name` is what ensemble
/// configurations reference; `namespace` disambiguates identical names across
/// repositories when model namespacing is enabled.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelIdentifier {
    pub namespace: String,
    pub name: String,
}

impl ModelIdentifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// An identifier in the global namespace, the common case when model
    /// namespacing is disabled.
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(GLOBAL_NAMESPACE, name)
    }

    pub fn in_global_namespace(&self) -> bool {
        is_global_namespace(&self.namespace)
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.in_global_namespace() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}::{}", self.namespace, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_global_namespace() {
        assert_eq!(ModelIdentifier::local("resnet").to_string(), "resnet");
        assert_eq!(
            ModelIdentifier::new("ns1", "resnet").to_string(),
            "ns1::resnet"
        );
    }

    #[test]
    fn ordering_is_namespace_first() {
        let a = ModelIdentifier::new("a", "z");
        let b = ModelIdentifier::new("b", "a");
        assert!(a < b);
    }
}
