//! Object references shared by the migration CRDs
//!
//! Checkpoint/Content pairs point at each other with namespaced references;
//! parents record their children with bare local references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Namespaced reference to another object in the migration API group.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointReference {
    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object
    pub namespace: String,
}

impl CheckpointReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Reference to an object in the same namespace, by name only.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LocalReference {
    /// Name of the referenced object
    pub name: String,
}

impl LocalReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
