//! Error types for binding and sampling

use serde::{Deserialize, Serialize};

/// Collaborator a binding target must expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ClipCatalog,
    MeshSource,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::ClipCatalog => f.write_str("clip catalog"),
            Capability::MeshSource => f.write_str("posable mesh source"),
        }
    }
}

/// Failures of the bind/bake entry points.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BakeError {
    /// The target lacks a collaborator; bind a different target.
    #[error("target '{target}' has no {capability}")]
    MissingCapability {
        target: String,
        capability: Capability,
    },

    /// Bake requested before a successful bind.
    #[error("baker is not bound to a target")]
    NotBound,

    /// The mesh source reported a vertex count no map can hold.
    #[error("target '{target}' has unusable vertex count {count}")]
    InvalidVertexCount { target: String, count: usize },
}

/// Failures reported by a posable mesh source while posing or reading back.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SampleError {
    #[error("unknown clip '{clip}'")]
    UnknownClip { clip: String },

    #[error("mesh source produced {actual} positions, expected {expected}")]
    VertexCountMismatch { expected: usize, actual: usize },

    #[error("mesh source is missing its {capability}")]
    MissingCapability { capability: Capability },

    #[error("mesh source error: {reason}")]
    Source { reason: String },
}

/// Structural problems in a [`crate::skinned::RiggedObject`] description.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SkinnedMeshError {
    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("{influences} influence lists for {vertices} vertices")]
    InfluenceCount { vertices: usize, influences: usize },

    #[error("bone index {bone} out of range ({bone_count} bones)")]
    BoneOutOfRange { bone: usize, bone_count: usize },

    /// Parents must precede their children so globals resolve in one pass.
    #[error("bone {bone} has parent {parent}, which does not precede it")]
    ParentOrder { bone: usize, parent: usize },

    #[error("clip '{clip}': keys for bone {bone} are not sorted by time")]
    UnsortedKeys { clip: String, bone: usize },

    #[error("clip '{clip}': {reason}")]
    InvalidClip { clip: String, reason: String },
}
