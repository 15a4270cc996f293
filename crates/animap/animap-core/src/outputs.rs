//! Output contracts of a bake pass.
//!
//! A pass returns the records it managed to bake plus a list of non-fatal
//! diagnostics describing everything it skipped. Callers decide whether a
//! diagnostic is worth surfacing; the baker itself only logs them.

use serde::{Deserialize, Serialize};

use crate::baking::BakedRecord;
use crate::error::SampleError;

/// Why a clip produced no record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SkipReason {
    /// Graph-driven clip; cannot be sampled by direct time assignment.
    NotLegacyCompatible,
    /// Length or frame rate is negative or not finite.
    InvalidTiming { length: f32, frame_rate: f32 },
}

/// Non-fatal conditions reported during a bake pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BakeDiagnostic {
    /// Bake called with no bound target; nothing was baked.
    NotBound,
    SkippedClip {
        clip: String,
        reason: SkipReason,
    },
    /// The mesh source failed part-way through a clip; the clip was dropped.
    SampleFailure {
        clip: String,
        frame: usize,
        error: SampleError,
    },
}

impl BakeDiagnostic {
    /// Clip the diagnostic refers to, if any.
    pub fn clip(&self) -> Option<&str> {
        match self {
            BakeDiagnostic::NotBound => None,
            BakeDiagnostic::SkippedClip { clip, .. } | BakeDiagnostic::SampleFailure { clip, .. } => {
                Some(clip.as_str())
            }
        }
    }
}

/// Records in catalog order, plus diagnostics in the order they were raised.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BakeOutcome {
    pub records: Vec<BakedRecord>,
    pub diagnostics: Vec<BakeDiagnostic>,
}

impl BakeOutcome {
    pub fn not_bound() -> Self {
        Self {
            records: Vec::new(),
            diagnostics: vec![BakeDiagnostic::NotBound],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
