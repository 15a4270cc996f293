//! Clip metadata as seen through a clip catalog.

use serde::{Deserialize, Serialize};

/// Read-only view of one clip in a catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    /// Sample rate the clip was authored at (frames per second).
    #[serde(rename = "frameRate")]
    pub frame_rate: f32,
    /// Whether playback can be driven by direct time assignment. Clips driven
    /// by a state machine/graph cannot be time-sampled and are not baked.
    #[serde(default = "default_legacy")]
    pub legacy: bool,
}

fn default_legacy() -> bool {
    true
}

impl ClipDescriptor {
    pub fn new(name: impl Into<String>, length: f32, frame_rate: f32) -> Self {
        Self {
            name: name.into(),
            length,
            frame_rate,
            legacy: true,
        }
    }

    /// Mark the clip as graph-driven (not legacy-compatible).
    pub fn graph_driven(mut self) -> Self {
        self.legacy = false;
        self
    }
}
