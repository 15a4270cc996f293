//! Baking configuration for animap-core.

use serde::{Deserialize, Serialize};

use crate::texel::TexelFormat;

/// How sample times are advanced from one frame to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStepping {
    /// Running sum `t += per_frame_time`. Keeps the float drift of maps baked
    /// by earlier running-sum loops, so re-bakes compare bit-for-bit.
    #[default]
    Accumulate,
    /// `t = frame * per_frame_time`, recomputed for every frame.
    Multiply,
}

/// How the raw frame estimate `frame_rate * length` becomes an integer before
/// power-of-two quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRounding {
    /// Round to nearest, halves away from zero.
    #[default]
    Nearest,
    /// Integer cast (drops the fraction). Matches maps baked before
    /// `Nearest` became the default.
    Truncate,
}

/// Configuration for a bake pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Encoding written into each texel.
    pub texel_format: TexelFormat,
    pub time_stepping: TimeStepping,
    pub frame_rounding: FrameRounding,
    /// Upper bound on worker threads for `bake_parallel`. `None` uses the
    /// available parallelism reported by the OS.
    pub max_workers: Option<usize>,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            texel_format: TexelFormat::RgbaHalf,
            time_stepping: TimeStepping::Accumulate,
            frame_rounding: FrameRounding::Nearest,
            max_workers: None,
        }
    }
}

impl BakeConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
