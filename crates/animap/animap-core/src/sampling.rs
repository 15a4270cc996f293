//! Clip sampling over a posable mesh source.
//!
//! `ClipSampler::pose` performs the two ordered steps a live host requires:
//! pose the mesh at a clip time, then read the resulting positions back into
//! the caller's scratch buffer. The sampler also guards the binding invariant
//! that the source's vertex count never changes.

use glam::Vec3;

use crate::binding::PosableMeshSource;
use crate::data::ClipDescriptor;
use crate::error::SampleError;
use crate::scratch::PositionScratch;

/// Clamp `time` into the clip's local timeline `[0, length]`.
#[inline]
pub fn clamp_clip_time(time: f32, length: f32) -> f32 {
    time.max(0.0).min(length.max(0.0))
}

pub struct ClipSampler<'a> {
    source: &'a mut dyn PosableMeshSource,
    vertex_count: usize,
}

impl<'a> ClipSampler<'a> {
    /// Wrap `source`, expecting it to keep reporting `vertex_count` vertices.
    pub fn new(source: &'a mut dyn PosableMeshSource, vertex_count: usize) -> Self {
        Self {
            source,
            vertex_count,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Pose the mesh at `time` within `clip` and return the deformed positions.
    pub fn pose<'s>(
        &mut self,
        clip: &ClipDescriptor,
        time: f32,
        scratch: &'s mut PositionScratch,
    ) -> Result<&'s [Vec3], SampleError> {
        let reported = self.source.vertex_count();
        if reported != self.vertex_count {
            return Err(SampleError::VertexCountMismatch {
                expected: self.vertex_count,
                actual: reported,
            });
        }

        self.source
            .pose(&clip.name, clamp_clip_time(time, clip.length))?;
        let out = scratch.begin_frame(self.vertex_count);
        self.source.read_positions(out)?;
        Ok(scratch.positions())
    }
}
