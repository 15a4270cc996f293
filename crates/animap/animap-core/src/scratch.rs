//! Reusable readback buffer for sampled vertex positions.
//!
//! One scratch is owned by each baking loop and handed to the sampler on every
//! frame. Its contents are fully overwritten before they are read.

use glam::Vec3;

#[derive(Debug, Default, Clone)]
pub struct PositionScratch {
    positions: Vec<Vec3>,
}

impl PositionScratch {
    pub fn with_vertex_count(vertex_count: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; vertex_count],
        }
    }

    /// Resize to `vertex_count` and hand out the whole buffer for writing.
    #[inline]
    pub fn begin_frame(&mut self, vertex_count: usize) -> &mut [Vec3] {
        if self.positions.len() != vertex_count {
            self.positions.resize(vertex_count, Vec3::ZERO);
        }
        &mut self.positions
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
