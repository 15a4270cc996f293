//! Capability traits for host collaborators and the binding context.
//!
//! The baker never looks components up on its own. A host adapter implements
//! [`AnimatedObject`] for whatever it considers a bindable object and hands out
//! the two collaborators the baker needs: a [`ClipCatalog`] and a
//! [`PosableMeshSource`]. Binding snapshots what the bake pass needs into an
//! immutable [`BindingContext`].

use glam::Vec3;
use serde::Serialize;

use crate::data::ClipDescriptor;
use crate::error::{BakeError, Capability, SampleError};
use crate::frames::next_power_of_two;

/// Order-preserving, read-only enumeration of the clips on an object.
pub trait ClipCatalog {
    fn clips(&self) -> Vec<ClipDescriptor>;
}

impl ClipCatalog for Vec<ClipDescriptor> {
    fn clips(&self) -> Vec<ClipDescriptor> {
        self.clone()
    }
}

/// A mesh that can be posed at a point in a clip and read back.
///
/// Posing and readback are two ordered steps: `read_positions` must reflect
/// the most recent `pose` call, so nothing may mutate the source between them.
pub trait PosableMeshSource {
    /// Fixed number of vertices the source reports positions for.
    fn vertex_count(&self) -> usize;

    /// Pose the mesh `time` seconds into `clip`.
    fn pose(&mut self, clip: &str, time: f32) -> Result<(), SampleError>;

    /// Overwrite every element of `out` with the current posed positions.
    /// Callers pass a slice of exactly `vertex_count()` elements.
    fn read_positions(&self, out: &mut [Vec3]) -> Result<(), SampleError>;
}

/// An object a baker can bind to. Either capability may be absent.
pub trait AnimatedObject {
    fn name(&self) -> &str;
    fn clip_catalog(&self) -> Option<&dyn ClipCatalog>;
    fn mesh_source(&mut self) -> Option<&mut dyn PosableMeshSource>;
}

/// What a bake pass knows about its bound object. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BindingContext {
    name: String,
    vertex_count: usize,
    map_width: usize,
    clips: Vec<ClipDescriptor>,
}

impl BindingContext {
    /// Build a context directly from captured values.
    pub fn new(
        name: impl Into<String>,
        vertex_count: usize,
        clips: Vec<ClipDescriptor>,
    ) -> Result<Self, BakeError> {
        let name = name.into();
        let map_width = match vertex_count {
            0 => None,
            n => next_power_of_two(n),
        };
        let Some(map_width) = map_width else {
            return Err(BakeError::InvalidVertexCount {
                target: name,
                count: vertex_count,
            });
        };
        Ok(Self {
            name,
            vertex_count,
            map_width,
            clips,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Smallest power of two >= `vertex_count`.
    pub fn map_width(&self) -> usize {
        self.map_width
    }

    pub fn clips(&self) -> &[ClipDescriptor] {
        &self.clips
    }
}

/// Validate a target's capabilities and capture its binding context.
pub fn bind<T: AnimatedObject + ?Sized>(target: &mut T) -> Result<BindingContext, BakeError> {
    let name = target.name().to_string();
    let missing = |capability| BakeError::MissingCapability {
        target: name.clone(),
        capability,
    };

    let clips = target
        .clip_catalog()
        .map(|catalog| catalog.clips())
        .ok_or_else(|| missing(Capability::ClipCatalog))?;
    let vertex_count = target
        .mesh_source()
        .map(|source| source.vertex_count())
        .ok_or_else(|| missing(Capability::MeshSource))?;

    BindingContext::new(name, vertex_count, clips)
}
