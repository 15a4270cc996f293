//! animap core (engine-agnostic)
//!
//! Bakes the clips of a skinned, animated mesh into "animation maps": textures
//! whose texel (x, y) holds the position of vertex x at frame y. A renderer
//! then replays the animation with a texture fetch instead of skinning.
//!
//! The host supplies two collaborators through [`AnimatedObject`]: a
//! [`ClipCatalog`] and a [`PosableMeshSource`]. [`AnimationBaker`] binds to an
//! object, walks its clips over a power-of-two frame grid and returns one
//! [`BakedRecord`] per bakeable clip. [`skinned`] provides a CPU skinning
//! implementation of both collaborators.

pub mod baking;
pub mod binding;
pub mod config;
pub mod data;
pub mod error;
pub mod frames;
pub mod outputs;
pub mod sampling;
pub mod scratch;
pub mod skinned;
pub mod texel;

// Re-exports for consumers (host adapters)
pub use baking::{
    bake_parallel, bake_target, bake_with_source, export_records_json, AnimationBaker,
    BakedRecord,
};
pub use binding::{bind, AnimatedObject, BindingContext, ClipCatalog, PosableMeshSource};
pub use config::{BakeConfig, FrameRounding, TimeStepping};
pub use data::ClipDescriptor;
pub use error::{BakeError, Capability, SampleError, SkinnedMeshError};
pub use frames::{closest_power_of_two, next_power_of_two, FrameGrid};
pub use outputs::{BakeDiagnostic, BakeOutcome, SkipReason};
pub use sampling::ClipSampler;
pub use scratch::PositionScratch;
pub use skinned::{AnimationSet, RiggedObject, SkinClip, SkinnedMesh};
pub use texel::TexelFormat;

pub use glam::Vec3;
