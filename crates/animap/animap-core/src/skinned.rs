//! Reference posable mesh source: CPU linear blend skinning.
//!
//! Models the two host components a bindable object usually carries: an
//! animation component holding time-sampled clips ([`AnimationSet`]) and a
//! skin holding bind-pose vertices, bone weights and a bone hierarchy
//! ([`SkinnedMesh`]). [`RiggedObject`] ties them together and implements both
//! collaborator traits, so the baker can run without a live engine.
//!
//! Model:
//! - Bones are ordered so that every parent precedes its children.
//! - Each clip track drives one bone with keys holding a full local transform;
//!   bones without a track keep their rest transform.
//! - Keys are interpolated linearly (slerp for rotation) and held at the ends.
//! - Skin matrix of bone i = posed_global(i) * rest_global(i)^-1.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::binding::{AnimatedObject, ClipCatalog, PosableMeshSource};
use crate::data::ClipDescriptor;
use crate::error::{Capability, SampleError, SkinnedMeshError};

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

fn default_legacy() -> bool {
    true
}

/// Local translation/rotation/scale of a bone relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTransform {
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BoneTransform {
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.normalize(), self.translation)
    }

    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t).normalize(),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub rest: BoneTransform,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub bone: usize,
    pub weight: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneKey {
    /// Seconds from clip start.
    pub time: f32,
    #[serde(flatten)]
    pub transform: BoneTransform,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub bone: usize,
    pub keys: Vec<BoneKey>,
}

impl BoneTrack {
    /// Find the key pair around `time` and the blend factor between them.
    /// Before the first key or after the last, both indices point at that key.
    fn find_segment(&self, time: f32) -> Option<(usize, usize, f32)> {
        let n = self.keys.len();
        if n == 0 {
            return None;
        }
        if n == 1 || time <= self.keys[0].time {
            return Some((0, 0, 0.0));
        }
        if time >= self.keys[n - 1].time {
            return Some((n - 1, n - 1, 0.0));
        }
        for i in 0..(n - 1) {
            let t0 = self.keys[i].time;
            let t1 = self.keys[i + 1].time;
            if time >= t0 && time <= t1 {
                let denom = (t1 - t0).max(f32::EPSILON);
                return Some((i, i + 1, ((time - t0) / denom).clamp(0.0, 1.0)));
            }
        }
        Some((n - 1, n - 1, 0.0))
    }

    pub fn sample(&self, time: f32) -> Option<BoneTransform> {
        let (i0, i1, t) = self.find_segment(time)?;
        let left = &self.keys[i0].transform;
        if i0 == i1 {
            return Some(*left);
        }
        Some(left.interpolate(&self.keys[i1].transform, t))
    }
}

/// A time-sampled clip over the bones of a skin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkinClip {
    pub name: String,
    pub length: f32,
    #[serde(rename = "frameRate")]
    pub frame_rate: f32,
    #[serde(default = "default_legacy")]
    pub legacy: bool,
    #[serde(default)]
    pub tracks: Vec<BoneTrack>,
}

impl SkinClip {
    pub fn descriptor(&self) -> ClipDescriptor {
        ClipDescriptor {
            name: self.name.clone(),
            length: self.length,
            frame_rate: self.frame_rate,
            legacy: self.legacy,
        }
    }

    fn track_for(&self, bone: usize) -> Option<&BoneTrack> {
        self.tracks.iter().find(|t| t.bone == bone)
    }
}

/// Clip list of an animation component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationSet {
    pub clips: Vec<SkinClip>,
}

impl AnimationSet {
    pub fn clip(&self, name: &str) -> Option<&SkinClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Check tracks against a skeleton of `bone_count` bones.
    pub fn validate(&self, bone_count: usize) -> Result<(), SkinnedMeshError> {
        for clip in &self.clips {
            if !clip.length.is_finite() || clip.length < 0.0 {
                return Err(SkinnedMeshError::InvalidClip {
                    clip: clip.name.clone(),
                    reason: format!("length must be finite and >= 0, got {}", clip.length),
                });
            }
            for track in &clip.tracks {
                if track.bone >= bone_count {
                    return Err(SkinnedMeshError::BoneOutOfRange {
                        bone: track.bone,
                        bone_count,
                    });
                }
                if track.keys.windows(2).any(|w| w[1].time < w[0].time) {
                    return Err(SkinnedMeshError::UnsortedKeys {
                        clip: clip.name.clone(),
                        bone: track.bone,
                    });
                }
            }
        }
        Ok(())
    }
}

impl ClipCatalog for AnimationSet {
    fn clips(&self) -> Vec<ClipDescriptor> {
        self.clips.iter().map(SkinClip::descriptor).collect()
    }
}

/// Bind-pose mesh plus skeleton, with the most recently posed positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkinnedMesh {
    pub positions: Vec<Vec3>,
    /// One list per vertex; empty means the mesh is rigid.
    #[serde(default)]
    pub influences: Vec<Vec<Influence>>,
    #[serde(default)]
    pub bones: Vec<Bone>,
    #[serde(skip)]
    posed: Vec<Vec3>,
}

impl SkinnedMesh {
    pub fn new(positions: Vec<Vec3>, influences: Vec<Vec<Influence>>, bones: Vec<Bone>) -> Self {
        Self {
            positions,
            influences,
            bones,
            posed: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn validate(&self) -> Result<(), SkinnedMeshError> {
        let bone_count = self.bones.len();
        if !self.influences.is_empty() && self.influences.len() != self.positions.len() {
            return Err(SkinnedMeshError::InfluenceCount {
                vertices: self.positions.len(),
                influences: self.influences.len(),
            });
        }
        for (i, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= i {
                    return Err(SkinnedMeshError::ParentOrder { bone: i, parent });
                }
            }
        }
        for influence in self.influences.iter().flatten() {
            if influence.bone >= bone_count {
                return Err(SkinnedMeshError::BoneOutOfRange {
                    bone: influence.bone,
                    bone_count,
                });
            }
        }
        Ok(())
    }

    /// Resolve local bone transforms into model-space matrices.
    fn globals(&self, local: impl Fn(usize, &Bone) -> BoneTransform) -> Vec<Mat4> {
        let mut out: Vec<Mat4> = Vec::with_capacity(self.bones.len());
        for (i, bone) in self.bones.iter().enumerate() {
            let m = local(i, bone).to_mat4();
            let global = match bone.parent.and_then(|p| out.get(p)) {
                Some(parent) => *parent * m,
                None => m,
            };
            out.push(global);
        }
        out
    }

    /// Skin the mesh at `time` seconds into `clip`.
    pub fn pose_clip(&mut self, clip: &SkinClip, time: f32) {
        let rest = self.globals(|_, bone| bone.rest);
        let posed = self.globals(|i, bone| {
            clip.track_for(i)
                .and_then(|track| track.sample(time))
                .unwrap_or(bone.rest)
        });
        let skin: Vec<Mat4> = posed
            .iter()
            .zip(&rest)
            .map(|(p, r)| *p * r.inverse())
            .collect();

        self.posed.clear();
        self.posed.reserve(self.positions.len());
        for (v, &position) in self.positions.iter().enumerate() {
            let influences = self.influences.get(v).map(Vec::as_slice).unwrap_or(&[]);
            self.posed.push(blend(position, influences, &skin));
        }
    }

    /// Most recent pose, or the bind pose if never posed.
    pub fn current_positions(&self) -> &[Vec3] {
        if self.posed.len() == self.positions.len() {
            &self.posed
        } else {
            &self.positions
        }
    }
}

fn blend(position: Vec3, influences: &[Influence], skin: &[Mat4]) -> Vec3 {
    let mut acc = Vec3::ZERO;
    let mut total = 0.0;
    for influence in influences {
        let Some(m) = skin.get(influence.bone) else {
            continue;
        };
        acc += m.transform_point3(position) * influence.weight;
        total += influence.weight;
    }
    if total > 0.0 {
        acc / total
    } else {
        position
    }
}

/// A bindable scene object: optional animation component plus optional skin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiggedObject {
    pub name: String,
    #[serde(default)]
    pub animation: Option<AnimationSet>,
    #[serde(default)]
    pub skin: Option<SkinnedMesh>,
}

impl RiggedObject {
    pub fn new(
        name: impl Into<String>,
        animation: Option<AnimationSet>,
        skin: Option<SkinnedMesh>,
    ) -> Self {
        Self {
            name: name.into(),
            animation,
            skin,
        }
    }

    /// Parse an object description from JSON and validate it.
    pub fn from_json(s: &str) -> Result<Self, SkinnedMeshError> {
        let object: RiggedObject = serde_json::from_str(s).map_err(|e| SkinnedMeshError::Parse {
            reason: e.to_string(),
        })?;
        object.validate()?;
        Ok(object)
    }

    pub fn validate(&self) -> Result<(), SkinnedMeshError> {
        if let Some(skin) = &self.skin {
            skin.validate()?;
        }
        if let Some(animation) = &self.animation {
            let bone_count = self.skin.as_ref().map_or(0, |s| s.bones.len());
            animation.validate(bone_count)?;
        }
        Ok(())
    }
}

impl AnimatedObject for RiggedObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn clip_catalog(&self) -> Option<&dyn ClipCatalog> {
        self.animation.as_ref().map(|a| a as &dyn ClipCatalog)
    }

    fn mesh_source(&mut self) -> Option<&mut dyn PosableMeshSource> {
        if self.skin.is_some() {
            Some(self as &mut dyn PosableMeshSource)
        } else {
            None
        }
    }
}

impl PosableMeshSource for RiggedObject {
    fn vertex_count(&self) -> usize {
        self.skin.as_ref().map_or(0, SkinnedMesh::vertex_count)
    }

    fn pose(&mut self, clip: &str, time: f32) -> Result<(), SampleError> {
        let animation = self
            .animation
            .as_ref()
            .ok_or(SampleError::MissingCapability {
                capability: Capability::ClipCatalog,
            })?;
        let skin = self.skin.as_mut().ok_or(SampleError::MissingCapability {
            capability: Capability::MeshSource,
        })?;
        let clip = animation
            .clip(clip)
            .ok_or_else(|| SampleError::UnknownClip {
                clip: clip.to_string(),
            })?;
        skin.pose_clip(clip, time);
        Ok(())
    }

    fn read_positions(&self, out: &mut [Vec3]) -> Result<(), SampleError> {
        let skin = self.skin.as_ref().ok_or(SampleError::MissingCapability {
            capability: Capability::MeshSource,
        })?;
        let current = skin.current_positions();
        if current.len() != out.len() {
            return Err(SampleError::VertexCountMismatch {
                expected: out.len(),
                actual: current.len(),
            });
        }
        out.copy_from_slice(current);
        Ok(())
    }
}
