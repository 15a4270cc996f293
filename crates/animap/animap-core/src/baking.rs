//! Baking API: sample every legacy-compatible clip of a bound object over a
//! power-of-two frame grid and pack vertex positions into animation maps.
//!
//! Map layout: row-major, X = vertex index, Y = frame index, row 0 = frame 0.
//! Texel `(v, f)` lives at `f * map_width + v`. Columns past the vertex count
//! are padding and stay at the encoding's zero value.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::binding::{bind, AnimatedObject, BindingContext, PosableMeshSource};
use crate::config::BakeConfig;
use crate::data::ClipDescriptor;
use crate::error::{BakeError, Capability, SampleError};
use crate::frames::FrameGrid;
use crate::outputs::{BakeDiagnostic, BakeOutcome, SkipReason};
use crate::sampling::ClipSampler;
use crate::scratch::PositionScratch;
use crate::texel::TexelFormat;

/// One baked animation map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BakedRecord {
    /// `"{binding}_{clip}"`
    pub name: String,
    /// Source clip length in seconds.
    pub clip_length: f32,
    pub map_width: usize,
    /// Equals the clip's quantized frame count.
    pub map_height: usize,
    pub format: TexelFormat,
    /// Raw texel bytes, `map_width * map_height * format.bytes_per_texel()` long.
    pub pixels: Vec<u8>,
}

impl BakedRecord {
    pub fn frame_count(&self) -> usize {
        self.map_height
    }

    /// Texel index of `(vertex, frame)`, or `None` outside the map.
    pub fn texel_index(&self, vertex: usize, frame: usize) -> Option<usize> {
        if vertex >= self.map_width || frame >= self.map_height {
            return None;
        }
        Some(frame * self.map_width + vertex)
    }

    /// Decoded RGBA of one texel.
    pub fn texel(&self, vertex: usize, frame: usize) -> Option<[f32; 4]> {
        let index = self.texel_index(vertex, frame)?;
        let size = self.format.bytes_per_texel();
        let bytes = self.pixels.get(index * size..(index + 1) * size)?;
        Some(self.format.decode(bytes))
    }

    /// Decoded positions of a whole row, padding columns included.
    pub fn frame_positions(&self, frame: usize) -> Option<Vec<Vec3>> {
        (0..self.map_width)
            .map(|v| self.texel(v, frame).map(|[x, y, z, _]| Vec3::new(x, y, z)))
            .collect()
    }

    /// Whether the pixel buffer matches the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.map_width * self.map_height * self.format.bytes_per_texel()
    }
}

pub fn map_name(binding: &str, clip: &str) -> String {
    format!("{binding}_{clip}")
}

type ClipResult = Result<BakedRecord, BakeDiagnostic>;

/// Decide whether a clip can be baked and lay out its frame grid.
pub fn plan_clip(clip: &ClipDescriptor, cfg: &BakeConfig) -> Result<FrameGrid, BakeDiagnostic> {
    if !clip.legacy {
        return Err(BakeDiagnostic::SkippedClip {
            clip: clip.name.clone(),
            reason: SkipReason::NotLegacyCompatible,
        });
    }
    FrameGrid::for_clip(clip.length, clip.frame_rate, cfg.frame_rounding).ok_or_else(|| {
        BakeDiagnostic::SkippedClip {
            clip: clip.name.clone(),
            reason: SkipReason::InvalidTiming {
                length: clip.length,
                frame_rate: clip.frame_rate,
            },
        }
    })
}

/// Bake one clip through `sampler`, reusing `scratch` for every frame.
pub fn bake_clip(
    context: &BindingContext,
    clip: &ClipDescriptor,
    sampler: &mut ClipSampler<'_>,
    scratch: &mut PositionScratch,
    cfg: &BakeConfig,
) -> ClipResult {
    let grid = plan_clip(clip, cfg)?;
    fill_clip(context, clip, grid, sampler, scratch, cfg)
}

fn fill_clip(
    context: &BindingContext,
    clip: &ClipDescriptor,
    grid: FrameGrid,
    sampler: &mut ClipSampler<'_>,
    scratch: &mut PositionScratch,
    cfg: &BakeConfig,
) -> ClipResult {
    let format = cfg.texel_format;
    let texel_bytes = format.bytes_per_texel();
    let row_bytes = context.map_width() * texel_bytes;
    let Some(total_bytes) = row_bytes.checked_mul(grid.frame_count) else {
        return Err(BakeDiagnostic::SkippedClip {
            clip: clip.name.clone(),
            reason: SkipReason::InvalidTiming {
                length: clip.length,
                frame_rate: clip.frame_rate,
            },
        });
    };

    let mut pixels = vec![0u8; total_bytes];
    let rows = grid
        .sample_times(cfg.time_stepping)
        .zip(pixels.chunks_exact_mut(row_bytes));
    for (frame, (time, row)) in rows.enumerate() {
        let positions =
            sampler
                .pose(clip, time, scratch)
                .map_err(|error| BakeDiagnostic::SampleFailure {
                    clip: clip.name.clone(),
                    frame,
                    error,
                })?;
        for (position, texel) in positions.iter().zip(row.chunks_exact_mut(texel_bytes)) {
            format.encode(*position, texel);
        }
    }

    Ok(BakedRecord {
        name: map_name(context.name(), &clip.name),
        clip_length: clip.length,
        map_width: context.map_width(),
        map_height: grid.frame_count,
        format,
        pixels,
    })
}

/// Bake the clips at `indices`, tagging each result with its catalog index.
fn bake_indexed(
    context: &BindingContext,
    source: Option<&mut dyn PosableMeshSource>,
    indices: impl Iterator<Item = usize>,
    cfg: &BakeConfig,
) -> Vec<(usize, ClipResult)> {
    let mut scratch = PositionScratch::with_vertex_count(context.vertex_count());
    let mut sampler = source.map(|s| ClipSampler::new(s, context.vertex_count()));
    let mut results = Vec::new();

    for index in indices {
        let Some(clip) = context.clips().get(index) else {
            continue;
        };
        let result = match (plan_clip(clip, cfg), sampler.as_mut()) {
            (Err(diagnostic), _) => Err(diagnostic),
            (Ok(grid), Some(sampler)) => fill_clip(context, clip, grid, sampler, &mut scratch, cfg),
            (Ok(_), None) => Err(BakeDiagnostic::SampleFailure {
                clip: clip.name.clone(),
                frame: 0,
                error: SampleError::MissingCapability {
                    capability: Capability::MeshSource,
                },
            }),
        };
        results.push((index, result));
    }
    results
}

fn collect(context: &BindingContext, results: Vec<(usize, ClipResult)>) -> BakeOutcome {
    let mut outcome = BakeOutcome::default();
    for (_, result) in results {
        match result {
            Ok(record) => {
                log::debug!(
                    "baked '{}': {}x{} ({} bytes)",
                    record.name,
                    record.map_width,
                    record.map_height,
                    record.pixels.len()
                );
                outcome.records.push(record);
            }
            Err(diagnostic) => {
                log_diagnostic(context, &diagnostic);
                outcome.diagnostics.push(diagnostic);
            }
        }
    }
    outcome
}

fn log_diagnostic(context: &BindingContext, diagnostic: &BakeDiagnostic) {
    match diagnostic {
        BakeDiagnostic::NotBound => log::error!("bake called before a target was bound"),
        BakeDiagnostic::SkippedClip {
            clip,
            reason: SkipReason::NotLegacyCompatible,
        } => log::warn!("{}: clip '{}' is not legacy, skipped", context.name(), clip),
        BakeDiagnostic::SkippedClip { clip, reason } => {
            log::warn!("{}: clip '{}' skipped: {:?}", context.name(), clip, reason)
        }
        BakeDiagnostic::SampleFailure { clip, frame, error } => log::error!(
            "{}: clip '{}' dropped at frame {}: {}",
            context.name(),
            clip,
            frame,
            error
        ),
    }
}

/// Bake every clip of `context` by driving `source` on the calling thread.
pub fn bake_with_source(
    context: &BindingContext,
    source: &mut dyn PosableMeshSource,
    cfg: &BakeConfig,
) -> BakeOutcome {
    let results = bake_indexed(context, Some(source), 0..context.clips().len(), cfg);
    collect(context, results)
}

/// Bake every clip of `context` using the mesh source `target` exposes.
pub fn bake_target<T: AnimatedObject + ?Sized>(
    context: &BindingContext,
    target: &mut T,
    cfg: &BakeConfig,
) -> BakeOutcome {
    let results = bake_indexed(context, target.mesh_source(), 0..context.clips().len(), cfg);
    collect(context, results)
}

fn worker_count(max_workers: Option<usize>, clip_count: usize) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    max_workers
        .unwrap_or(available)
        .max(1)
        .min(clip_count.max(1))
}

/// Bake clips on scoped worker threads. Each worker drives its own clone of
/// `target`, since host mesh sources are generally not reentrant. Output order
/// matches [`bake_target`].
pub fn bake_parallel<T>(context: &BindingContext, target: &T, cfg: &BakeConfig) -> BakeOutcome
where
    T: AnimatedObject + Clone + Sync,
{
    let clip_count = context.clips().len();
    let workers = worker_count(cfg.max_workers, clip_count);
    if workers <= 1 {
        let mut local = target.clone();
        return bake_target(context, &mut local, cfg);
    }

    let mut results: Vec<(usize, ClipResult)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    let mut local = target.clone();
                    let indices = (worker..clip_count).step_by(workers);
                    bake_indexed(context, local.mesh_source(), indices, cfg)
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(results) => results,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });
    results.sort_by_key(|(index, _)| *index);
    collect(context, results)
}

/// Explicit binding state: a baker either has nothing, or a validated
/// context together with the object it was captured from.
#[derive(Debug)]
enum BakerState<T> {
    Unbound,
    Bound {
        context: BindingContext,
        target: T,
    },
}

/// Binds to one animated object at a time and bakes its clips.
#[derive(Debug)]
pub struct AnimationBaker<T> {
    cfg: BakeConfig,
    state: BakerState<T>,
}

impl<T> Default for AnimationBaker<T> {
    fn default() -> Self {
        Self::new(BakeConfig::default())
    }
}

impl<T> AnimationBaker<T> {
    pub fn new(cfg: BakeConfig) -> Self {
        Self {
            cfg,
            state: BakerState::Unbound,
        }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.cfg
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BakerState::Bound { .. })
    }

    pub fn context(&self) -> Option<&BindingContext> {
        match &self.state {
            BakerState::Bound { context, .. } => Some(context),
            BakerState::Unbound => None,
        }
    }

    pub fn target(&self) -> Option<&T> {
        match &self.state {
            BakerState::Bound { target, .. } => Some(target),
            BakerState::Unbound => None,
        }
    }

    /// Drop the current binding and give the target back.
    pub fn unbind(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, BakerState::Unbound) {
            BakerState::Bound { target, .. } => Some(target),
            BakerState::Unbound => None,
        }
    }
}

impl<T: AnimatedObject> AnimationBaker<T> {
    /// Bind to `target`, replacing any previous binding. On failure the
    /// previous binding (if any) is kept.
    pub fn bind(&mut self, mut target: T) -> Result<&BindingContext, BakeError> {
        let context = bind(&mut target).map_err(|err| {
            log::error!("bind failed: {err}");
            err
        })?;
        log::debug!(
            "bound '{}': {} vertices, map width {}, {} clips",
            context.name(),
            context.vertex_count(),
            context.map_width(),
            context.clips().len()
        );
        self.state = BakerState::Bound { context, target };
        self.context().ok_or(BakeError::NotBound)
    }

    /// Bake every clip of the bound target. Without a binding this returns no
    /// records and a single `NotBound` diagnostic.
    pub fn bake(&mut self) -> BakeOutcome {
        match &mut self.state {
            BakerState::Bound { context, target } => bake_target(context, target, &self.cfg),
            BakerState::Unbound => {
                log::error!("bake called before a target was bound");
                BakeOutcome::not_bound()
            }
        }
    }

    /// Like [`AnimationBaker::bake`], spreading clips over worker threads.
    pub fn bake_parallel(&self) -> BakeOutcome
    where
        T: Clone + Sync,
    {
        match &self.state {
            BakerState::Bound { context, target } => bake_parallel(context, target, &self.cfg),
            BakerState::Unbound => {
                log::error!("bake called before a target was bound");
                BakeOutcome::not_bound()
            }
        }
    }
}

/// Export record metadata (everything but the pixels) as a JSON manifest for
/// the persistence step that writes the textures.
pub fn export_records_json(records: &[BakedRecord]) -> serde_json::Value {
    let maps: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "clipLength": r.clip_length,
                "width": r.map_width,
                "height": r.map_height,
                "format": r.format,
                "byteLength": r.pixels.len(),
            })
        })
        .collect();
    serde_json::json!({ "maps": maps })
}
