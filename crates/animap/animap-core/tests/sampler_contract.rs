use animap_core::{
    bake_with_source, bind, AnimatedObject, AnimationBaker, BakeConfig, BakeDiagnostic,
    BindingContext, ClipCatalog, ClipDescriptor, ClipSampler, PosableMeshSource, PositionScratch,
    SampleError, Vec3,
};

/// Scripted mesh source: vertex v at time t sits at (v, t, clip index).
#[derive(Clone, Debug, Default)]
struct Scripted {
    name: String,
    clips: Option<Vec<ClipDescriptor>>,
    vertex_count: Option<usize>,
    /// Fail the n-th pose of the named clip.
    fail_at: Option<(String, usize)>,
    /// Drop one vertex on every pose.
    shrink_on_pose: bool,
    current: Option<(f32, f32)>,
    poses_in_clip: usize,
    last_clip: Option<String>,
    log: Vec<String>,
}

impl Scripted {
    fn new(vertex_count: usize, clips: Vec<ClipDescriptor>) -> Self {
        Self {
            name: "scripted".into(),
            clips: Some(clips),
            vertex_count: Some(vertex_count),
            ..Default::default()
        }
    }

    fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.as_ref()?.iter().position(|c| c.name == name)
    }
}

impl PosableMeshSource for Scripted {
    fn vertex_count(&self) -> usize {
        self.vertex_count.unwrap_or(0)
    }

    fn pose(&mut self, clip: &str, time: f32) -> Result<(), SampleError> {
        if self.last_clip.as_deref() != Some(clip) {
            self.last_clip = Some(clip.to_string());
            self.poses_in_clip = 0;
        }
        let nth = self.poses_in_clip;
        self.poses_in_clip += 1;
        if let Some((fail_clip, fail_nth)) = &self.fail_at {
            if fail_clip == clip && *fail_nth == nth {
                return Err(SampleError::Source {
                    reason: "rig evaluation failed".into(),
                });
            }
        }
        let index = self
            .clip_index(clip)
            .ok_or_else(|| SampleError::UnknownClip { clip: clip.into() })?;
        self.log.push(format!("pose {clip} {time}"));
        self.current = Some((time, index as f32));
        if self.shrink_on_pose {
            self.vertex_count = self.vertex_count.map(|n| n.saturating_sub(1));
        }
        Ok(())
    }

    fn read_positions(&self, out: &mut [Vec3]) -> Result<(), SampleError> {
        let (time, index) = self.current.ok_or(SampleError::Source {
            reason: "read before pose".into(),
        })?;
        for (v, slot) in out.iter_mut().enumerate() {
            *slot = Vec3::new(v as f32, time, index);
        }
        Ok(())
    }
}

impl AnimatedObject for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn clip_catalog(&self) -> Option<&dyn ClipCatalog> {
        self.clips.as_ref().map(|c| c as &dyn ClipCatalog)
    }

    fn mesh_source(&mut self) -> Option<&mut dyn PosableMeshSource> {
        if self.vertex_count.is_some() {
            Some(self as &mut dyn PosableMeshSource)
        } else {
            None
        }
    }
}

fn clips() -> Vec<ClipDescriptor> {
    vec![
        ClipDescriptor::new("idle", 1.0, 4.0),
        ClipDescriptor::new("run", 0.5, 8.0),
        ClipDescriptor::new("jump", 0.25, 16.0),
    ]
}

#[test]
fn sampler_poses_before_reading() {
    let mut source = Scripted::new(3, clips());
    let clip = ClipDescriptor::new("run", 0.5, 8.0);
    let mut scratch = PositionScratch::default();
    {
        let mut sampler = ClipSampler::new(&mut source, 3);
        assert_eq!(sampler.vertex_count(), 3);
        let positions = sampler.pose(&clip, 0.25, &mut scratch).unwrap();
        assert_eq!(
            positions,
            &[
                Vec3::new(0.0, 0.25, 1.0),
                Vec3::new(1.0, 0.25, 1.0),
                Vec3::new(2.0, 0.25, 1.0)
            ]
        );
        // Outside the clip timeline the time is clamped.
        let positions = sampler.pose(&clip, 3.0, &mut scratch).unwrap();
        assert_eq!(positions[0].y, 0.5);
    }
    assert_eq!(source.log, vec!["pose run 0.25", "pose run 0.5"]);
}

#[test]
fn scratch_is_resized_and_overwritten() {
    let mut scratch = PositionScratch::with_vertex_count(5);
    scratch.begin_frame(5).fill(Vec3::splat(9.0));
    let mut source = Scripted::new(2, clips());
    let clip = ClipDescriptor::new("idle", 1.0, 4.0);
    let mut sampler = ClipSampler::new(&mut source, 2);
    let positions = sampler.pose(&clip, 0.5, &mut scratch).unwrap();
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().all(|p| p.y == 0.5));
    assert_eq!(scratch.len(), 2);
}

#[test]
fn each_row_holds_its_frame_time() {
    let mut source = Scripted::new(3, clips());
    let ctx = bind(&mut source).unwrap();
    let outcome = bake_with_source(&ctx, &mut source, &BakeConfig::default());
    assert!(outcome.is_clean());
    assert_eq!(outcome.records.len(), 3);

    // idle: 4 frames over 1 s, run: 4 over 0.5 s, jump: 4 over 0.25 s
    for (ci, rec) in outcome.records.iter().enumerate() {
        assert_eq!(rec.map_height, 4);
        assert_eq!(rec.map_width, 4);
        let step = rec.clip_length / 4.0;
        for frame in 0..4 {
            for v in 0..3 {
                assert_eq!(
                    rec.texel(v, frame),
                    Some([v as f32, frame as f32 * step, ci as f32, 1.0])
                );
            }
        }
    }

    // Every frame of every clip is posed exactly once, in order.
    assert_eq!(source.log.len(), 12);
    assert_eq!(source.log[0], "pose idle 0");
    assert_eq!(source.log[4], "pose run 0");
    assert_eq!(source.log[11], "pose jump 0.1875");
}

#[test]
fn sample_failure_drops_only_that_clip() {
    let mut source = Scripted::new(3, clips());
    source.fail_at = Some(("run".into(), 2));
    let ctx = bind(&mut source).unwrap();
    let outcome = bake_with_source(&ctx, &mut source, &BakeConfig::default());

    let names: Vec<&str> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["scripted_idle", "scripted_jump"]);
    assert_eq!(
        outcome.diagnostics,
        vec![BakeDiagnostic::SampleFailure {
            clip: "run".into(),
            frame: 2,
            error: SampleError::Source {
                reason: "rig evaluation failed".into(),
            },
        }]
    );
}

#[test]
fn vertex_count_drift_is_a_sample_failure() {
    let mut source = Scripted::new(4, vec![ClipDescriptor::new("idle", 1.0, 4.0)]);
    source.shrink_on_pose = true;
    let mut baker = AnimationBaker::new(BakeConfig::default());
    baker.bind(source).unwrap();
    let outcome = baker.bake();
    assert!(outcome.records.is_empty());
    assert_eq!(
        outcome.diagnostics,
        vec![BakeDiagnostic::SampleFailure {
            clip: "idle".into(),
            frame: 1,
            error: SampleError::VertexCountMismatch {
                expected: 4,
                actual: 3,
            },
        }]
    );
}

#[test]
fn unknown_clip_in_catalog_is_reported() {
    // The catalog advertises a clip the source cannot pose.
    let mut source = Scripted::new(2, clips());
    let ctx = BindingContext::new(
        "scripted",
        2,
        vec![
            ClipDescriptor::new("idle", 1.0, 4.0),
            ClipDescriptor::new("ghost", 1.0, 4.0),
        ],
    )
    .unwrap();
    let outcome = bake_with_source(&ctx, &mut source, &BakeConfig::default());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(
        outcome.diagnostics,
        vec![BakeDiagnostic::SampleFailure {
            clip: "ghost".into(),
            frame: 0,
            error: SampleError::UnknownClip {
                clip: "ghost".into()
            },
        }]
    );
}

#[test]
fn invalid_timing_is_skipped() {
    let mut source = Scripted::new(2, vec![]);
    let ctx = BindingContext::new(
        "scripted",
        2,
        vec![
            ClipDescriptor::new("nan", f32::NAN, 30.0),
            ClipDescriptor::new("backwards", 1.0, -30.0),
        ],
    )
    .unwrap();
    let outcome = bake_with_source(&ctx, &mut source, &BakeConfig::default());
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome
        .diagnostics
        .iter()
        .all(|d| matches!(d, BakeDiagnostic::SkippedClip { .. })));
    assert!(source.log.is_empty());
}

#[test]
fn graph_driven_clip_is_never_posed() {
    let mut source = Scripted::new(
        2,
        vec![
            ClipDescriptor::new("blend", 1.0, 4.0).graph_driven(),
            ClipDescriptor::new("idle", 1.0, 4.0),
        ],
    );
    let ctx = bind(&mut source).unwrap();
    let outcome = bake_with_source(&ctx, &mut source, &BakeConfig::default());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].name, "scripted_idle");
    assert!(source.log.iter().all(|line| !line.contains("blend")));
}

#[test]
fn bind_requires_both_capabilities() {
    let mut no_catalog = Scripted::new(2, vec![]);
    no_catalog.clips = None;
    assert!(bind(&mut no_catalog).is_err());

    let mut no_mesh = Scripted::new(2, vec![]);
    no_mesh.vertex_count = None;
    assert!(bind(&mut no_mesh).is_err());

    let mut empty = Scripted::new(0, vec![]);
    assert!(bind(&mut empty).is_err());
}
