#![allow(dead_code)]

use std::collections::HashMap;

use animlayers_core::{
    AnimationData, BindingRegistry, ChannelKey, OutputIndex, OwnerId, Pose, Strip, StripEvaluator,
    StripId, StripKind, StripResult,
};
use animlayers_test_fixtures::{ChannelValue, SceneFixture};

pub fn approx(a: f32, b: f32) {
    assert!((a - b).abs() <= 1e-5, "left={a} right={b}");
}

/// Evaluator returning a fixed pose per (strip, output).
#[derive(Default)]
pub struct ConstantStrips {
    poses: HashMap<(StripId, OutputIndex), Pose>,
}

impl ConstantStrips {
    pub fn set(&mut self, strip: StripId, output: OutputIndex, pose: Pose) {
        self.poses.insert((strip, output), pose);
    }
}

impl StripEvaluator for ConstantStrips {
    fn evaluate_strip(&self, strip: &Strip, output: OutputIndex, _local_time: f32) -> StripResult {
        Ok(self.poses.get(&(strip.id(), output)).cloned())
    }
}

pub fn pose_of(channels: &[ChannelValue]) -> Pose {
    let mut pose = Pose::identity();
    for c in channels {
        pose.set(ChannelKey::new(c.path.as_str(), c.index), c.value);
    }
    pose
}

/// Assert `pose` holds exactly `expected`.
pub fn assert_pose(pose: &Pose, expected: &[ChannelValue]) {
    assert_eq!(pose.len(), expected.len(), "channel count of {pose:?}");
    for c in expected {
        let got = pose
            .get(&c.path, c.index)
            .unwrap_or_else(|| panic!("missing channel {}[{}] in {pose:?}", c.path, c.index));
        approx(got, c.value);
    }
}

/// A scene fixture turned into live data.
pub struct Scene {
    pub data: AnimationData,
    pub evaluator: ConstantStrips,
}

pub fn build_scene(fixture: &SceneFixture) -> Scene {
    let anim = &fixture.animation;
    let mut data = AnimationData::new(&anim.name);
    let outputs: HashMap<String, OutputIndex> = anim
        .outputs
        .iter()
        .map(|name| (name.clone(), data.add_output(name).stable_index()))
        .collect();

    let mut evaluator = ConstantStrips::default();
    for (layer_index, layer) in anim.layers.iter().enumerate() {
        data.add_layer(&layer.name);
        data.set_influence(layer_index, layer.influence).unwrap();
        data.set_mix_mode_named(layer_index, &layer.mix_mode).unwrap();
        for strip_fx in &layer.strips {
            let kind: StripKind = strip_fx.kind.parse().unwrap();
            let strip = data.add_strip(layer_index, kind).unwrap();
            strip
                .resize(
                    strip_fx.start.unwrap_or(f32::NEG_INFINITY),
                    strip_fx.end.unwrap_or(f32::INFINITY),
                )
                .unwrap();
            strip.set_frame_offset(strip_fx.offset).unwrap();
            let id = strip.id();
            for (output, channels) in &strip_fx.channels {
                evaluator.set(id, outputs[output], pose_of(channels));
            }
        }
    }
    Scene { data, evaluator }
}

/// Create one named binding per object in the fixture; returns name → owner.
pub fn bind_objects(registry: &BindingRegistry, fixture: &SceneFixture) -> HashMap<String, OwnerId> {
    fixture
        .bindings
        .iter()
        .map(|b| {
            let owner = registry.alloc_owner();
            registry.create_binding_for_named(owner, &b.object);
            (b.object.clone(), owner)
        })
        .collect()
}
