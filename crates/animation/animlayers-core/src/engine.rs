//! Composition engine: resolves a binding and blends its resource's layers.
//!
//! Evaluation is read-only. It takes the resource's read lock for the whole
//! walk, so concurrent evaluations (one per viewport, say) proceed in parallel
//! while structural edits wait for them.
//!
//! Order: layers are walked from the bottom of the stack (index 0) to the top,
//! so the most recently added layer is applied last. Within a layer, strips are
//! walked in index order and later strips overwrite earlier ones per channel.

use log::warn;
use thiserror::Error;

use crate::animation::{AnimationData, AnimationResource};
use crate::binding::AnimationBinding;
use crate::config::Config;
use crate::error::{AnimError, Result};
use crate::ids::{OutputIndex, StripId};
use crate::layer::Layer;
use crate::strip::Strip;
use crate::value::{Evaluation, Pose};

/// Failure reported by a strip evaluator. The strip is skipped.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("strip {strip:?} failed to evaluate: {message}")]
pub struct StripEvalError {
    pub strip: StripId,
    pub message: String,
}

impl StripEvalError {
    pub fn new(strip: StripId, message: impl Into<String>) -> Self {
        Self {
            strip,
            message: message.into(),
        }
    }
}

/// What a strip evaluator returns for one strip.
pub type StripResult = std::result::Result<Option<Pose>, StripEvalError>;

/// Produces a strip's contribution (keyframe/curve evaluation lives behind this).
///
/// `Ok(None)` means the strip animates nothing for `output`.
pub trait StripEvaluator: Send + Sync {
    fn evaluate_strip(
        &self,
        strip: &Strip,
        output: OutputIndex,
        local_time: f32,
    ) -> StripResult;
}

impl<F> StripEvaluator for F
where
    F: Fn(&Strip, OutputIndex, f32) -> StripResult + Send + Sync,
{
    fn evaluate_strip(
        &self,
        strip: &Strip,
        output: OutputIndex,
        local_time: f32,
    ) -> StripResult {
        self(strip, output, local_time)
    }
}

/// Stateless evaluation driver.
#[derive(Clone, Debug, Default)]
pub struct CompositionEngine {
    cfg: Config,
}

impl CompositionEngine {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Evaluate `binding` at scene time `time`.
    ///
    /// Returns [`Evaluation::NoAnimation`] when nothing is bound (or the bound
    /// resource is gone) and `OutputNotFound` when the selected output does not
    /// exist in the bound resource.
    pub fn evaluate(
        &self,
        binding: &AnimationBinding,
        time: f32,
        evaluator: &dyn StripEvaluator,
    ) -> Result<Evaluation> {
        let state = binding.snapshot();
        let Some(resource) = state.resource() else {
            return Ok(Evaluation::NoAnimation);
        };
        // Index 0 is never allocated, so "nothing selected" reports as not found.
        let output = state.selected_output.unwrap_or(OutputIndex(0));
        self.evaluate_resource(&resource, output, time, evaluator)
            .map(Evaluation::Pose)
    }

    /// Evaluate one output of a resource directly, without a binding.
    pub fn evaluate_resource(
        &self,
        resource: &AnimationResource,
        output: OutputIndex,
        time: f32,
        evaluator: &dyn StripEvaluator,
    ) -> Result<Pose> {
        let data = resource.read();
        self.evaluate_data(&data, output, time, evaluator)
    }

    pub fn evaluate_data(
        &self,
        data: &AnimationData,
        output: OutputIndex,
        time: f32,
        evaluator: &dyn StripEvaluator,
    ) -> Result<Pose> {
        if data.find_output(output).is_none() {
            return Err(AnimError::OutputNotFound(output));
        }

        let mut acc = Pose::identity();
        for (index, layer) in data.layers().iter().enumerate() {
            let influence = layer.influence();
            if !influence.is_finite() {
                self.skipped(format_args!(
                    "layer {index} '{}' has non-finite influence {influence}",
                    layer.name
                ));
                continue;
            }
            if influence <= 0.0 && self.cfg.skip_zero_influence_layers {
                continue;
            }
            if let Some(layer_pose) = self.evaluate_layer(layer, output, time, evaluator) {
                layer.blend_into(&mut acc, layer_pose);
            }
        }
        Ok(acc)
    }

    /// Fold every strip of `layer` that contains `time`. `None` when no strip contributed.
    ///
    /// Influence and mix mode are not applied here.
    pub fn evaluate_layer(
        &self,
        layer: &Layer,
        output: OutputIndex,
        time: f32,
        evaluator: &dyn StripEvaluator,
    ) -> Option<Pose> {
        let mut layer_pose: Option<Pose> = None;
        for strip in layer.strips() {
            if strip.is_malformed() {
                self.skipped(format_args!(
                    "strip {:?} on layer '{}' has a malformed range [{}, {}]",
                    strip.id(),
                    layer.name,
                    strip.frame_start,
                    strip.frame_end
                ));
                continue;
            }
            if !strip.contains_frame(time) {
                continue;
            }
            match evaluator.evaluate_strip(strip, output, strip.local_time(time)) {
                Ok(Some(pose)) => layer_pose.get_or_insert_with(Pose::identity).merge_from(pose),
                Ok(None) => {}
                Err(e) => self.skipped(format_args!("{e}")),
            }
        }
        layer_pose
    }

    fn skipped(&self, what: std::fmt::Arguments<'_>) {
        if self.cfg.warn_on_skipped {
            warn!("skipping during evaluation: {what}");
        }
    }
}
