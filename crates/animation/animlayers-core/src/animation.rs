//! Animation resources: layered data plus shared-ownership bookkeeping.
//!
//! [`AnimationData`] is the plain layer/output model. [`AnimationResource`]
//! wraps it behind a `RwLock` and carries the two counters that decide when the
//! resource may be destroyed:
//!
//! - `users`: the number of bindings pointing at this resource. Only the
//!   [`BindingRegistry`](crate::registry::BindingRegistry) changes it.
//! - `keep_alive`: the number of live [`KeepAlive`] handles.
//!
//! The resource is eligible for destruction when both are zero.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::binding::AnimationBinding;
use crate::config::{Config, InfluencePolicy};
use crate::error::{AnimError, Result};
use crate::ids::{IdAllocator, OutputIndex, ResourceId};
use crate::layer::{Layer, MixMode};
use crate::output::Output;
use crate::strip::{Strip, StripKind};

/// Shared handle to an animation resource.
pub type AnimationHandle = Arc<AnimationResource>;

/// Layers, outputs and their allocators. Index 0 of `layers` is the bottom of the stack.
#[derive(Clone, Debug)]
pub struct AnimationData {
    pub name: String,
    layers: Vec<Layer>,
    outputs: Vec<Output>,
    active_layer: Option<usize>,
    ids: IdAllocator,
    influence_policy: InfluencePolicy,
}

impl AnimationData {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, &Config::default())
    }

    pub fn with_config(name: &str, cfg: &Config) -> Self {
        Self {
            name: name.to_string(),
            layers: Vec::new(),
            outputs: Vec::new(),
            active_layer: None,
            ids: IdAllocator::new(),
            influence_policy: cfg.influence_policy,
        }
    }

    // --- outputs -----------------------------------------------------------

    /// Add an output with the next unused stable index.
    pub fn add_output(&mut self, name: &str) -> &mut Output {
        let index = self.ids.alloc_output();
        self.outputs.push(Output::new(index, name.to_string()));
        let last = self.outputs.len() - 1;
        &mut self.outputs[last]
    }

    /// Add an output already named and tagged for the data-block it animates.
    pub fn add_output_for(&mut self, name: &str, id_type: &str) -> &mut Output {
        let output = self.add_output(name);
        output.id_type = Some(id_type.to_string());
        output
    }

    /// Remove an output. Remaining outputs keep their stable indices.
    pub fn remove_output(&mut self, index: OutputIndex) -> Result<Output> {
        let pos = self
            .outputs
            .iter()
            .position(|o| o.stable_index() == index)
            .ok_or(AnimError::OutputNotFound(index))?;
        Ok(self.outputs.remove(pos))
    }

    pub fn find_output(&self, index: OutputIndex) -> Option<&Output> {
        self.outputs.iter().find(|o| o.stable_index() == index)
    }

    pub fn find_output_mut(&mut self, index: OutputIndex) -> Option<&mut Output> {
        self.outputs.iter_mut().find(|o| o.stable_index() == index)
    }

    /// First output carrying `name`. Names are not unique.
    pub fn find_output_by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// First output named `name` that an owner of kind `id_type` may use.
    pub fn find_output_by_name_for(&self, name: &str, id_type: Option<&str>) -> Option<&Output> {
        self.outputs
            .iter()
            .find(|o| o.name == name && o.accepts(id_type))
    }

    pub fn rename_output(&mut self, index: OutputIndex, name: &str) -> Result<()> {
        let out = self
            .find_output_mut(index)
            .ok_or(AnimError::OutputNotFound(index))?;
        out.name = name.to_string();
        Ok(())
    }

    #[inline]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Highest stable index ever handed out (0 when none).
    #[inline]
    pub fn last_output_index(&self) -> OutputIndex {
        self.ids.last_output()
    }

    // --- layers ------------------------------------------------------------

    /// Append a layer at the top of the stack. It becomes the active layer.
    pub fn add_layer(&mut self, name: &str) -> &mut Layer {
        self.layers.push(Layer::new(name.to_string()));
        let last = self.layers.len() - 1;
        self.active_layer = Some(last);
        &mut self.layers[last]
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        if index >= self.layers.len() {
            return Err(AnimError::LayerNotFound(index));
        }
        let removed = self.layers.remove(index);
        self.active_layer = match self.active_layer {
            _ if self.layers.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => Some(active.min(self.layers.len() - 1)),
            other => other,
        };
        Ok(removed)
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        self.layers
            .get_mut(index)
            .ok_or(AnimError::LayerNotFound(index))
    }

    /// Layers from the top of the stack down, with their stack indices.
    pub fn layers_top_down(&self) -> impl Iterator<Item = (usize, &Layer)> {
        self.layers.iter().enumerate().rev()
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) -> Result<()> {
        self.layer_mut(index)?.name = name.to_string();
        Ok(())
    }

    /// Set a layer's influence, returning the value actually stored.
    ///
    /// Under [`InfluencePolicy::Clamp`] out-of-range values are clamped into
    /// `[0, 1]`; under [`InfluencePolicy::Reject`] they fail with `OutOfRange`.
    /// Non-finite values always fail.
    pub fn set_influence(&mut self, index: usize, value: f32) -> Result<f32> {
        if !value.is_finite() {
            return Err(AnimError::InvalidArgument(format!(
                "influence must be finite, got {value}"
            )));
        }
        let stored = match self.influence_policy {
            InfluencePolicy::Clamp => value.clamp(0.0, 1.0),
            InfluencePolicy::Reject if (0.0..=1.0).contains(&value) => value,
            InfluencePolicy::Reject => {
                return Err(AnimError::OutOfRange {
                    what: "influence",
                    value,
                    min: 0.0,
                    max: 1.0,
                })
            }
        };
        self.layer_mut(index)?.set_influence_unchecked(stored);
        Ok(stored)
    }

    pub fn set_mix_mode(&mut self, index: usize, mode: MixMode) -> Result<()> {
        self.layer_mut(index)?.mix_mode = mode;
        Ok(())
    }

    /// Set a mix mode from its name; unknown names fail with `InvalidArgument`.
    pub fn set_mix_mode_named(&mut self, index: usize, mode: &str) -> Result<()> {
        let mode: MixMode = mode.parse()?;
        self.set_mix_mode(index, mode)
    }

    #[inline]
    pub fn active_layer(&self) -> Option<usize> {
        self.active_layer
    }

    pub fn set_active_layer(&mut self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(AnimError::LayerNotFound(index));
        }
        self.active_layer = Some(index);
        Ok(())
    }

    // --- strips ------------------------------------------------------------

    /// Append a new (infinite) strip to a layer.
    pub fn add_strip(&mut self, layer: usize, kind: StripKind) -> Result<&mut Strip> {
        if layer >= self.layers.len() {
            return Err(AnimError::LayerNotFound(layer));
        }
        let id = self.ids.alloc_strip();
        Ok(self.layers[layer].push_strip(Strip::new(id, kind)))
    }

    pub fn remove_strip(&mut self, layer: usize, strip: usize) -> Result<Strip> {
        self.layer_mut(layer)?
            .remove_strip_at(strip)
            .ok_or(AnimError::StripNotFound { layer, strip })
    }

    pub fn strip_mut(&mut self, layer: usize, strip: usize) -> Result<&mut Strip> {
        self.layer_mut(layer)?
            .strip_mut(strip)
            .ok_or(AnimError::StripNotFound { layer, strip })
    }
}

/// A shared animation asset.
#[derive(Debug)]
pub struct AnimationResource {
    id: ResourceId,
    users: AtomicU32,
    keep_alive: AtomicU32,
    data: RwLock<AnimationData>,
}

impl AnimationResource {
    /// Create a resource with zero users.
    pub fn create(name: &str) -> AnimationHandle {
        Self::from_data(AnimationData::new(name))
    }

    pub fn create_with_config(name: &str, cfg: &Config) -> AnimationHandle {
        Self::from_data(AnimationData::with_config(name, cfg))
    }

    pub fn from_data(data: AnimationData) -> AnimationHandle {
        Arc::new(Self {
            id: ResourceId::new_v4(),
            users: AtomicU32::new(0),
            keep_alive: AtomicU32::new(0),
            data: RwLock::new(data),
        })
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> String {
        self.read().name.clone()
    }

    /// Shared access for evaluation and display.
    pub fn read(&self) -> RwLockReadGuard<'_, AnimationData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Exclusive access for structural edits.
    pub fn write(&self) -> RwLockWriteGuard<'_, AnimationData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of bindings currently pointing at this resource.
    #[inline]
    pub fn reference_count(&self) -> u32 {
        self.users.load(Ordering::Acquire)
    }

    #[inline]
    pub fn keep_alive_count(&self) -> u32 {
        self.keep_alive.load(Ordering::Acquire)
    }

    pub fn is_eligible_for_destruction(&self) -> bool {
        self.reference_count() == 0 && self.keep_alive_count() == 0
    }

    /// Hold the resource alive independently of bindings.
    pub fn keep_alive(self: &Arc<Self>) -> KeepAlive {
        self.keep_alive.fetch_add(1, Ordering::AcqRel);
        KeepAlive {
            resource: Arc::clone(self),
        }
    }

    /// Pick the output `binding` should animate.
    ///
    /// Precedence: the binding's selected stable index (only when the binding is
    /// already bound to this resource), then its output-name override, then the
    /// owner's display name. Outputs tagged for another kind than the owner's
    /// never match.
    pub fn find_suitable_output_for(&self, binding: &AnimationBinding) -> Option<OutputIndex> {
        let state = binding.snapshot();
        let kind = binding.id_type();
        let data = self.read();

        if state.points_at(self) {
            if let Some(found) = state
                .selected_output
                .and_then(|i| data.find_output(i))
                .filter(|o| o.accepts(kind))
            {
                return Some(found.stable_index());
            }
        }
        for name in [state.output_name.as_str(), binding.owner_name()] {
            if name.is_empty() {
                continue;
            }
            if let Some(found) = data.find_output_by_name_for(name, kind) {
                return Some(found.stable_index());
            }
        }
        None
    }

    /// Deep copy into a new resource with no users. Stable indices are preserved.
    pub fn duplicate(&self, name: &str) -> AnimationHandle {
        let mut data = self.read().clone();
        data.name = name.to_string();
        Self::from_data(data)
    }

    pub(crate) fn add_user(&self) -> u32 {
        self.users.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Panics on underflow: that can only be a bookkeeping bug in the registry.
    pub(crate) fn remove_user(&self) -> u32 {
        match self
            .users
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(prev) => prev - 1,
            Err(_) => panic!("reference count underflow on animation {}", self.id),
        }
    }
}

/// RAII keep-alive handle for an [`AnimationResource`].
#[derive(Debug)]
pub struct KeepAlive {
    resource: AnimationHandle,
}

impl KeepAlive {
    pub fn resource(&self) -> &AnimationHandle {
        &self.resource
    }
}

impl Clone for KeepAlive {
    fn clone(&self) -> Self {
        self.resource.keep_alive()
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        let prev = self.resource.keep_alive.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "keep-alive count underflow");
        if prev == 1 && self.resource.reference_count() == 0 {
            debug!(
                "animation {} released its last keep-alive and has no users",
                self.resource.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn add_layer_defaults() {
        let mut anim = AnimationData::new("Anim");
        let layer = anim.add_layer("layer name");
        assert_eq!(layer.name, "layer name");
        assert_eq!(layer.influence(), 1.0);
        assert_eq!(layer.mix_mode, MixMode::Replace);
        assert!(layer.strips().is_empty());
        assert_eq!(anim.active_layer(), Some(0));
        anim.add_layer("second");
        assert_eq!(anim.active_layer(), Some(1), "newest layer becomes active");
    }

    #[test]
    fn remove_layer_keeps_active_valid() {
        let mut anim = AnimationData::new("Anim");
        anim.add_layer("nul");
        anim.add_layer("een");
        anim.add_layer("twee");
        anim.add_strip(0, StripKind::Keyframe).unwrap();
        anim.add_strip(1, StripKind::Keyframe).unwrap();

        anim.set_active_layer(2).unwrap();
        anim.remove_layer(1).unwrap();
        assert_eq!(anim.layers().len(), 2);
        assert_eq!(anim.active_layer(), Some(1));
        assert_eq!(anim.layer(1).unwrap().name, "twee");

        anim.remove_layer(1).unwrap();
        assert_eq!(anim.active_layer(), Some(0));
        anim.remove_layer(0).unwrap();
        assert_eq!(anim.active_layer(), None);

        assert_eq!(anim.remove_layer(0).unwrap_err(), AnimError::LayerNotFound(0));
    }

    #[test]
    fn outputs_are_never_renumbered() {
        let mut anim = AnimationData::new("Anim");
        let a = anim.add_output("Cube").stable_index();
        let b = anim.add_output("Camera").stable_index();
        assert_eq!((a, b), (OutputIndex(1), OutputIndex(2)));

        anim.remove_output(a).unwrap();
        assert!(anim.find_output(a).is_none());
        assert_eq!(anim.find_output(b).unwrap().name, "Camera");

        let c = anim.add_output("Cube").stable_index();
        assert_eq!(c, OutputIndex(3));
        assert_eq!(anim.last_output_index(), OutputIndex(3));

        let err = anim.remove_output(a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn influence_clamps_by_default() {
        let mut anim = AnimationData::new("Anim");
        anim.add_layer("L");
        assert_eq!(anim.set_influence(0, 1.5).unwrap(), 1.0);
        assert_eq!(anim.set_influence(0, -0.5).unwrap(), 0.0);
        assert_eq!(anim.set_influence(0, 0.25).unwrap(), 0.25);
        assert_eq!(anim.layer(0).unwrap().influence(), 0.25);
        assert_eq!(
            anim.set_influence(0, f32::NAN).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(anim.set_influence(3, 0.5).unwrap_err(), AnimError::LayerNotFound(3));
    }

    #[test]
    fn influence_reject_policy() {
        let cfg = Config {
            influence_policy: InfluencePolicy::Reject,
            ..Config::default()
        };
        let mut anim = AnimationData::with_config("Anim", &cfg);
        anim.add_layer("L");
        let err = anim.set_influence(0, 1.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(anim.layer(0).unwrap().influence(), 1.0);
        assert_eq!(anim.set_influence(0, 1.0).unwrap(), 1.0);
    }

    #[test]
    fn mix_mode_by_name() {
        let mut anim = AnimationData::new("Anim");
        anim.add_layer("L");
        anim.set_mix_mode_named(0, "subtract").unwrap();
        assert_eq!(anim.layer(0).unwrap().mix_mode, MixMode::Subtract);
        let err = anim.set_mix_mode_named(0, "overlay").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(anim.layer(0).unwrap().mix_mode, MixMode::Subtract);
    }

    #[test]
    fn strips_get_unique_ids_and_can_be_removed() {
        let mut anim = AnimationData::new("Anim");
        anim.add_layer("L");
        let s0 = anim.add_strip(0, StripKind::Keyframe).unwrap().id();
        let s1 = anim.add_strip(0, StripKind::Keyframe).unwrap().id();
        let s2 = anim.add_strip(0, StripKind::Keyframe).unwrap().id();
        assert_ne!(s0, s1);
        assert_ne!(s1, s2);

        assert_eq!(anim.remove_strip(0, 1).unwrap().id(), s1);
        assert_eq!(anim.layer(0).unwrap().strips().len(), 2);
        assert_eq!(
            anim.remove_strip(0, 5).unwrap_err(),
            AnimError::StripNotFound { layer: 0, strip: 5 }
        );
        assert_eq!(
            anim.add_strip(4, StripKind::Keyframe).unwrap_err(),
            AnimError::LayerNotFound(4)
        );
    }

    #[test]
    fn keep_alive_blocks_eligibility() {
        let anim = AnimationResource::create("Anim");
        assert!(anim.is_eligible_for_destruction());
        let hold = anim.keep_alive();
        let hold2 = hold.clone();
        assert_eq!(anim.keep_alive_count(), 2);
        assert!(!anim.is_eligible_for_destruction());
        drop(hold);
        drop(hold2);
        assert!(anim.is_eligible_for_destruction());
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn user_underflow_is_fatal() {
        let anim = AnimationResource::create("Anim");
        anim.remove_user();
    }

    #[test]
    fn duplicate_starts_without_users() {
        let anim = AnimationResource::create("Anim");
        {
            let mut data = anim.write();
            data.add_layer("L");
            data.add_output("Cube");
        }
        anim.add_user();
        let copy = anim.duplicate("Anim.001");
        assert_eq!(copy.reference_count(), 0);
        assert_ne!(copy.id(), anim.id());
        assert_eq!(copy.name(), "Anim.001");
        let data = copy.read();
        assert_eq!(data.layers().len(), 1);
        assert_eq!(data.outputs()[0].stable_index(), OutputIndex(1));
        assert_eq!(data.last_output_index(), OutputIndex(1));
    }

    #[test]
    fn name_lookup_respects_kind_tags() {
        let mut anim = AnimationData::new("Anim");
        let camera_cube = anim.add_output_for("Cube", "CA").stable_index();
        let found = |anim: &AnimationData, kind| {
            anim.find_output_by_name_for("Cube", kind)
                .map(|o| o.stable_index())
        };
        assert_eq!(found(&anim, Some("CA")), Some(camera_cube));
        assert_eq!(found(&anim, Some("OB")), None);
        assert_eq!(found(&anim, None), None);

        let plain = anim.add_output("Cube").stable_index();
        assert_eq!(found(&anim, Some("OB")), Some(plain));
        assert_eq!(anim.find_output_by_name("Cube").map(|o| o.stable_index()), Some(camera_cube));
    }
}
