//! Read-only snapshot of one object's layers, shaped for a side panel.
//!
//! Layers are listed top-first (reverse index order) so the layer applied last
//! during evaluation is drawn at the top.

use std::fmt;

use serde::Serialize;

use crate::animation::AnimationData;
use crate::ids::{OutputIndex, OwnerId, ResourceId};
use crate::layer::MixMode;
use crate::registry::BindingRegistry;
use crate::strip::StripKind;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StripRow {
    /// "Strip N:", 1-based.
    pub label: String,
    pub kind: StripKind,
    pub frame_start: f32,
    pub frame_end: f32,
    pub frame_offset: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerRow {
    /// Position in the stack; 0 is the bottom.
    pub index: usize,
    /// "Layer N:", 1-based.
    pub label: String,
    pub name: String,
    pub influence: f32,
    pub mix_mode: MixMode,
    pub active: bool,
    pub strips: Vec<StripRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundAnimation {
    pub resource: ResourceId,
    pub name: String,
    pub users: u32,
    /// Top layer first.
    pub layers: Vec<LayerRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub owner: OwnerId,
    pub selected_output: Option<OutputIndex>,
    pub output_name: String,
    /// `None` when the object has no (live) animation bound.
    pub animation: Option<BoundAnimation>,
}

impl PanelSnapshot {
    /// Capture what the panel shows for `owner`. `None` when the object has no binding.
    pub fn capture(registry: &BindingRegistry, owner: OwnerId) -> Option<Self> {
        let binding = registry.binding(owner)?;
        let state = binding.snapshot();
        let animation = state.resource().map(|resource| {
            let data = resource.read();
            BoundAnimation {
                resource: resource.id(),
                name: data.name.clone(),
                users: resource.reference_count(),
                layers: layer_rows(&data),
            }
        });
        Some(Self {
            owner,
            selected_output: state.selected_output,
            output_name: state.output_name,
            animation,
        })
    }

    pub fn layers(&self) -> &[LayerRow] {
        self.animation.as_ref().map_or(&[], |a| a.layers.as_slice())
    }

    pub fn has_layers(&self) -> bool {
        !self.layers().is_empty()
    }
}

fn layer_rows(data: &AnimationData) -> Vec<LayerRow> {
    let active = data.active_layer();
    data.layers_top_down()
        .map(|(index, layer)| LayerRow {
            index,
            label: format!("Layer {}:", index + 1),
            name: layer.name.clone(),
            influence: layer.influence(),
            mix_mode: layer.mix_mode,
            active: active == Some(index),
            strips: layer
                .strips()
                .iter()
                .enumerate()
                .map(|(i, strip)| StripRow {
                    label: format!("Strip {}:", i + 1),
                    kind: strip.kind(),
                    frame_start: strip.frame_start,
                    frame_end: strip.frame_end,
                    frame_offset: strip.frame_offset,
                })
                .collect(),
        })
        .collect()
}

/// Plain-text outline, one row per line.
impl fmt::Display for PanelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(anim) = &self.animation else {
            writeln!(f, "Animation: -")?;
            return writeln!(f, "No layers");
        };
        writeln!(f, "Animation: {} ({} users)", anim.name, anim.users)?;
        match self.selected_output {
            Some(index) => writeln!(f, "Output: {index} {}", self.output_name)?,
            None => writeln!(f, "Output: -")?,
        }
        if anim.layers.is_empty() {
            return writeln!(f, "No layers");
        }
        for layer in &anim.layers {
            let marker = if layer.active { "*" } else { " " };
            writeln!(
                f,
                "{marker}{} {} influence={:.3} mix={}",
                layer.label, layer.name, layer.influence, layer.mix_mode
            )?;
            for strip in &layer.strips {
                writeln!(
                    f,
                    "    {} {} [{}, {}] offset={}",
                    strip.label, strip.kind, strip.frame_start, strip.frame_end, strip.frame_offset
                )?;
            }
        }
        Ok(())
    }
}
