//! Shared scene fixtures for animlayers tests and benches.
//!
//! Scenes live under `fixtures/scenes/` at the workspace root and are indexed
//! by `fixtures/manifest.json`. Each scene describes one animation resource,
//! the objects bound to it, and the poses expected at given times. Strips carry
//! constant channel values so tests can evaluate them without a curve system.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// One channel value, as written in scene files.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ChannelValue {
    pub path: String,
    #[serde(default)]
    pub index: u32,
    pub value: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StripFixture {
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Omitted bounds mean an infinite strip.
    #[serde(default)]
    pub start: Option<f32>,
    #[serde(default)]
    pub end: Option<f32>,
    #[serde(default)]
    pub offset: f32,
    /// Output name → constant channels this strip contributes to that output.
    #[serde(default)]
    pub channels: HashMap<String, Vec<ChannelValue>>,
}

fn default_kind() -> String {
    "keyframe".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct LayerFixture {
    pub name: String,
    #[serde(default = "default_influence")]
    pub influence: f32,
    #[serde(default = "default_mix_mode")]
    pub mix_mode: String,
    #[serde(default)]
    pub strips: Vec<StripFixture>,
}

fn default_influence() -> f32 {
    1.0
}

fn default_mix_mode() -> String {
    "replace".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnimationFixture {
    pub name: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Bottom layer first.
    #[serde(default)]
    pub layers: Vec<LayerFixture>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BindingFixture {
    /// Object display name.
    pub object: String,
    /// Whether the object is bound to the scene's animation.
    #[serde(default = "default_true")]
    pub bound: bool,
    /// Output-name override; the object name is used when absent.
    #[serde(default)]
    pub output_name: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct Expectation {
    pub object: String,
    pub time: f32,
    /// `None` expects no animation at all.
    #[serde(default)]
    pub channels: Option<Vec<ChannelValue>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SceneFixture {
    pub animation: AnimationFixture,
    #[serde(default)]
    pub bindings: Vec<BindingFixture>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
}

pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.scenes.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        read_to_string(rel)
    }

    pub fn load(name: &str) -> Result<SceneFixture> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        Ok(resolve_path(rel))
    }
}
