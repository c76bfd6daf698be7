//! Core configuration for animlayers-core.

use serde::{Deserialize, Serialize};

/// How layer influence writes outside `[0, 1]` are handled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfluencePolicy {
    /// Clamp into `[0, 1]` and accept.
    #[default]
    Clamp,
    /// Fail with `OutOfRange`.
    Reject,
}

/// Configuration for editing policy and evaluation behaviour.
/// Keep this minimal; expand as needed without breaking API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub influence_policy: InfluencePolicy,

    /// Skip layers whose influence is exactly zero instead of blending them.
    pub skip_zero_influence_layers: bool,

    /// Emit a warning for every malformed strip/layer skipped during evaluation.
    pub warn_on_skipped: bool,

    /// Initial capacity hint for the binding registry.
    pub registry_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            influence_policy: InfluencePolicy::Clamp,
            skip_zero_influence_layers: true,
            warn_on_skipped: true,
            registry_capacity: 64,
        }
    }
}

impl Config {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
