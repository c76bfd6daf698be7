//! Animation Layers Core (engine-agnostic)
//!
//! Layered animation resources shared between scene objects. A resource holds
//! an ordered stack of layers (each with influence, mix mode and time-ranged
//! strips) plus the named outputs objects can animate. Objects reference a
//! resource through a binding; the registry keeps every resource's user count
//! equal to the number of bindings pointing at it, and the composition engine
//! blends a binding's layers into a pose for a given scene time.

pub mod animation;
pub mod binding;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod ids;
pub mod layer;
pub mod library;
pub mod output;
pub mod registry;
pub mod strip;
pub mod value;

// Re-exports for hosts
pub use animation::{AnimationData, AnimationHandle, AnimationResource, KeepAlive};
pub use binding::{AnimationBinding, BindingState, UpdateGuard};
pub use config::{Config, InfluencePolicy};
pub use display::{BoundAnimation, LayerRow, PanelSnapshot, StripRow};
pub use engine::{CompositionEngine, StripEvalError, StripEvaluator, StripResult};
pub use error::{AnimError, ErrorKind, Result};
pub use ids::{IdAllocator, OutputIndex, OwnerId, ResourceId, StripId};
pub use layer::{Layer, MixMode};
pub use library::AnimationLibrary;
pub use output::Output;
pub use registry::{BindingRegistry, ObjectLifecycle, Rebind, Released};
pub use strip::{Strip, StripKind};
pub use value::{ChannelKey, Evaluation, Pose};
