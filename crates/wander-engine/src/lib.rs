pub mod api;
pub mod core;
pub mod systems;
pub mod renderer;
pub mod input;
pub mod storage;
pub mod extensions;

// Re-export key types at crate root for convenience
pub use api::game::{Game, GameConfig, EngineContext, RenderContext};
pub use api::types::{EntityId, UiMessage};
pub use core::time::FrameClock;
pub use renderer::instance::{KeywordInstance, ElementInstance, InstanceBuffer, RenderBuffer, ElementBuffer};
pub use renderer::camera::{Camera3D, CameraUniform};
pub use input::queue::{InputEvent, InputQueue, Key};
pub use storage::store::{KeyValueStore, MemoryStore, StoreError};
pub use systems::effects::{
    EffectsState, EffectId, Rng, ParticleParams, ParticleSystem, Behavior,
    FadeWindow, GlyphTarget, Milestone, Phase,
};

// Extensions: decoupled optional systems
pub use extensions::{
    Curve, Easing, lerp, ease, ease_vec3, approach_factor,
    Animate, Property, Scheduler, TaskId, Timeline, TimelineId, Tween, TweenValue,
};
