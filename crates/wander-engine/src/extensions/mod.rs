// extensions/mod.rs
//
// Optional extension modules for the engine.
// These are decoupled from the render path; games opt in by owning a
// `Scheduler` and implementing `Animate` for their own state.

pub mod easing;
pub mod scheduler;

pub use easing::{Curve, Easing, lerp, ease, ease_vec3, approach_factor};
pub use scheduler::{Animate, Property, Scheduler, TaskId, Timeline, TimelineId, Tween, TweenValue};
