pub mod instance;
pub mod camera;

// Re-export key types for convenient access
pub use instance::{KeywordInstance, ElementInstance, InstanceBuffer, RenderBuffer, ElementBuffer};
pub use camera::{Camera3D, CameraUniform};
