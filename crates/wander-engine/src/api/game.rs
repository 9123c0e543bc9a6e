use serde::Serialize;

use crate::api::types::{EntityId, UiMessage};
use crate::input::queue::InputQueue;
use crate::renderer::camera::Camera3D;
use crate::renderer::instance::{ElementBuffer, RenderBuffer};
use crate::storage::store::{KeyValueStore, MemoryStore};
use crate::systems::effects::EffectsState;

/// Configuration for the engine, provided by the game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Largest frame delta handed to a tick (default: 0.1 s).
    pub max_frame_dt: f32,
    /// Initial viewport width in pixels.
    pub viewport_width: f32,
    /// Initial viewport height in pixels.
    pub viewport_height: f32,
    /// Maximum number of keyword instances (default: 1024).
    pub max_instances: usize,
    /// Maximum number of overlay elements (default: 512).
    pub max_elements: usize,
    /// Maximum number of effects vertices (default: 16384).
    pub max_effects_vertices: usize,
    /// Seed for the effects RNG.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_frame_dt: 0.1,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            max_instances: 1024,
            max_elements: 512,
            max_effects_vertices: 16384,
            seed: 42,
        }
    }
}

/// The core contract every game must fulfill.
pub trait Game {
    /// Return engine configuration. Called once before init.
    fn config(&self) -> GameConfig {
        GameConfig::default()
    }

    /// Setup initial state: read persisted data, request payloads, announce UI.
    fn init(&mut self, ctx: &mut EngineContext);

    /// The frame tick. Handle queued input, advance sequences, mutate state.
    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue);

    /// Read-only render pass: fill the instance buffers for this frame.
    fn render(&self, _ctx: &mut RenderContext) {}
}

/// Mutable access to engine state, passed to Game::init and Game::update.
pub struct EngineContext {
    pub effects: EffectsState,
    pub camera: Camera3D,
    pub store: Box<dyn KeyValueStore>,
    /// Messages for the host, cleared every frame.
    pub messages: Vec<UiMessage>,
    /// Payload keys the game asked the host to fetch, cleared every frame.
    pub requests: Vec<String>,
    /// Clamped delta of the current tick.
    pub dt: f32,
    /// Seconds since start.
    pub elapsed: f32,
    next_id: u32,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::with_store(Box::new(MemoryStore::new()))
    }

    /// Create an EngineContext backed by a host store.
    pub fn with_store(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_config(&GameConfig::default(), store)
    }

    pub fn with_config(config: &GameConfig, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            effects: EffectsState::with_capacity(config.seed, config.max_effects_vertices),
            camera: Camera3D::new(config.viewport_width, config.viewport_height),
            store,
            messages: Vec::new(),
            requests: Vec::new(),
            dt: 0.0,
            elapsed: 0.0,
            next_id: 1,
        }
    }

    /// Generate the next unique ID.
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Queue a JSON message for the host. Serialization failures are logged and dropped.
    pub fn post<T: Serialize>(&mut self, message: &T) {
        match serde_json::to_string(message) {
            Ok(json) => self.messages.push(UiMessage(json)),
            Err(err) => log::warn!("dropping UI message: {}", err),
        }
    }

    /// Ask the host to fetch a payload; it comes back as `InputEvent::Payload`.
    pub fn request(&mut self, key: impl Into<String>) {
        self.requests.push(key.into());
    }

    /// Clear per-frame transient data (messages, requests).
    pub fn clear_frame_data(&mut self) {
        self.messages.clear();
        self.requests.clear();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Render context handed to `Game::render`.
pub struct RenderContext<'a> {
    pub keywords: &'a mut RenderBuffer,
    pub elements: &'a mut ElementBuffer,
    pub camera: &'a Camera3D,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_unique() {
        let mut ctx = EngineContext::new();
        let a = ctx.next_id();
        let b = ctx.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn post_serializes_and_clear_resets() {
        let mut ctx = EngineContext::new();
        ctx.post(&json!({"type": "view", "view": "field"}));
        ctx.request("mobius");
        assert_eq!(ctx.messages.len(), 1);
        assert!(ctx.messages[0].as_str().contains("\"view\":\"field\""));
        ctx.clear_frame_data();
        assert!(ctx.messages.is_empty());
        assert!(ctx.requests.is_empty());
    }

    #[test]
    fn store_is_swappable() {
        let mut ctx = EngineContext::with_store(Box::new(MemoryStore::new().with_entry("k", "v")));
        assert_eq!(ctx.store.get("k").unwrap().as_deref(), Some("v"));
        ctx.store.remove("k").unwrap();
        assert_eq!(ctx.store.get("k").unwrap(), None);
    }
}
