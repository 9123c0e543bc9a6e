use wander_engine::{
    Game, GameConfig, EngineContext, RenderContext,
    InputEvent, InputQueue, RenderBuffer, ElementBuffer,
    FrameClock, KeyValueStore,
};
use crate::storage::LocalStorage;

/// Generic game runner that wires up the engine loop.
///
/// Each concrete game creates a `thread_local!` GameRunner and exports free
/// functions via `#[wasm_bindgen]`, because wasm-bindgen cannot export
/// generic structs directly.
pub struct GameRunner<G: Game> {
    game: G,
    ctx: EngineContext,
    input: InputQueue,
    keywords: RenderBuffer,
    elements: ElementBuffer,
    clock: FrameClock,
    config: GameConfig,
    initialized: bool,
    /// Camera uniform, flattened for linear-memory reads.
    camera_buffer: Vec<f32>,
    /// Messages and requests produced by the last tick, as JSON arrays.
    outbox: String,
    pending_requests: String,
}

impl<G: Game> GameRunner<G> {
    /// Runner persisting through the browser's `localStorage`.
    pub fn new(game: G) -> Self {
        Self::with_store(game, Box::new(LocalStorage::new()))
    }

    pub fn with_store(game: G, store: Box<dyn KeyValueStore>) -> Self {
        let config = game.config();
        Self {
            ctx: EngineContext::with_config(&config, store),
            input: InputQueue::new(),
            keywords: RenderBuffer::with_capacity(config.max_instances),
            elements: ElementBuffer::with_capacity(config.max_elements),
            clock: FrameClock::new(config.max_frame_dt),
            camera_buffer: Vec::with_capacity(24),
            outbox: String::from("[]"),
            pending_requests: String::from("[]"),
            game,
            config,
            initialized: false,
        }
    }

    /// Initialize the game. Call once after construction.
    pub fn init(&mut self) {
        self.game.init(&mut self.ctx);
        self.initialized = true;
        self.flush_outbox();
    }

    /// Push an input event into the queue.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Run one frame tick: update game, advance effects, rebuild buffers.
    pub fn tick(&mut self, frame_dt: f32) {
        if !self.initialized {
            return;
        }

        // Clear per-frame transient data
        self.ctx.clear_frame_data();

        let dt = self.clock.advance(frame_dt);
        self.ctx.dt = dt;
        self.ctx.elapsed = self.clock.elapsed();

        self.game.update(&mut self.ctx, &self.input);
        self.ctx.effects.tick(dt);

        // Drain input after update
        self.input.drain();

        self.keywords.clear();
        self.elements.clear();
        {
            let mut render_ctx = RenderContext {
                keywords: &mut self.keywords,
                elements: &mut self.elements,
                camera: &self.ctx.camera,
            };
            self.game.render(&mut render_ctx);
        }

        // Rebuild effects buffer
        self.ctx.effects.rebuild_effects_buffer();

        let uniform = self.ctx.camera.uniform();
        self.camera_buffer.clear();
        self.camera_buffer.extend_from_slice(bytemuck::cast_slice::<_, f32>(&[uniform]));

        self.flush_outbox();
    }

    fn flush_outbox(&mut self) {
        let messages: Vec<&str> = self.ctx.messages.iter().map(|m| m.as_str()).collect();
        self.outbox = format!("[{}]", messages.join(","));
        self.pending_requests = serde_json::to_string(&self.ctx.requests).unwrap_or_else(|err| {
            log::warn!("failed to encode requests: {}", err);
            String::from("[]")
        });
    }

    // ---- Pointer accessors for linear-memory reads ----

    pub fn keywords_ptr(&self) -> *const f32 {
        self.keywords.instances_ptr()
    }

    pub fn keyword_count(&self) -> u32 {
        self.keywords.instance_count()
    }

    pub fn elements_ptr(&self) -> *const f32 {
        self.elements.instances_ptr()
    }

    pub fn element_count(&self) -> u32 {
        self.elements.instance_count()
    }

    pub fn effects_ptr(&self) -> *const f32 {
        self.ctx.effects.effects_buffer_ptr()
    }

    pub fn effects_vertex_count(&self) -> u32 {
        self.ctx.effects.effects_vertex_count() as u32
    }

    pub fn camera_ptr(&self) -> *const f32 {
        self.camera_buffer.as_ptr()
    }

    /// JSON array of UI messages produced by the last tick.
    pub fn messages(&self) -> String {
        self.outbox.clone()
    }

    /// JSON array of payload keys the game asked for during the last tick.
    pub fn requests(&self) -> String {
        self.pending_requests.clone()
    }

    // ---- Capacity accessors ----

    pub fn max_instances(&self) -> u32 {
        self.config.max_instances as u32
    }

    pub fn max_elements(&self) -> u32 {
        self.config.max_elements as u32
    }

    pub fn max_effects_vertices(&self) -> u32 {
        self.config.max_effects_vertices as u32
    }
}
