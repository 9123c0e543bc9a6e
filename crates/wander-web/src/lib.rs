pub mod runner;
pub mod storage;

pub use runner::GameRunner;
pub use storage::LocalStorage;

/// Generate all `#[wasm_bindgen]` exports for a game.
///
/// Generates:
/// - `thread_local!` storage for the GameRunner
/// - `with_runner()` helper function
/// - All wasm-bindgen exports (init, tick, input handlers, payload delivery,
///   buffer accessors, message draining)
///
/// # Usage
///
/// ```ignore
/// use wasm_bindgen::prelude::*;
/// use wander_engine::*;
///
/// mod game;
/// use game::MyScene;
///
/// wander_web::export_game!(MyScene, "my-scene");
/// ```
///
/// # Arguments
///
/// - `$game_type`: The game struct type that implements `wander_engine::Game`
///   and has a `new()` constructor
/// - `$game_name`: A string literal used in the initialization log message
/// - `config = $from_config` (optional): a `fn(&str) -> $game_type` that also
///   exports `game_init_with_config(json)` for hosts that pass overrides
#[macro_export]
macro_rules! export_game {
    ($game_type:ty, $game_name:literal, config = $from_config:path) => {
        $crate::export_game!($game_type, $game_name);

        #[wasm_bindgen]
        pub fn game_init_with_config(config: &str) {
            install_game(|| $from_config(config));
        }
    };
    ($game_type:ty, $game_name:literal) => {
        use std::cell::RefCell;

        thread_local! {
            static RUNNER: RefCell<Option<$crate::GameRunner<$game_type>>> = RefCell::new(None);
        }

        fn with_runner<R>(f: impl FnOnce(&mut $crate::GameRunner<$game_type>) -> R) -> R {
            RUNNER.with(|cell| {
                let mut borrow = cell.borrow_mut();
                let runner = borrow.as_mut().expect("Game not initialized. Call game_init() first.");
                f(runner)
            })
        }

        fn install_game(make: impl FnOnce() -> $game_type) {
            console_error_panic_hook::set_once();
            let _ = console_log::init_with_level(log::Level::Info);

            let runner = $crate::GameRunner::new(make());

            RUNNER.with(|cell| {
                *cell.borrow_mut() = Some(runner);
            });

            with_runner(|r| r.init());
            log::info!("{}: initialized", $game_name);
        }

        #[wasm_bindgen]
        pub fn game_init() {
            install_game(<$game_type>::new);
        }

        #[wasm_bindgen]
        pub fn game_tick(dt: f32) {
            with_runner(|r| r.tick(dt));
        }

        // ---- Input ----

        #[wasm_bindgen]
        pub fn game_pointer_down(x: f32, y: f32) {
            with_runner(|r| r.push_input(InputEvent::PointerDown { x, y }));
        }

        #[wasm_bindgen]
        pub fn game_pointer_move(x: f32, y: f32) {
            with_runner(|r| r.push_input(InputEvent::PointerMove { x, y }));
        }

        #[wasm_bindgen]
        pub fn game_key_down(key_code: u32) {
            if let Some(key) = Key::from_code(key_code) {
                with_runner(|r| r.push_input(InputEvent::KeyDown { key }));
            }
        }

        #[wasm_bindgen]
        pub fn game_key_up(key_code: u32) {
            if let Some(key) = Key::from_code(key_code) {
                with_runner(|r| r.push_input(InputEvent::KeyUp { key }));
            }
        }

        #[wasm_bindgen]
        pub fn game_wheel(delta: f32) {
            with_runner(|r| r.push_input(InputEvent::Wheel { delta }));
        }

        #[wasm_bindgen]
        pub fn game_resize(width: f32, height: f32) {
            with_runner(|r| r.push_input(InputEvent::Resize { width, height }));
        }

        #[wasm_bindgen]
        pub fn game_custom_event(kind: u32, a: f32, b: f32, c: f32) {
            with_runner(|r| r.push_input(InputEvent::Custom { kind, a, b, c }));
        }

        #[wasm_bindgen]
        pub fn game_text(kind: u32, text: &str) {
            with_runner(|r| r.push_input(InputEvent::Text { kind, text: text.to_string() }));
        }

        #[wasm_bindgen]
        pub fn game_payload(key: &str, body: &str) {
            with_runner(|r| r.push_input(InputEvent::Payload {
                key: key.to_string(),
                body: Ok(body.to_string()),
            }));
        }

        #[wasm_bindgen]
        pub fn game_payload_failed(key: &str, reason: &str) {
            with_runner(|r| r.push_input(InputEvent::Payload {
                key: key.to_string(),
                body: Err(reason.to_string()),
            }));
        }

        // ---- Data accessors ----

        #[wasm_bindgen]
        pub fn get_keywords_ptr() -> *const f32 {
            with_runner(|r| r.keywords_ptr())
        }

        #[wasm_bindgen]
        pub fn get_keyword_count() -> u32 {
            with_runner(|r| r.keyword_count())
        }

        #[wasm_bindgen]
        pub fn get_elements_ptr() -> *const f32 {
            with_runner(|r| r.elements_ptr())
        }

        #[wasm_bindgen]
        pub fn get_element_count() -> u32 {
            with_runner(|r| r.element_count())
        }

        #[wasm_bindgen]
        pub fn get_effects_ptr() -> *const f32 {
            with_runner(|r| r.effects_ptr())
        }

        #[wasm_bindgen]
        pub fn get_effects_vertex_count() -> u32 {
            with_runner(|r| r.effects_vertex_count())
        }

        #[wasm_bindgen]
        pub fn get_camera_ptr() -> *const f32 {
            with_runner(|r| r.camera_ptr())
        }

        #[wasm_bindgen]
        pub fn get_messages() -> String {
            with_runner(|r| r.messages())
        }

        #[wasm_bindgen]
        pub fn get_requests() -> String {
            with_runner(|r| r.requests())
        }

        // ---- Capacity accessors ----

        #[wasm_bindgen]
        pub fn get_max_instances() -> u32 {
            with_runner(|r| r.max_instances())
        }

        #[wasm_bindgen]
        pub fn get_max_elements() -> u32 {
            with_runner(|r| r.max_elements())
        }

        #[wasm_bindgen]
        pub fn get_max_effects_vertices() -> u32 {
            with_runner(|r| r.max_effects_vertices())
        }
    };
}
