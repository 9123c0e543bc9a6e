use wasm_bindgen::prelude::*;
use wander_engine::*;

pub mod app;
pub mod collection;
pub mod config;
pub mod error;
pub mod field;
pub mod finale;
pub mod find;
pub mod gallery;
mod game;
pub mod matching;
pub mod messages;
pub mod navigation;
pub mod overlay;
pub mod presentation;
pub mod project;
pub mod reveal;
pub mod session;
pub mod stage;

pub use game::WanderField;

wander_web::export_game!(WanderField, "wander-field", config = WanderField::from_config_json);
