//! Game adapter: decodes host chrome events into commands and drives `App`.

use wander_engine::api::game::GameConfig;
use wander_engine::input::queue::{InputEvent, InputQueue};
use wander_engine::{EngineContext, Game, RenderContext};

use crate::app::{App, Command, View};
use crate::config::FieldConfig;

// ── Custom event kinds from the host UI ──────────────────────────────

const CUSTOM_NAV_FIELD: u32 = 1;
const CUSTOM_NAV_GALLERY: u32 = 2;
const CUSTOM_NAV_ABOUT: u32 = 3;
const CUSTOM_MENU_HOME: u32 = 4;
const CUSTOM_MENU_RESET: u32 = 5;
const CUSTOM_DETAIL_BACK: u32 = 6;
const CUSTOM_FIND_START: u32 = 7;
const CUSTOM_HELP_DISMISS: u32 = 8;

// ── Text event kinds ─────────────────────────────────────────────────

const TEXT_FIND_ADD: u32 = 1;
const TEXT_FIND_REMOVE: u32 = 2;

pub struct WanderField {
    app: App,
}

impl WanderField {
    pub fn new() -> Self {
        Self::with_config(FieldConfig::default())
    }

    pub fn with_config(config: FieldConfig) -> Self {
        Self { app: App::headless(config) }
    }

    /// Build from a host-supplied JSON override; falls back to defaults when it is rejected.
    pub fn from_config_json(json: &str) -> Self {
        match FieldConfig::from_json(json) {
            Ok(config) => Self::with_config(config),
            Err(err) => {
                log::warn!("field: {}; using defaults", err);
                Self::new()
            }
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

impl Default for WanderField {
    fn default() -> Self {
        Self::new()
    }
}

/// Host chrome event to command, if it is one.
fn decode(event: &InputEvent) -> Option<Command> {
    match event {
        InputEvent::Custom { kind, .. } => match *kind {
            CUSTOM_NAV_FIELD => Some(Command::Navigate(View::Field)),
            CUSTOM_NAV_GALLERY => Some(Command::Navigate(View::Gallery)),
            CUSTOM_NAV_ABOUT => Some(Command::Navigate(View::About)),
            CUSTOM_MENU_HOME => Some(Command::Home),
            CUSTOM_MENU_RESET => Some(Command::Reset),
            CUSTOM_DETAIL_BACK => Some(Command::DetailBack),
            CUSTOM_FIND_START => Some(Command::FindStart),
            CUSTOM_HELP_DISMISS => Some(Command::DismissHelp),
            _ => None,
        },
        InputEvent::Text { kind, text } => match *kind {
            TEXT_FIND_ADD => Some(Command::FindAdd(text.clone())),
            TEXT_FIND_REMOVE => Some(Command::FindRemove(text.clone())),
            _ => None,
        },
        _ => None,
    }
}

impl Game for WanderField {
    fn config(&self) -> GameConfig {
        GameConfig {
            seed: self.app.config().seed,
            ..GameConfig::default()
        }
    }

    fn init(&mut self, ctx: &mut EngineContext) {
        self.app.init(ctx);
    }

    fn update(&mut self, ctx: &mut EngineContext, input: &InputQueue) {
        for event in input.iter() {
            match decode(event) {
                Some(command) => self.app.command(ctx, command),
                None => self.app.handle_event(ctx, event),
            }
        }
        self.app.advance(ctx);
    }

    fn render(&self, ctx: &mut RenderContext) {
        self.app.render(ctx);
    }
}
