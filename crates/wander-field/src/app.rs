//! The field application: views, phases and the interaction rules.
//!
//! `App` owns every piece of state that lives between frames. Input handlers
//! and `advance` mutate it synchronously inside the tick; the long-running
//! choreographies are scheduler tasks whose cues come back through `on_cue`.

use std::f32::consts::FRAC_PI_2;

use glam::{Vec2, Vec3};
use serde::Serialize;
use wander_engine::{
    Camera3D, EffectId, EffectsState, Easing, EngineContext, EntityId, InputEvent, Milestone, ParticleParams,
    Phase, Property, RenderContext, Rng, Scheduler, TaskId, TimelineId, Tween,
};

use crate::collection::CollectionState;
use crate::config::FieldConfig;
use crate::error::FieldError;
use crate::field::{orbit_slot, Ambient, EntityState, WHITE};
use crate::finale::FinaleState;
use crate::find::FindSequence;
use crate::gallery::{CardTransition, Gallery};
use crate::matching::{check_match, hint_targets, Match};
use crate::messages::Message;
use crate::navigation::Navigator;
use crate::overlay::{ElementKind, Overlays};
use crate::presentation::{screen_to_plane, MonospaceLayout, TextLayout, TextStyle};
use crate::project::{Catalog, ProjectRecord};
use crate::reveal::RevealState;
use crate::session::{FindYourselfSession, SelectionSession};
use crate::stage::{Cue, Scene, Stage, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Field,
    Gallery,
    About,
    ProjectDetail,
}

/// Sub-state of the field view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldPhase {
    Landing,
    Shattering,
    Active,
    Unlocking,
    ProjectReveal,
    Ending,
}

/// UI chrome actions decoded from custom and text events.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Navigate(View),
    Home,
    Reset,
    DetailBack,
    FindAdd(String),
    FindRemove(String),
    FindStart,
    DismissHelp,
}

/// Scheduler, effect and overlay handles owned by one running sequence.
#[derive(Debug, Default)]
pub(crate) struct Handles {
    pub timers: Vec<TaskId>,
    pub timelines: Vec<TimelineId>,
    pub effects: Vec<EffectId>,
    pub elements: Vec<EntityId>,
}

impl Handles {
    /// Cancel everything the sequence started and drop its overlay elements.
    /// Cancelled work never fires its cue.
    pub fn teardown(
        &mut self,
        scheduler: &mut Scheduler<Target, Cue>,
        effects: &mut EffectsState,
        overlays: &mut Overlays,
    ) {
        for id in self.timers.drain(..) {
            scheduler.cancel_id(id);
        }
        for id in self.timelines.drain(..) {
            scheduler.cancel_timeline(id);
        }
        for id in self.effects.drain(..) {
            effects.remove(id);
        }
        for id in self.elements.drain(..) {
            scheduler.cancel(Target::Element(id), None);
            overlays.remove(id);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct HelpState {
    pub shown: bool,
    pub polling: bool,
    pub deadline: f32,
    pub element: Option<EntityId>,
}

pub struct App {
    pub(crate) config: FieldConfig,
    pub(crate) layout: Box<dyn TextLayout>,
    pub(crate) catalog: Catalog,
    pub(crate) collection: CollectionState,
    pub(crate) scene: Scene,
    pub(crate) scheduler: Scheduler<Target, Cue>,
    pub(crate) view: View,
    pub(crate) previous_view: View,
    pub(crate) phase: FieldPhase,
    pub(crate) selection: SelectionSession,
    pub(crate) find: FindYourselfSession,
    /// Words staged in the find-yourself form.
    pub(crate) find_input: Vec<String>,
    pub(crate) nav: Navigator,
    pub(crate) rng: Rng,
    pub(crate) field_ready: bool,
    pub(crate) finale_triggered: bool,
    pub(crate) help: HelpState,
    pub(crate) reveal: RevealState,
    pub(crate) find_seq: FindSequence,
    pub(crate) finale: FinaleState,
    pub(crate) shatter: Option<EffectId>,
    pub(crate) landing_title: Option<EntityId>,
    pub(crate) detail: Option<String>,
    pub(crate) time: f32,
    pub(crate) outbox: Vec<Message>,
}

impl App {
    pub fn new(config: FieldConfig, layout: Box<dyn TextLayout>) -> Self {
        Self {
            catalog: Catalog::new(&config.project_ids),
            collection: CollectionState::new(),
            scene: Scene::default(),
            scheduler: Scheduler::new(),
            view: View::Field,
            previous_view: View::Field,
            phase: FieldPhase::Landing,
            selection: SelectionSession::new(),
            find: FindYourselfSession::new(),
            find_input: Vec::new(),
            nav: Navigator::new(),
            rng: Rng::new(config.seed),
            field_ready: false,
            finale_triggered: false,
            help: HelpState::default(),
            reveal: RevealState::default(),
            find_seq: FindSequence::default(),
            finale: FinaleState::default(),
            shatter: None,
            landing_title: None,
            detail: None,
            time: 0.0,
            outbox: Vec::new(),
            config,
            layout,
        }
    }

    /// App measuring text with the fixed-advance layout.
    pub fn headless(config: FieldConfig) -> Self {
        Self::new(config, Box::new(MonospaceLayout::default()))
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn phase(&self) -> FieldPhase {
        self.phase
    }

    pub fn collection(&self) -> &CollectionState {
        &self.collection
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionSession {
        &self.selection
    }

    pub fn finale_triggered(&self) -> bool {
        self.finale_triggered
    }

    pub fn finale_active(&self) -> bool {
        self.finale.active
    }

    /// Read the collection, request every project and show the landing title.
    pub fn init(&mut self, ctx: &mut EngineContext) {
        self.collection = CollectionState::load(ctx.store.as_ref(), &self.config.storage_key);
        self.catalog = Catalog::new(&self.config.project_ids);
        for id in &self.config.project_ids {
            ctx.request(id.clone());
        }
        self.show_landing_title(ctx);
        self.post_view();
        self.post_progress();
        log::info!(
            "field: requested {} projects, {} already collected",
            self.config.project_ids.len(),
            self.collection.len()
        );
        if self.catalog.is_complete() {
            self.populate(ctx);
        }
        self.flush(ctx);
    }

    pub fn handle_event(&mut self, ctx: &mut EngineContext, event: &InputEvent) {
        match event {
            InputEvent::PointerDown { x, y } => self.click(ctx, Vec2::new(*x, *y)),
            InputEvent::PointerMove { x, y } => self.hover(&ctx.camera, Vec2::new(*x, *y)),
            InputEvent::KeyDown { key } => self.nav.press(*key),
            InputEvent::KeyUp { key } => self.nav.release(*key),
            InputEvent::Wheel { delta } => self.scroll(*delta),
            InputEvent::Resize { width, height } => ctx.camera.resize(*width, *height),
            InputEvent::Payload { key, body } => self.deliver(ctx, key, body),
            InputEvent::Custom { kind, .. } | InputEvent::Text { kind, .. } => {
                log::debug!("field: unhandled chrome event {}", kind);
            }
        }
    }

    pub fn command(&mut self, ctx: &mut EngineContext, command: Command) {
        log::debug!("field: {:?}", command);
        match command {
            Command::Navigate(view) => self.navigate(ctx, view),
            Command::Home => self.go_home(ctx),
            Command::Reset => self.reset(ctx),
            Command::DetailBack => self.hide_detail(),
            Command::FindAdd(text) => self.find_add(&text),
            Command::FindRemove(text) => self.find_remove(&text),
            Command::FindStart => self.find_start(ctx),
            Command::DismissHelp => self.dismiss_help(),
        }
    }

    /// One frame: milestones, navigation, tasks and cues, field physics, UI messages.
    pub fn advance(&mut self, ctx: &mut EngineContext) {
        let dt = ctx.dt;
        self.time += dt;

        for (effect, milestone) in ctx.effects.drain_milestones() {
            self.on_milestone(ctx, effect, milestone);
        }

        if self.view == View::Field && self.phase == FieldPhase::Active {
            self.nav.step(dt, &mut ctx.camera, &self.config.navigation);
        }

        if self.finale.spinning {
            self.scene.spin_angle += self.scene.spin_speed * dt;
            self.scene.field.orbit(self.scene.spin_angle);
        }

        self.scheduler.tick(dt, &mut Stage { scene: &mut self.scene, camera: &mut ctx.camera });
        for cue in self.scheduler.drain_fired() {
            self.on_cue(ctx, cue);
        }

        if self.finale.zooming {
            ctx.camera.look_at(Vec3::ZERO);
        }

        match self.view {
            View::Field if !self.finale.active => {
                let fog = (self.phase == FieldPhase::Active).then_some(&self.config.fog);
                let ambient = Ambient {
                    time: self.time,
                    radius: self.config.world_radius,
                    bob: self.config.bob_amplitude,
                    fog,
                };
                self.scene.field.advance(&ctx.camera, &ambient);
            }
            View::Gallery => self.scene.gallery.update(self.time, &self.collection),
            _ => {}
        }

        self.poll_help(ctx);
        self.apply_scroll(ctx);
        self.flush(ctx);
    }

    pub fn render(&self, ctx: &mut RenderContext) {
        let from_gallery = self.view == View::ProjectDetail && self.previous_view == View::Gallery;
        if self.view == View::Gallery || from_gallery {
            for instance in self.scene.gallery.instances() {
                ctx.keywords.push(instance);
            }
        } else if matches!(self.view, View::Field | View::ProjectDetail) {
            for instance in self.scene.field.instances() {
                ctx.keywords.push(instance);
            }
        }
        for instance in self.scene.overlays.instances() {
            ctx.elements.push(instance);
        }
    }

    // -- Dispatch --

    fn on_milestone(&mut self, ctx: &mut EngineContext, effect: EffectId, milestone: Milestone) {
        match milestone {
            Milestone::Entered(Phase::Drift) if self.reveal.effect == Some(effect) => {
                if let Some(sentence) = &self.reveal.sentence {
                    let glyphs = sentence.glyph_ids();
                    self.show_glyphs(&glyphs);
                }
            }
            Milestone::Entered(Phase::Drift) if self.find_seq.effect == Some(effect) => {
                if let Some(sentence) = &self.find_seq.sentence {
                    let glyphs = sentence.glyph_ids();
                    self.show_glyphs(&glyphs);
                }
            }
            Milestone::Finished if self.finale.gather == Some(effect) => self.start_word_cycle(ctx),
            Milestone::Finished if self.shatter == Some(effect) => self.shatter = None,
            _ => {}
        }
    }

    fn on_cue(&mut self, ctx: &mut EngineContext, cue: Cue) {
        log::debug!("field: cue {:?}", cue);
        match cue {
            Cue::ShatterDone => {
                if self.phase == FieldPhase::Shattering {
                    self.enter_active();
                }
            }
            Cue::HelpCheck => self.help.polling = !self.help.shown,
            Cue::HelpDismissed(id) | Cue::RemoveElement(id) => {
                self.scene.overlays.remove(id);
            }

            Cue::RevealExplode => self.reveal_explode(ctx),
            Cue::RevealBlur => self.reveal_blur(ctx),
            Cue::RevealSentenceDone => self.reveal_sentence_done(ctx),
            Cue::RevealSentenceGone => self.reveal_sentence_gone(),
            Cue::RevealScrollStage => self.reveal_scroll_stage(ctx),
            Cue::RevealDetailShown => self.reveal_detail_shown(ctx),

            Cue::FindExplode => self.find_explode(ctx),
            Cue::FindSentenceDone => self.find_sentence_done(),
            Cue::FindScatterDone => self.finish_find_sequence(ctx),

            Cue::FinaleSpinDone => self.finale.spinning = false,
            Cue::FinaleExplosion => self.finale_explosion(ctx),
            Cue::FinaleWord(index) => self.finale_word(index),
            Cue::FinaleWordsDone => self.finale_words_done(),
            Cue::FinaleExplodeWord => self.finale_explode_word(ctx),
            Cue::FinaleMessage => self.finale_message(ctx),
            Cue::FinaleScatter => self.finale_scatter(),
            Cue::FinaleRestore => self.restore_after_finale(ctx, true),

            Cue::GalleryOpened(card) => self.card_opened(card),
            Cue::GalleryReturned => {
                if let Some(t) = self.scene.gallery.transition.take() {
                    if let Some(card) = self.scene.gallery.get_mut(t.card) {
                        card.transitioning = false;
                    }
                }
            }
        }
    }

    // -- Messages --

    pub(crate) fn post_view(&mut self) {
        self.outbox.push(Message::View { view: self.view, phase: self.phase });
    }

    pub(crate) fn set_phase(&mut self, phase: FieldPhase) {
        if self.phase != phase {
            log::debug!("field: phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
        self.post_view();
    }

    pub(crate) fn post_progress(&mut self) {
        let collected = self.catalog.projects().filter(|p| self.collection.contains(&p.id)).count();
        self.outbox.push(Message::Progress { collected, total: self.catalog.len() });
    }

    pub(crate) fn post_collected_bar(&mut self, visible: bool) {
        let words: Vec<String> =
            self.selection.words().iter().chain(self.find.selection.words()).cloned().collect();
        self.outbox.push(Message::CollectedBar { words, visible: visible && self.view == View::Field });
    }

    pub(crate) fn post_gallery(&mut self) {
        let projects: Vec<&ProjectRecord> = self.catalog.projects().collect();
        let cards = self.scene.gallery.card_infos(&projects);
        self.outbox.push(Message::Gallery { cards });
    }

    fn flush(&mut self, ctx: &mut EngineContext) {
        for message in self.scene.overlays.drain_messages() {
            ctx.post(&message);
        }
        for message in self.outbox.drain(..) {
            ctx.post(&message);
        }
    }

    // -- Data load --

    fn deliver(&mut self, ctx: &mut EngineContext, key: &str, body: &Result<String, String>) {
        let body = body.as_ref().map(String::as_str).map_err(String::as_str);
        if let Err(err) = self.catalog.deliver(key, body) {
            log::warn!("field: {}", err);
        }
        if self.catalog.is_complete() && !self.field_ready {
            self.populate(ctx);
        }
    }

    /// Spawn the vocabulary once every project has reported.
    fn populate(&mut self, ctx: &mut EngineContext) {
        self.field_ready = true;
        for word in self.catalog.vocabulary() {
            self.spawn_keyword(ctx, &word, false);
        }
        let pending = std::mem::take(&mut self.find.pending);
        if !pending.is_empty() {
            self.apply_find_words(ctx, &pending);
        }
        self.rebuild_gallery(ctx);
        self.post_progress();
        log::info!(
            "field: {} projects loaded, {} keywords",
            self.catalog.len(),
            self.scene.field.len()
        );
    }

    pub(crate) fn spawn_keyword(&mut self, ctx: &mut EngineContext, word: &str, user_submitted: bool) -> EntityId {
        let id = ctx.next_id();
        let (id, created) = self.scene.field.spawn(id, word, &mut self.rng, self.config.world_radius);
        if created {
            if let Some(e) = self.scene.field.get_mut(id) {
                e.user_submitted = user_submitted;
                self.outbox.push(Message::KeywordSpawned { id, word: e.word.clone(), user_submitted });
            }
        }
        id
    }

    pub(crate) fn rebuild_gallery(&mut self, ctx: &mut EngineContext) {
        let projects: Vec<&ProjectRecord> = self.catalog.projects().collect();
        for card in &self.scene.gallery.cards {
            self.scheduler.cancel(Target::Card(card.id), None);
        }
        self.scene.gallery =
            Gallery::build(&projects, &self.collection, &self.config.gallery, &mut self.rng, || ctx.next_id());
        self.post_gallery();
    }

    // -- Landing --

    fn show_landing_title(&mut self, ctx: &mut EngineContext) {
        if self.landing_title.is_some() {
            return;
        }
        let id = ctx.next_id();
        self.scene.overlays.create(id, ElementKind::LandingTitle, &self.config.landing_title, None, 0);
        if let Some(e) = self.scene.overlays.get_mut(id) {
            e.opacity = 1.0;
        }
        self.landing_title = Some(id);
    }

    fn remove_landing_title(&mut self) {
        if let Some(id) = self.landing_title.take() {
            self.scheduler.cancel(Target::Element(id), None);
            self.scene.overlays.remove(id);
        }
    }

    /// World points of the landing title's glyphs on the shatter plane.
    fn landing_origins(&self, camera: &Camera3D) -> Vec<Vec3> {
        let title = &self.config.landing_title;
        let rects = self.layout.glyph_rects(title, TextStyle::LandingTitle, camera.viewport);
        title
            .chars()
            .zip(rects)
            .filter(|(c, _)| !c.is_whitespace())
            .filter_map(|(_, r)| screen_to_plane(camera, r.center(), self.config.particles.shatter_depth))
            .collect()
    }

    fn shatter(&mut self, ctx: &mut EngineContext) {
        let p = &self.config.particles;
        let mut origins = self.landing_origins(&ctx.camera);
        if origins.is_empty() {
            log::warn!("field: {}", FieldError::MissingInterface("landing title glyphs"));
            origins.push(ctx.camera.to_world(Vec3::new(0.0, 0.0, -p.shatter_depth)));
        }
        let params = ParticleParams::burst(origins, p.shatter_count, p.shatter_lifespan)
            .with_jitter(Vec3::new(0.6, 0.4, 0.4));
        self.shatter = Some(ctx.effects.spawn(params));
        if let Some(title) = self.landing_title.and_then(|id| self.scene.overlays.get_mut(id)) {
            title.opacity = 0.0;
        }
        self.set_phase(FieldPhase::Shattering);
        self.scheduler.delay(self.config.interaction.shatter_delay, Cue::ShatterDone);
    }

    /// Landing is over: keywords fade in and the help prompt is scheduled.
    pub(crate) fn enter_active(&mut self) {
        self.remove_landing_title();
        self.set_phase(FieldPhase::Active);
        let duration = self.config.interaction.fade_in_duration;
        for id in self.scene.field.ids() {
            self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Opacity, 0.6, duration), None);
        }
        self.schedule_help();
        self.maybe_trigger_finale();
    }

    // -- Help --

    fn schedule_help(&mut self) {
        if self.help.shown {
            return;
        }
        let cfg = &self.config.interaction;
        self.help.deadline = self.time + cfg.help_delay + cfg.help_window;
        self.scheduler.delay(cfg.help_delay, Cue::HelpCheck);
    }

    fn poll_help(&mut self, ctx: &mut EngineContext) {
        if !self.help.polling {
            return;
        }
        if self.help.shown || self.time > self.help.deadline {
            self.help.polling = false;
            return;
        }
        let burst_running = self.shatter.map_or(false, |id| ctx.effects.is_active(id));
        if self.view == View::Field && self.phase == FieldPhase::Active && !burst_running {
            self.help.polling = false;
            self.help.shown = true;
            let id = ctx.next_id();
            self.scene.overlays.create(id, ElementKind::Help, "MOVE W A S D · ROTATE Q E · CLICK WORDS", None, 0);
            self.scheduler.schedule(
                Tween::to(Target::Element(id), Property::Opacity, 1.0, 0.6).with_easing(Easing::CUBIC_OUT),
                None,
            );
            self.help.element = Some(id);
        }
    }

    fn dismiss_help(&mut self) {
        if let Some(id) = self.help.element.take() {
            self.scheduler.schedule(
                Tween::to(Target::Element(id), Property::Opacity, 0.0, 0.4).with_easing(Easing::CUBIC_IN_OUT),
                Some(Cue::HelpDismissed(id)),
            );
        }
    }

    // -- Pointer --

    fn click(&mut self, ctx: &mut EngineContext, ndc: Vec2) {
        match self.view {
            View::Gallery => {
                if self.scene.gallery.is_busy() {
                    return;
                }
                if let Some(card) = self.scene.gallery.pick(&ctx.camera, ndc, &self.config.gallery) {
                    self.open_card(ctx, card);
                }
            }
            View::Field => match self.phase {
                FieldPhase::Landing => self.shatter(ctx),
                FieldPhase::Active => {
                    self.dismiss_help();
                    if let Some(id) = self.scene.field.pick(&ctx.camera, ndc, self.layout.as_ref()) {
                        self.click_keyword(ctx, id);
                    }
                }
                _ => {}
            },
            View::About | View::ProjectDetail => {}
        }
    }

    pub(crate) fn click_keyword(&mut self, ctx: &mut EngineContext, id: EntityId) {
        if self.view != View::Field || self.phase != FieldPhase::Active {
            return;
        }
        let Some(entity) = self.scene.field.get(id) else { return };
        if self.find.active && self.find.has_word(&entity.key) {
            self.select_user_keyword(ctx, id);
            return;
        }
        if entity.state.is_pinned() {
            return;
        }
        self.select_keyword(ctx, id);
    }

    fn hover(&mut self, camera: &Camera3D, ndc: Vec2) {
        if self.view != View::Field || self.phase != FieldPhase::Active {
            return;
        }
        let hit = self.scene.field.pick(camera, ndc, self.layout.as_ref());
        let cfg = &self.config.interaction;
        let mut tweens = Vec::new();
        for e in &mut self.scene.field.entities {
            if e.state == EntityState::Hovered && Some(e.id) != hit {
                e.state = EntityState::Idle;
                let target = Target::Keyword(e.id);
                tweens.push(Tween::to(target, Property::Opacity, 0.6, 0.3));
                tweens.push(Tween::to(target, Property::Tint, WHITE, 0.3));
                tweens.push(Tween::to(target, Property::Scale, 1.0, 0.3));
            }
        }
        if let Some(e) = hit.and_then(|id| self.scene.field.get_mut(id)) {
            if e.state == EntityState::Idle {
                e.state = EntityState::Hovered;
                let target = Target::Keyword(e.id);
                tweens.push(Tween::to(target, Property::Opacity, 1.0, 0.2));
                tweens.push(Tween::to(target, Property::Tint, cfg.hover_tint, 0.2));
                tweens.push(Tween::to(target, Property::Scale, cfg.hover_scale, 0.2));
            }
        }
        for tween in tweens {
            self.scheduler.schedule(tween, None);
        }
    }

    fn scroll(&mut self, delta: f32) {
        if let Some(stage) = self.reveal.scroll.as_mut() {
            if !stage.done {
                stage.offset = (stage.offset + delta).clamp(0.0, stage.max);
            }
        }
    }

    // -- Selection --

    pub(crate) fn select_keyword(&mut self, ctx: &mut EngineContext, id: EntityId) {
        let Some(word) = self.scene.field.get(id).map(|e| e.word.clone()) else { return };
        if !self.selection.push(&word, id) {
            return;
        }
        if let Some(e) = self.scene.field.get_mut(id) {
            e.state = EntityState::Selected;
        }
        self.selection_feedback(ctx, id);
        self.post_collected_bar(true);
        self.show_hints(id, &word);

        let threshold = self.config.match_threshold;
        if let Some(found) = check_match(self.catalog.projects(), &self.collection, self.selection.words(), threshold) {
            self.unlock(ctx, found);
        }
    }

    /// Pin the selected look, pulse the scale, bloom and swirl the rest of the field.
    pub(crate) fn selection_feedback(&mut self, ctx: &mut EngineContext, id: EntityId) {
        let cfg = &self.config.interaction;
        let target = Target::Keyword(id);
        for property in [Property::Opacity, Property::Tint, Property::Scale] {
            self.scheduler.cancel(target, Some(property));
        }
        let Some(e) = self.scene.field.get_mut(id) else { return };
        e.tint = cfg.selected_tint;
        e.opacity = 1.0;
        let center = e.position;
        self.scheduler.schedule(
            Tween::to(target, Property::Scale, cfg.selected_scale, 0.3).with_easing(Easing::BACK_OUT),
            None,
        );
        let p = &self.config.particles;
        ctx.effects.spawn(ParticleParams::burst(vec![center], p.bloom_count, p.bloom_lifespan));
        self.redistribute(center);
    }

    /// Push every free entity onto a layered ring around `center`, turned
    /// roughly a quarter circle from where it was.
    fn redistribute(&mut self, center: Vec3) {
        let cfg = &self.config.interaction;
        let spread = cfg.swirl_spread_deg.to_radians();
        let mut tweens = Vec::new();
        for (index, e) in self.scene.field.entities.iter().enumerate() {
            if e.state.is_pinned() {
                continue;
            }
            let radius = cfg.orbit_radius + (index % 3) as f32 * cfg.orbit_step;
            let mut target = orbit_slot(center, e.position, radius, FRAC_PI_2 + self.rng.spread(spread));
            target.y += self.rng.spread(cfg.vertical_jitter);
            tweens.push(
                Tween::to(Target::Keyword(e.id), Property::Position, target, cfg.redistribute_duration)
                    .with_easing(Easing::QUINT_IN_OUT),
            );
        }
        for tween in tweens {
            self.scheduler.schedule(tween, None);
        }
    }

    pub(crate) fn show_hints(&mut self, from: EntityId, word: &str) {
        self.clear_hints();
        let words = hint_targets(
            self.catalog.projects(),
            &self.collection,
            word,
            self.selection.words(),
            self.config.hint_limit,
            &mut self.rng,
        );
        let ids: Vec<EntityId> =
            words.iter().filter_map(|w| self.scene.field.find_word(w)).map(|e| e.id).collect();
        self.mark_hinted(&ids, self.config.interaction.hint_tint);
        self.outbox.push(Message::HintLines { from: Some(from), to: ids });
    }

    pub(crate) fn mark_hinted(&mut self, ids: &[EntityId], tint: Vec3) {
        for &id in ids {
            let Some(e) = self.scene.field.get_mut(id) else { continue };
            if !matches!(e.state, EntityState::Idle | EntityState::Hovered) {
                continue;
            }
            e.state = EntityState::Hinted;
            self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Opacity, 1.0, 0.5), None);
            self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Tint, tint, 0.5), None);
        }
    }

    pub(crate) fn clear_hints(&mut self) {
        for e in &mut self.scene.field.entities {
            if e.state == EntityState::Hinted {
                e.state = EntityState::Idle;
                self.scheduler.schedule(Tween::to(Target::Keyword(e.id), Property::Tint, WHITE, 0.3), None);
            }
        }
        self.outbox.push(Message::HintLines { from: None, to: Vec::new() });
    }

    /// Release every picked, pinned or hinted entity and empty both selections.
    pub(crate) fn clear_selection(&mut self) {
        for e in &mut self.scene.field.entities {
            let target = Target::Keyword(e.id);
            if e.state != EntityState::Idle {
                e.state = EntityState::Idle;
                e.tint = WHITE;
                self.scheduler.cancel(target, Some(Property::Tint));
                self.scheduler.schedule(Tween::to(target, Property::Scale, 1.0, 0.5), None);
            }
            self.scheduler.schedule(Tween::to(target, Property::Opacity, 0.6, 1.0), None);
        }
        self.selection.clear();
        self.find.selection.clear();
        self.find.sequence_active = false;
        self.outbox.push(Message::HintLines { from: None, to: Vec::new() });
        self.post_collected_bar(false);
    }

    /// Fade every entity outside `keep` to `opacity`.
    pub(crate) fn dim_others(&mut self, keep: &[EntityId], opacity: f32, duration: f32) {
        for id in self.scene.field.ids() {
            if !keep.contains(&id) {
                self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Opacity, opacity, duration), None);
            }
        }
    }

    /// Record the project as collected and start its reveal. Does nothing for
    /// a project already collected or while another reveal runs.
    pub(crate) fn unlock(&mut self, ctx: &mut EngineContext, found: Match) {
        if self.reveal.active || self.collection.contains(&found.project_id) {
            return;
        }
        let used = self.selection.words().to_vec();
        if !self.collection.collect(&found.project_id, &used) {
            return;
        }
        self.selection.clear();
        self.collection.persist(ctx.store.as_mut(), &self.config.storage_key);
        self.post_progress();
        log::info!("field: unlocked '{}' with {:?}", found.project_id, found.matched_words);

        let matched: Vec<EntityId> = found
            .matched_words
            .iter()
            .filter_map(|w| self.scene.field.find_word(w))
            .map(|e| e.id)
            .collect();
        self.start_reveal(ctx, &found.project_id, matched);
    }

    // -- Views --

    fn navigate(&mut self, ctx: &mut EngineContext, view: View) {
        let view = match (view, self.view) {
            (View::About, View::About) => View::Field,
            (View::ProjectDetail, _) => {
                log::warn!("field: project detail opens from a project, not from navigation");
                return;
            }
            (view, _) => view,
        };
        self.switch_view(ctx, view);
    }

    /// Tween the camera home: `position`, looking down -Z.
    fn move_camera(&mut self, position: Vec3, duration: f32, easing: Easing) {
        self.scheduler
            .schedule(Tween::to(Target::Camera, Property::Position, position, duration).with_easing(easing), None);
        self.scheduler
            .schedule(Tween::to(Target::Camera, Property::Rotation, Vec3::ZERO, duration).with_easing(easing), None);
    }

    fn gallery_eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.config.gallery.camera_distance)
    }

    pub(crate) fn switch_view(&mut self, ctx: &mut EngineContext, view: View) {
        if view != self.view {
            if self.finale.active {
                self.restore_after_finale(ctx, false);
            }
            if self.reveal.active {
                self.abort_reveal(ctx);
            }
            if self.find.sequence_active {
                self.abort_find_sequence(ctx);
            }
            if self.view == View::ProjectDetail {
                self.close_detail_panel();
            }
        }
        self.view = view;
        self.nav.stop();
        match view {
            View::Field => {
                self.move_camera(Vec3::new(0.0, 0.0, 5.0), 0.8, Easing::CUBIC_IN_OUT);
                if !matches!(self.phase, FieldPhase::Landing | FieldPhase::Shattering) {
                    self.phase = FieldPhase::Active;
                }
            }
            View::Gallery => {
                for card in &mut self.scene.gallery.cards {
                    self.scheduler.cancel(Target::Card(card.id), None);
                    card.transitioning = false;
                    card.scale = 1.0;
                }
                self.scene.gallery.transition = None;
                self.move_camera(self.gallery_eye(), 0.8, Easing::CUBIC_IN_OUT);
            }
            View::About | View::ProjectDetail => {}
        }
        self.post_collected_bar(!self.selection.is_empty());
        self.post_view();
        if view == View::Field && self.phase == FieldPhase::Active {
            self.maybe_trigger_finale();
        }
    }

    fn open_card(&mut self, ctx: &mut EngineContext, card: EntityId) {
        if self.scene.gallery.is_busy() {
            return;
        }
        let Some(c) = self.scene.gallery.get_mut(card) else { return };
        c.transitioning = true;
        let transition = CardTransition { card, from_position: c.position, from_scale: c.scale, active: true };
        self.scene.gallery.transition = Some(transition);
        let (position, scale) = Gallery::cover_pose(&ctx.camera, &self.config.gallery);
        let duration = self.config.gallery.transition;
        self.scheduler.schedule(
            Tween::to(Target::Card(card), Property::Position, position, duration).with_easing(Easing::QUART_IN_OUT),
            None,
        );
        self.scheduler.schedule(
            Tween::to(Target::Card(card), Property::Scale, scale, duration).with_easing(Easing::QUART_IN_OUT),
            Some(Cue::GalleryOpened(card)),
        );
    }

    fn card_opened(&mut self, card: EntityId) {
        let Some(c) = self.scene.gallery.get_mut(card) else { return };
        c.transitioning = false;
        let project_id = c.project_id.clone();
        if self.view == View::Gallery {
            self.show_detail(&project_id);
        }
    }

    fn return_card(&mut self) {
        let Some(t) = self.scene.gallery.transition else { return };
        if let Some(card) = self.scene.gallery.get_mut(t.card) {
            card.transitioning = true;
        }
        let duration = self.config.gallery.transition;
        self.scheduler.schedule(
            Tween::to(Target::Card(t.card), Property::Position, t.from_position, duration)
                .with_easing(Easing::QUART_IN_OUT),
            None,
        );
        self.scheduler.schedule(
            Tween::to(Target::Card(t.card), Property::Scale, t.from_scale, duration).with_easing(Easing::QUART_IN_OUT),
            Some(Cue::GalleryReturned),
        );
    }

    /// Open the detail of `project_id`, remembering where it was opened from.
    pub(crate) fn show_detail(&mut self, project_id: &str) {
        let Some(project) = self.catalog.get(project_id).cloned() else {
            log::warn!("field: no loaded project '{}'", project_id);
            return;
        };
        if self.view != View::ProjectDetail {
            self.previous_view = self.view;
        }
        self.view = View::ProjectDetail;
        if self.previous_view == View::Field {
            self.phase = FieldPhase::ProjectReveal;
        }
        let used_keywords = self
            .collection
            .used_keywords(project_id)
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.selection.words().to_vec());
        self.detail = Some(project.id.clone());
        self.outbox.push(Message::Detail { project, used_keywords, previous_view: self.previous_view });
        self.post_view();
    }

    pub(crate) fn close_detail_panel(&mut self) {
        for kind in [
            ElementKind::DetailPanel,
            ElementKind::DetailBack,
            ElementKind::DetailHeader,
            ElementKind::DetailBody,
        ] {
            self.scene.overlays.remove_kind(kind);
        }
        if self.detail.take().is_some() {
            self.outbox.push(Message::DetailClosed);
        }
    }

    fn hide_detail(&mut self) {
        if self.view != View::ProjectDetail {
            return;
        }
        self.close_detail_panel();
        if self.previous_view == View::Gallery {
            self.view = View::Gallery;
            self.move_camera(self.gallery_eye(), 0.8, Easing::CUBIC_IN_OUT);
            self.return_card();
            self.post_gallery();
            self.post_view();
        } else {
            self.return_to_field(true);
        }
    }

    pub(crate) fn return_to_field(&mut self, reset_selection: bool) {
        self.view = View::Field;
        self.phase = FieldPhase::Active;
        self.detail = None;
        if reset_selection {
            self.clear_selection();
        }
        self.post_view();
        self.maybe_trigger_finale();
    }

    /// Snap every entity back to its spawn point, hidden and unselected.
    fn hide_entities(&mut self) {
        for e in &mut self.scene.field.entities {
            self.scheduler.cancel(Target::Keyword(e.id), None);
            e.state = EntityState::Idle;
            e.opacity = 0.0;
            e.tint = WHITE;
            e.scale = 1.0;
            e.spin = 0.0;
            e.orbit = None;
            e.position = e.original_position;
        }
    }

    fn go_home(&mut self, ctx: &mut EngineContext) {
        self.switch_view(ctx, View::Field);
        self.phase = FieldPhase::Landing;
        self.selection.clear();
        self.find.selection.clear();
        self.find.sequence_active = false;
        self.clear_hints();
        self.hide_entities();
        self.show_landing_title(ctx);
        self.post_collected_bar(false);
        self.post_view();
    }

    /// Forget all progress: collection, sessions, the finale and help flags.
    fn reset(&mut self, ctx: &mut EngineContext) {
        if self.finale.active {
            self.restore_after_finale(ctx, false);
        }
        if self.reveal.active {
            self.abort_reveal(ctx);
        }
        if self.find.sequence_active {
            self.abort_find_sequence(ctx);
        }
        self.collection.reset(ctx.store.as_mut(), &self.config.storage_key);
        self.selection.clear();
        self.reset_find();
        self.finale_triggered = false;
        self.help.shown = false;
        self.rebuild_gallery(ctx);
        self.clear_hints();
        self.hide_entities();
        self.phase = FieldPhase::Landing;
        self.post_progress();
        self.post_collected_bar(false);
        log::info!("field: progress reset");
        self.switch_view(ctx, View::Field);
        self.show_landing_title(ctx);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::project::record;
    use wander_engine::{KeyValueStore, MemoryStore};

    pub(crate) struct Harness {
        pub app: App,
        pub ctx: EngineContext,
        pub posted: Vec<String>,
    }

    impl Harness {
        pub fn new(records: &[ProjectRecord]) -> Self {
            Self::with_store(records, MemoryStore::new())
        }

        pub fn with_store(records: &[ProjectRecord], store: MemoryStore) -> Self {
            let mut config = FieldConfig::default();
            config.project_ids = records.iter().map(|r| r.id.clone()).collect();
            let mut harness = Self {
                app: App::headless(config),
                ctx: EngineContext::with_store(Box::new(store)),
                posted: Vec::new(),
            };
            harness.app.init(&mut harness.ctx);
            harness.collect_posted();
            for r in records {
                let body = serde_json::to_string(r).unwrap();
                harness.event(InputEvent::Payload { key: r.id.clone(), body: Ok(body) });
            }
            harness.frame(0.05);
            harness
        }

        fn collect_posted(&mut self) {
            self.posted.extend(self.ctx.messages.drain(..).map(|m| m.0));
        }

        pub fn event(&mut self, event: InputEvent) {
            self.app.handle_event(&mut self.ctx, &event);
        }

        pub fn command(&mut self, command: Command) {
            self.app.command(&mut self.ctx, command);
        }

        pub fn frame(&mut self, dt: f32) {
            self.ctx.dt = dt;
            self.ctx.elapsed += dt;
            self.app.advance(&mut self.ctx);
            self.ctx.effects.tick(dt);
            self.collect_posted();
        }

        pub fn run(&mut self, seconds: f32) {
            let steps = (seconds / 0.05).ceil() as usize;
            for _ in 0..steps {
                self.frame(0.05);
            }
        }

        /// Click through the landing title and wait for the field.
        pub fn enter_field(&mut self) {
            self.event(InputEvent::PointerDown { x: 0.0, y: 0.0 });
            assert_eq!(self.app.phase(), FieldPhase::Shattering);
            self.run(2.0);
            assert_eq!(self.app.phase(), FieldPhase::Active);
        }

        pub fn id_of(&self, word: &str) -> EntityId {
            self.app.scene.field.find_word(word).map(|e| e.id).unwrap()
        }

        pub fn select(&mut self, word: &str) {
            let id = self.id_of(word);
            self.app.click_keyword(&mut self.ctx, id);
        }

        pub fn posted_of_type(&self, kind: &str) -> usize {
            let tag = format!("\"type\":\"{}\"", kind);
            self.posted.iter().filter(|m| m.contains(&tag)).count()
        }
    }

    pub(crate) fn three_projects() -> Vec<ProjectRecord> {
        vec![
            record("a", &["sea", "salt", "shore", "wind"]),
            record("b", &["wind", "kite", "cloud"]),
            record("c", &["ember", "ash", "smoke"]),
        ]
    }

    #[test]
    fn landing_click_shatters_then_fades_the_field_in() {
        let mut h = Harness::new(&three_projects());
        assert_eq!(h.app.scene.field.len(), 9);
        assert!(h.app.scene.field.entities.iter().all(|e| e.opacity == 0.0));
        assert!(h.app.landing_title.is_some());
        h.enter_field();
        assert!(h.app.landing_title.is_none());
        h.run(2.5);
        assert!(h.app.scene.field.entities.iter().any(|e| e.opacity > 0.0));
        assert_eq!(h.posted_of_type("keywordSpawned"), 9);
    }

    #[test]
    fn three_words_unlock_only_the_matching_project() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.select("sea");
        h.select("salt");
        assert!(h.app.collection().is_empty());
        h.select("shore");
        assert!(h.app.collection().contains("a"));
        assert_eq!(h.app.collection().len(), 1);
        assert_eq!(h.app.phase(), FieldPhase::Unlocking);
        assert!(h.app.selection().is_empty());

        h.select("kite");
        assert!(h.app.selection().is_empty());
        assert_eq!(h.app.collection().len(), 1);
        let used = h.app.collection().used_keywords("a").unwrap();
        assert_eq!(used, &["sea".to_string(), "salt".to_string(), "shore".to_string()][..]);

        let stored = h.ctx.store.get("collectedProjects").unwrap().unwrap();
        assert!(stored.contains("\"a\""));
    }

    #[test]
    fn unlock_is_idempotent() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        for w in ["sea", "salt", "shore"] {
            h.select(w);
        }
        let found = Match { project_id: "a".into(), matched_words: vec!["wind".into()] };
        h.app.unlock(&mut h.ctx, found);
        assert_eq!(h.app.collection().len(), 1);
        assert_eq!(h.app.collection().used_keywords("a").unwrap().len(), 3);
    }

    #[test]
    fn selecting_twice_keeps_one_entry() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.select("ember");
        h.select("ember");
        assert_eq!(h.app.selection().len(), 1);
        let id = h.id_of("ember");
        assert_eq!(h.app.scene.field.get(id).unwrap().state, EntityState::Selected);
        h.frame(0.05);
        assert!(h.posted_of_type("hintLines") > 0);
        assert!(h.posted_of_type("collectedBar") > 0);
    }

    #[test]
    fn hints_mark_keywords_of_related_projects() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.select("ash");
        let hinted: Vec<String> = h
            .app
            .scene
            .field
            .entities
            .iter()
            .filter(|e| e.state == EntityState::Hinted)
            .map(|e| e.key.clone())
            .collect();
        assert_eq!(hinted.len(), 2);
        assert!(hinted.iter().all(|w| w == "ember" || w == "smoke"));
    }

    #[test]
    fn failed_payload_is_excluded() {
        let records = three_projects();
        let mut config = FieldConfig::default();
        config.project_ids = vec!["a".into(), "broken".into()];
        let mut app = App::headless(config);
        let mut ctx = EngineContext::new();
        app.init(&mut ctx);
        assert_eq!(ctx.requests, vec!["a".to_string(), "broken".to_string()]);
        let body = serde_json::to_string(&records[0]).unwrap();
        app.handle_event(&mut ctx, &InputEvent::Payload { key: "a".into(), body: Ok(body) });
        assert!(app.scene.field.is_empty());
        app.handle_event(&mut ctx, &InputEvent::Payload { key: "broken".into(), body: Err("404".into()) });
        assert_eq!(app.catalog().len(), 1);
        assert_eq!(app.scene.field.len(), 4);
        assert_eq!(app.scene.gallery.len(), 1);
    }

    #[test]
    fn corrupt_store_starts_empty() {
        let store = MemoryStore::new().with_entry("collectedProjects", "{nope");
        let h = Harness::with_store(&three_projects(), store);
        assert!(h.app.collection().is_empty());
    }

    #[test]
    fn gallery_card_opens_detail_and_returns() {
        let mut h = Harness::new(&three_projects());
        h.command(Command::Navigate(View::Gallery));
        assert_eq!(h.app.view(), View::Gallery);
        h.run(1.0);
        let card = h.app.scene.gallery.cards[0].id;
        h.app.open_card(&mut h.ctx, card);
        assert!(h.app.scene.gallery.is_busy());
        h.run(1.2);
        assert_eq!(h.app.view(), View::ProjectDetail);
        assert_eq!(h.posted_of_type("detail"), 1);

        h.command(Command::DetailBack);
        assert_eq!(h.app.view(), View::Gallery);
        h.run(1.2);
        assert!(!h.app.scene.gallery.is_busy());
        assert_eq!(h.posted_of_type("detailClosed"), 1);
        assert_eq!(h.app.phase(), FieldPhase::Landing);
    }

    #[test]
    fn about_toggles_back_to_field() {
        let mut h = Harness::new(&three_projects());
        h.command(Command::Navigate(View::About));
        assert_eq!(h.app.view(), View::About);
        h.command(Command::Navigate(View::About));
        assert_eq!(h.app.view(), View::Field);
        assert_eq!(h.app.phase(), FieldPhase::Landing);
    }

    #[test]
    fn help_appears_once_after_entering_the_field() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.run(5.0);
        assert!(h.app.help.shown);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::Help).count(), 1);
        h.command(Command::DismissHelp);
        h.run(1.0);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::Help).count(), 0);

        h.command(Command::Home);
        h.enter_field();
        h.run(5.0);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::Help).count(), 0);
    }

    #[test]
    fn home_returns_to_landing_with_hidden_keywords() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.select("ember");
        h.run(1.0);
        h.command(Command::Home);
        assert_eq!(h.app.phase(), FieldPhase::Landing);
        assert!(h.app.selection().is_empty());
        assert!(h.app.landing_title.is_some());
        h.run(1.0);
        for e in &h.app.scene.field.entities {
            assert_eq!(e.opacity, 0.0);
            assert_eq!(e.state, EntityState::Idle);
        }
    }

    #[test]
    fn reset_clears_progress_and_store() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        for w in ["ember", "ash", "smoke"] {
            h.select(w);
        }
        assert!(h.app.collection().contains("c"));
        h.command(Command::Reset);
        assert!(h.app.collection().is_empty());
        assert_eq!(h.ctx.store.get("collectedProjects").unwrap(), None);
        assert_eq!(h.app.phase(), FieldPhase::Landing);
        assert!(!h.app.reveal.active);
        assert!(!h.app.finale_triggered());
    }

    #[test]
    fn closing_the_last_unlocked_project_starts_the_finale_once() {
        let mut collection = CollectionState::new();
        for r in &three_projects()[..2] {
            collection.collect(&r.id, &r.keywords[..3]);
        }
        let mut store = MemoryStore::new();
        collection.write(&mut store, "collectedProjects").unwrap();
        let mut h = Harness::with_store(&three_projects(), store);
        h.enter_field();
        assert!(!h.app.finale_triggered());

        for w in ["ember", "ash", "smoke"] {
            h.select(w);
        }
        assert!(h.app.reveal.active);
        assert!(!h.app.finale_active());
        h.run(19.0);
        h.event(InputEvent::Wheel { delta: 5000.0 });
        h.run(2.0);
        assert_eq!(h.app.view(), View::ProjectDetail);
        assert!(!h.app.finale_active());

        h.command(Command::DetailBack);
        assert!(h.app.finale_active());
        assert!(h.app.finale_triggered());
        assert_eq!(h.app.phase(), FieldPhase::Ending);
        h.frame(0.05);

        h.command(Command::Navigate(View::Gallery));
        h.command(Command::Navigate(View::Field));
        assert!(!h.app.finale_active());
        h.command(Command::Home);
        h.enter_field();
        h.run(1.0);
        assert!(!h.app.finale_active());
        assert_eq!(h.app.phase(), FieldPhase::Active);
        let endings = h.posted.iter().filter(|m| m.contains("\"phase\":\"ending\"")).count();
        assert_eq!(endings, 1);
    }
}
