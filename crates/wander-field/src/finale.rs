//! The closing sequence, played once every project has been collected.
//!
//! The field spins up into a galaxy, collapses into a point, flickers through
//! the word list while the camera pushes in, bursts, shows the closing message
//! and finally puts the field back as it was.

use glam::Vec3;
use wander_engine::{EffectId, Easing, EngineContext, EntityId, ParticleParams, Property, Timeline, Tween};

use crate::app::{App, FieldPhase, Handles, View};
use crate::error::FieldError;
use crate::field::{EntityState, Orbit, WHITE};
use crate::overlay::ElementKind;
use crate::presentation::{screen_to_plane, TextStyle};
use crate::stage::{Cue, Target};

/// Keyword positions the gather burst starts from.
const GATHER_ORIGINS: usize = 30;

#[derive(Debug, Default)]
pub struct FinaleState {
    pub active: bool,
    /// Entities follow their orbits.
    pub spinning: bool,
    /// Camera keeps looking at the origin while it pushes in.
    pub zooming: bool,
    pub word: Option<EntityId>,
    pub message: Vec<EntityId>,
    pub gather: Option<EffectId>,
    pub(crate) handles: Handles,
}

impl App {
    /// Start the finale if every loaded project is collected and it has not
    /// played yet. Returns whether it started.
    pub(crate) fn maybe_trigger_finale(&mut self) -> bool {
        if self.finale_triggered || self.finale.active || self.reveal.active {
            return false;
        }
        if self.view != View::Field || self.phase != FieldPhase::Active {
            return false;
        }
        if self.catalog.is_empty() || !self.catalog.projects().all(|p| self.collection.contains(&p.id)) {
            return false;
        }
        self.finale_triggered = true;
        self.start_finale();
        true
    }

    fn start_finale(&mut self) {
        log::info!("finale: all {} projects collected", self.catalog.len());
        self.finale = FinaleState { active: true, spinning: true, ..FinaleState::default() };
        self.set_phase(FieldPhase::Ending);
        self.clear_hints();
        self.nav.stop();
        self.post_collected_bar(false);

        for e in &mut self.scene.field.entities {
            let target = Target::Keyword(e.id);
            self.scheduler.cancel(target, None);
            e.orbit = Some(Orbit::through(e.position, &mut self.rng));
            self.scheduler.schedule(Tween::to(target, Property::Opacity, 0.9, 1.2), None);
        }

        let cfg = &self.config.finale;
        self.scene.spin_angle = 0.0;
        self.scene.spin_speed = cfg.spin_start;
        let easings = [Easing::CUBIC_IN_OUT, Easing::QUART_IN, Easing::QUART_IN, Easing::EXPO_OUT];
        let mut timeline = Timeline::new();
        for (i, &(speed, duration)) in cfg.spin_segments.iter().enumerate() {
            let easing = easings.get(i).copied().unwrap_or(Easing::CUBIC_IN_OUT);
            timeline = timeline.then(Tween::to(Target::Spin, Property::Speed, speed, duration).with_easing(easing));
        }
        let timeline = timeline.cue(Cue::FinaleSpinDone).wait(cfg.pause).on_complete(Cue::FinaleExplosion);
        let id = self.scheduler.play(timeline);
        self.finale.handles.timelines.push(id);
    }

    /// Collapse the galaxy into a single point and bring up the first word.
    pub(crate) fn finale_explosion(&mut self, ctx: &mut EngineContext) {
        if !self.finale.active {
            return;
        }
        self.finale.spinning = false;
        let mut origins: Vec<Vec3> =
            self.scene.field.entities.iter().take(GATHER_ORIGINS).map(|e| e.position).collect();
        if origins.is_empty() {
            origins.push(Vec3::ZERO);
        }
        for e in &mut self.scene.field.entities {
            self.scheduler.cancel(Target::Keyword(e.id), Some(Property::Opacity));
            e.opacity = 0.0;
        }

        let cfg = &self.config.finale;
        let params = ParticleParams::gather(origins, cfg.gather_point, self.config.particles.finale_gather_count)
            .with_jitter(Vec3::splat(0.8));
        let gather = ctx.effects.spawn(params);
        self.finale.gather = Some(gather);
        self.finale.handles.effects.push(gather);

        let first = cfg.words.first().cloned().unwrap_or_default();
        let hold = cfg.hold;
        let word = ctx.next_id();
        self.scene.overlays.create(word, ElementKind::FinaleWord, &first, None, 0);
        self.scheduler.schedule(
            Tween::to(Target::Element(word), Property::Opacity, 1.0, 0.8)
                .with_easing(Easing::CUBIC_OUT)
                .with_delay(hold),
            None,
        );
        self.finale.word = Some(word);
        self.finale.handles.elements.push(word);
    }

    /// Flicker through the word list, long at both ends and fast in the
    /// middle, while the camera pushes in.
    pub(crate) fn start_word_cycle(&mut self, ctx: &mut EngineContext) {
        self.finale.gather = None;
        let Some(word) = self.finale.word.filter(|_| self.finale.active) else { return };
        let cfg = &self.config.finale;
        let target = Target::Element(word);
        let count = cfg.words.len();
        let mut timeline = Timeline::new();
        for i in 0..count {
            let d = cfg.word_duration(i);
            timeline = timeline
                .then(Tween::to(target, Property::Opacity, 0.2, (0.45 * d).max(0.05)).with_easing(Easing::QUAD_IN))
                .cue(Cue::FinaleWord(i))
                .then(Tween::to(target, Property::Opacity, 1.0, (0.45 * d).max(0.06)).with_easing(Easing::QUAD_OUT));
            if i + 1 < count {
                timeline = timeline.wait((0.25 * d).max(0.04));
            }
        }
        let timeline = timeline.on_complete(Cue::FinaleWordsDone);
        let zoom = timeline.duration() + 2.0;
        let id = self.scheduler.play(timeline);
        self.finale.handles.timelines.push(id);

        let camera = &ctx.camera;
        let destination = camera.position + camera.forward() * cfg.zoom_depth;
        let task = self.scheduler.schedule(
            Tween::to(Target::Camera, Property::Position, destination, zoom).with_easing(Easing::QUART_IN_OUT),
            None,
        );
        self.finale.handles.timers.push(task);
        self.finale.zooming = true;
        log::debug!("finale: {} words over {:.1}s", count, zoom - 2.0);
    }

    pub(crate) fn finale_word(&mut self, index: usize) {
        let Some(word) = self.finale.word else { return };
        if let Some(text) = self.config.finale.words.get(index) {
            self.scene.overlays.set_text(word, text);
        }
    }

    pub(crate) fn finale_words_done(&mut self) {
        if !self.finale.active {
            return;
        }
        let timer = self.scheduler.delay(self.config.finale.hold, Cue::FinaleExplodeWord);
        self.finale.handles.timers.push(timer);
    }

    /// Burst the last word into particles.
    pub(crate) fn finale_explode_word(&mut self, ctx: &mut EngineContext) {
        if !self.finale.active {
            return;
        }
        self.finale.zooming = false;
        let Some(word) = self.finale.word else { return };
        let text = self.scene.overlays.get(word).map(|e| e.text.clone()).unwrap_or_default();
        let depth = self.config.finale.word_depth;
        let camera = &ctx.camera;
        let rects = self.layout.glyph_rects(&text, TextStyle::FinaleWord, camera.viewport);
        let mut origins: Vec<Vec3> = text
            .chars()
            .zip(rects)
            .filter(|(c, _)| !c.is_whitespace())
            .filter_map(|(_, r)| screen_to_plane(camera, r.center(), depth))
            .collect();
        if origins.is_empty() {
            log::warn!("finale: {}", FieldError::MissingInterface("finale word layout"));
            origins.push(camera.to_world(Vec3::new(0.0, 0.0, -depth)));
        }

        let p = &self.config.particles;
        let params = ParticleParams::burst(origins, p.finale_word_count, p.finale_word_lifespan)
            .with_drag(0.4)
            .with_slowdown(0.6, 0.05)
            .with_speed(10.0, 18.0)
            .with_speed_scale(6.5)
            .with_jitter(Vec3::splat(0.4));
        let effect = ctx.effects.spawn(params);
        self.finale.handles.effects.push(effect);

        self.scheduler.schedule(Tween::to(Target::Element(word), Property::Opacity, 0.0, 0.6), None);
        let timer = self.scheduler.delay(0.6 + self.config.finale.message_delay, Cue::FinaleMessage);
        self.finale.handles.timers.push(timer);
    }

    pub(crate) fn finale_message(&mut self, ctx: &mut EngineContext) {
        if !self.finale.active {
            return;
        }
        if let Some(word) = self.finale.word.take() {
            self.scheduler.cancel(Target::Element(word), None);
            self.scene.overlays.remove(word);
        }
        let cfg = &self.config.finale;
        let container = ctx.next_id();
        self.scene.overlays.create(container, ElementKind::FinaleMessage, &cfg.message.join("\n"), None, 0);
        self.scheduler.schedule(Tween::to(Target::Element(container), Property::Opacity, 1.0, 0.8), None);
        self.finale.message.push(container);

        for (i, line) in cfg.message.iter().enumerate() {
            let id = ctx.next_id();
            self.scene.overlays.create(id, ElementKind::FinaleLine, line, Some(container), i);
            if let Some(e) = self.scene.overlays.get_mut(id) {
                e.offset = Vec3::new(0.0, 20.0, 0.0);
            }
            let delay = cfg.line_delays.get(i).copied().unwrap_or(0.4 + 5.0 * i as f32);
            let target = Target::Element(id);
            for tween in [
                Tween::to(target, Property::Offset, Vec3::ZERO, 1.1),
                Tween::to(target, Property::Opacity, 1.0, 1.1),
            ] {
                self.scheduler.schedule(tween.with_easing(Easing::CUBIC_OUT).with_delay(delay), None);
            }
            self.finale.message.push(id);
        }
        self.finale.handles.elements.extend(self.finale.message.iter().copied());

        let timer = self.scheduler.delay(cfg.scatter_after, Cue::FinaleScatter);
        self.finale.handles.timers.push(timer);
    }

    pub(crate) fn finale_scatter(&mut self) {
        if !self.finale.active {
            return;
        }
        let message = self.finale.message.clone();
        if message.is_empty() {
            let timer = self.scheduler.delay(0.0, Cue::FinaleRestore);
            self.finale.handles.timers.push(timer);
            return;
        }
        let count = message.len();
        for (i, id) in message.into_iter().enumerate() {
            let cue = (i + 1 == count).then_some(Cue::FinaleRestore);
            self.scheduler.schedule(
                Tween::to(Target::Element(id), Property::Opacity, 0.0, 1.5).with_easing(Easing::CUBIC_IN_OUT),
                cue,
            );
        }
    }

    /// Put the field back the way it was before the finale. With `retrigger`
    /// the completion check runs again; the sticky flag keeps it from replaying.
    pub(crate) fn restore_after_finale(&mut self, ctx: &mut EngineContext, retrigger: bool) {
        if !self.finale.active {
            return;
        }
        self.finale.handles.teardown(&mut self.scheduler, &mut ctx.effects, &mut self.scene.overlays);
        self.finale = FinaleState::default();
        self.scheduler.cancel(Target::Spin, None);
        self.scene.spin_speed = 0.0;
        self.scene.spin_angle = 0.0;

        for e in &mut self.scene.field.entities {
            let target = Target::Keyword(e.id);
            self.scheduler.cancel(target, None);
            e.state = EntityState::Idle;
            e.orbit = None;
            e.tint = WHITE;
            e.scale = 1.0;
            e.spin = 0.0;
            e.position = e.original_position;
            self.scheduler.schedule(Tween::to(target, Property::Opacity, 0.6, 1.2), None);
        }
        for property in [Property::Position, Property::Rotation] {
            let value = if property == Property::Position { Vec3::new(0.0, 0.0, 5.0) } else { Vec3::ZERO };
            self.scheduler.schedule(
                Tween::to(Target::Camera, property, value, 1.2).with_easing(Easing::CUBIC_OUT),
                None,
            );
        }
        if self.view == View::Field {
            self.set_phase(FieldPhase::Active);
        } else {
            self.phase = FieldPhase::Active;
        }
        log::info!("finale: restored");
        if retrigger {
            self.maybe_trigger_finale();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{three_projects, Harness};
    use crate::app::Command;
    use crate::collection::CollectionState;
    use glam::Quat;
    use wander_engine::{InputEvent, MemoryStore};

    fn all_collected() -> Harness {
        let mut collection = CollectionState::new();
        for r in three_projects() {
            collection.collect(&r.id, &r.keywords[..3]);
        }
        let mut store = MemoryStore::new();
        collection.write(&mut store, "collectedProjects").unwrap();
        Harness::with_store(&three_projects(), store)
    }

    /// Click through the landing; the finale starts as the field becomes active.
    fn begin(h: &mut Harness) {
        h.event(InputEvent::PointerDown { x: 0.0, y: 0.0 });
        h.run(2.0);
    }

    #[test]
    fn entering_a_completed_field_starts_the_finale() {
        let mut h = all_collected();
        assert_eq!(h.app.collection().len(), 3);
        begin(&mut h);
        assert!(h.app.finale_active());
        assert!(h.app.finale_triggered());
        h.frame(0.05);
        assert_eq!(h.app.phase(), FieldPhase::Ending);
        assert!(h.app.scene.field.entities.iter().all(|e| e.orbit.is_some()));
    }

    #[test]
    fn finale_plays_once_and_restores_the_field() {
        let mut h = all_collected();
        begin(&mut h);
        h.run(16.0);
        assert!(h.app.finale.word.is_some());
        assert!(h.app.scene.field.entities.iter().all(|e| e.opacity == 0.0));

        h.run(100.0);
        assert!(!h.app.finale_active());
        assert!(h.app.finale_triggered());
        assert_eq!(h.app.phase(), FieldPhase::Active);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::FinaleLine).count(), 0);
        assert!(h.app.scene.field.entities.iter().all(|e| e.orbit.is_none() && e.state == EntityState::Idle));
        let camera = &h.ctx.camera;
        assert!(camera.position.truncate().length() < 1e-3);
        assert!(camera.orientation.angle_between(Quat::IDENTITY) < 1e-3);

        assert!(!h.app.maybe_trigger_finale());
        h.command(Command::Navigate(View::Gallery));
        h.command(Command::Navigate(View::Field));
        assert!(!h.app.finale_active());
    }

    #[test]
    fn leaving_the_field_stops_the_finale_for_good() {
        let mut h = all_collected();
        begin(&mut h);
        h.run(4.0);
        h.command(Command::Navigate(View::About));
        assert!(!h.app.finale_active());
        assert_eq!(h.app.scene.spin_speed, 0.0);
        h.command(Command::Navigate(View::Field));
        assert!(!h.app.finale_active());
        assert_eq!(h.app.phase(), FieldPhase::Active);
    }

    #[test]
    fn reset_rearms_the_finale() {
        let mut h = all_collected();
        begin(&mut h);
        h.command(Command::Reset);
        assert!(!h.app.finale_triggered());
        assert!(!h.app.finale_active());
        assert!(h.app.collection().is_empty());
    }
}
