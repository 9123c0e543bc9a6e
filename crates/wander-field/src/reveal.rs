//! Unlock reveal: matched words gather, burst into the project sentence,
//! then give way to the scroll-driven title and the detail panel.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::{Vec2, Vec3};
use wander_engine::{Camera3D, EffectId, Easing, EngineContext, EntityId, ParticleParams, Property, Timeline, Tween};

use crate::app::{App, FieldPhase, Handles};
use crate::error::FieldError;
use crate::field::EntityState;
use crate::overlay::ElementKind;
use crate::presentation::{glyph_targets, Rect, TextStyle};
use crate::project::ProjectRecord;
use crate::stage::{Cue, Target};

/// A sentence overlay split into glyphs. Each glyph keeps its direction from
/// the viewport centre, in pixels, for the scatter.
#[derive(Debug, Clone)]
pub struct Sentence {
    pub id: EntityId,
    pub glyphs: Vec<(EntityId, Vec2)>,
}

impl Sentence {
    pub fn glyph_ids(&self) -> Vec<EntityId> {
        self.glyphs.iter().map(|(id, _)| *id).collect()
    }
}

/// Scroll-to-reveal progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollStage {
    pub hint: EntityId,
    /// Accumulated wheel distance in pixels, within `[0, max]`.
    pub offset: f32,
    pub max: f32,
    /// Title scale at full progress.
    pub cover: f32,
    pub done: bool,
}

impl ScrollStage {
    pub fn progress(&self) -> f32 {
        if self.max <= 0.0 {
            return 1.0;
        }
        (self.offset / self.max).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Default)]
pub struct RevealState {
    pub active: bool,
    pub project: Option<ProjectRecord>,
    pub matched: Vec<EntityId>,
    pub sentence: Option<Sentence>,
    pub blur: Option<EntityId>,
    pub titles: Vec<EntityId>,
    pub effect: Option<EffectId>,
    pub scroll: Option<ScrollStage>,
    pub(crate) handles: Handles,
}

impl App {
    pub(crate) fn start_reveal(&mut self, ctx: &mut EngineContext, project_id: &str, matched: Vec<EntityId>) {
        let Some(project) = self.catalog.get(project_id).cloned() else { return };
        log::info!("reveal: '{}' with {} words", project.name, matched.len());
        self.reveal = RevealState {
            active: true,
            project: Some(project),
            matched: matched.clone(),
            ..RevealState::default()
        };
        self.set_phase(FieldPhase::Unlocking);
        self.clear_hints();
        self.nav.stop();

        let cfg = &self.config.reveal;
        let (dim, explode_after) = (cfg.dim_duration, cfg.explode_after);
        self.dim_others(&matched, 0.0, dim);
        self.gather_words(&ctx.camera, &matched);
        self.post_collected_bar(false);
        let timer = self.scheduler.delay(explode_after, Cue::RevealExplode);
        self.reveal.handles.timers.push(timer);
    }

    /// Line `ids` up side by side in front of the camera, spinning once on the way.
    pub(crate) fn gather_words(&mut self, camera: &Camera3D, ids: &[EntityId]) {
        let cfg = &self.config.reveal;
        let words: Vec<(EntityId, f32, f32)> = ids
            .iter()
            .filter_map(|&id| self.scene.field.get(id))
            .map(|e| (e.id, self.layout.label_size(&e.word).x * cfg.gather_scale, e.spin))
            .collect();
        if words.is_empty() {
            return;
        }
        let total: f32 = words.iter().map(|(_, w, _)| w).sum::<f32>() + cfg.word_gap * (words.len() - 1) as f32;
        let anchor = camera.position + camera.forward() * cfg.anchor_depth;
        let right = camera.right();

        let mut x = -total / 2.0;
        for (id, width, spin) in words {
            let position = anchor + right * (x + width / 2.0);
            x += width + cfg.word_gap;

            let target = Target::Keyword(id);
            self.scheduler.cancel(target, None);
            if let Some(e) = self.scene.field.get_mut(id) {
                e.state = EntityState::Fixed;
            }
            let d = cfg.gather_duration;
            self.scheduler
                .schedule(Tween::to(target, Property::Position, position, d).with_easing(Easing::QUART_IN_OUT), None);
            self.scheduler
                .schedule(Tween::to(target, Property::Rotation, spin + TAU, d).with_easing(Easing::CUBIC_IN_OUT), None);
            self.scheduler.schedule(
                Tween::to(target, Property::Scale, cfg.gather_scale, d).with_easing(Easing::QUART_OUT),
                None,
            );
            self.scheduler.schedule(Tween::to(target, Property::Opacity, 1.0, 0.5), None);
        }
    }

    /// Hide the gathered words and burst particles into `text`. The glyphs stay
    /// hidden until the particles settle into drift.
    pub(crate) fn explode_to_sentence(
        &mut self,
        ctx: &mut EngineContext,
        text: &str,
        matched: &[EntityId],
    ) -> (Sentence, Option<EffectId>) {
        for &id in matched {
            self.scheduler.cancel(Target::Keyword(id), Some(Property::Opacity));
            if let Some(e) = self.scene.field.get_mut(id) {
                e.opacity = 0.0;
            }
        }

        let viewport = ctx.camera.viewport;
        let sentence_id = ctx.next_id();
        self.scene.overlays.create(sentence_id, ElementKind::Sentence, text, None, 0);
        if let Some(e) = self.scene.overlays.get_mut(sentence_id) {
            e.opacity = 1.0;
        }

        let rects = self.layout.glyph_rects(text, TextStyle::Sentence, viewport);
        let mut sentence = Sentence { id: sentence_id, glyphs: Vec::new() };
        let mut filled: Vec<Rect> = Vec::new();
        for (index, (c, rect)) in text.chars().zip(rects).enumerate() {
            let id = ctx.next_id();
            self.scene.overlays.create(id, ElementKind::Glyph, &c.to_string(), Some(sentence_id), index);
            sentence.glyphs.push((id, rect.center() - viewport / 2.0));
            if !c.is_whitespace() {
                filled.push(rect);
            }
        }

        let depth = self.config.reveal.sentence_depth;
        let targets = glyph_targets(&ctx.camera, &filled, depth);
        if targets.is_empty() {
            log::warn!("reveal: {}", FieldError::MissingInterface("sentence glyph layout"));
            let glyphs = sentence.glyph_ids();
            self.show_glyphs(&glyphs);
            return (sentence, None);
        }
        let centre = ctx.camera.to_world(Vec3::new(0.0, 0.0, -depth));
        let count = self.config.particles.sentence_count;
        let effect = ctx.effects.spawn(ParticleParams::converge_to_text(centre, targets, count));
        (sentence, Some(effect))
    }

    pub(crate) fn show_glyphs(&mut self, glyphs: &[EntityId]) {
        let stagger = self.config.reveal.glyph_stagger;
        for (i, &id) in glyphs.iter().enumerate() {
            self.scheduler.schedule(
                Tween::to(Target::Element(id), Property::Opacity, 1.0, 0.5).with_delay(i as f32 * stagger),
                None,
            );
        }
    }

    /// Fling every glyph outward from the centre, fading and tumbling.
    pub(crate) fn scatter_glyphs(&mut self, glyphs: &[(EntityId, Vec2)], last: Option<Cue>) {
        let duration = self.config.reveal.scatter_duration;
        let count = glyphs.len();
        for (i, &(id, dir)) in glyphs.iter().enumerate() {
            let target = Target::Element(id);
            let offset = Vec3::new(dir.x * 2.0 + self.rng.spread(250.0), dir.y * 2.0 + self.rng.spread(250.0), 0.0);
            let rotation = self.rng.range(0.0, TAU);
            for tween in [
                Tween::to(target, Property::Offset, offset, duration),
                Tween::to(target, Property::Rotation, rotation, duration),
            ] {
                self.scheduler.schedule(tween.with_easing(Easing::CUBIC_IN), None);
            }
            let cue = if i + 1 == count { last.clone() } else { None };
            self.scheduler.schedule(
                Tween::to(target, Property::Opacity, 0.0, duration).with_easing(Easing::CUBIC_IN),
                cue,
            );
        }
    }

    pub(crate) fn reveal_explode(&mut self, ctx: &mut EngineContext) {
        if !self.reveal.active {
            return;
        }
        let Some(text) = self.reveal.project.as_ref().map(|p| p.full_sentence.clone()) else { return };
        let matched = self.reveal.matched.clone();
        let (sentence, effect) = self.explode_to_sentence(ctx, &text, &matched);

        let handles = &mut self.reveal.handles;
        handles.elements.push(sentence.id);
        handles.elements.extend(sentence.glyph_ids());
        handles.effects.extend(effect);
        self.reveal.effect = effect;
        self.reveal.sentence = Some(sentence);

        let cfg = &self.config.reveal;
        let (blur_at, complete_after) = (cfg.blur_at, cfg.complete_after);
        let blur = self.scheduler.delay(blur_at, Cue::RevealBlur);
        let done = self.scheduler.delay(complete_after, Cue::RevealSentenceDone);
        self.reveal.handles.timers.extend([blur, done]);
    }

    pub(crate) fn reveal_blur(&mut self, ctx: &mut EngineContext) {
        if !self.reveal.active {
            return;
        }
        let id = ctx.next_id();
        self.scene.overlays.create(id, ElementKind::Blur, "", None, 0);
        self.scheduler.schedule(
            Tween::to(Target::Element(id), Property::Opacity, 1.0, 2.0).with_easing(Easing::CUBIC_IN_OUT),
            None,
        );
        self.reveal.blur = Some(id);
        self.reveal.handles.elements.push(id);
    }

    /// Scatter the sentence, release the gathered words and fly the title in.
    pub(crate) fn reveal_sentence_done(&mut self, ctx: &mut EngineContext) {
        if !self.reveal.active {
            return;
        }
        let glyphs = self.reveal.sentence.as_ref().map(|s| s.glyphs.clone()).unwrap_or_default();
        self.scatter_glyphs(&glyphs, None);

        if let Some(blur) = self.reveal.blur {
            let target = Target::Element(blur);
            let timeline = Timeline::new()
                .at(0.0, Tween::to(target, Property::Opacity, 0.2, 0.5))
                .at(2.0, Tween::to(target, Property::Opacity, 1.0, 1.0));
            let id = self.scheduler.play(timeline);
            self.reveal.handles.timelines.push(id);
        }

        let half = self.config.world_radius / 2.0;
        for &id in &self.reveal.matched {
            let position = Vec3::new(self.rng.spread(half), self.rng.spread(half), self.rng.spread(half));
            let spin = self.rng.range(0.0, TAU);
            let target = Target::Keyword(id);
            self.scheduler.schedule(Tween::to(target, Property::Position, position, 2.0), None);
            self.scheduler.schedule(Tween::to(target, Property::Rotation, spin, 2.0), None);
        }

        let name = self.reveal.project.as_ref().map(|p| p.name.clone()).unwrap_or_default();
        let cfg = &self.config.reveal;
        let (title_delay, title_stagger) = (cfg.title_delay, cfg.title_stagger);
        for (i, word) in name.split_whitespace().enumerate() {
            let id = ctx.next_id();
            self.scene.overlays.create(id, ElementKind::TitleWord, word, None, i);
            let angle = self.rng.range(0.0, TAU);
            let tilt = self.rng.spread(FRAC_PI_2);
            if let Some(e) = self.scene.overlays.get_mut(id) {
                e.offset = Vec3::new(angle.cos(), angle.sin(), 0.0) * 1000.0;
                e.rotation = tilt;
                e.opacity = 0.0;
            }
            let delay = title_delay + i as f32 * title_stagger;
            let target = Target::Element(id);
            for tween in [
                Tween::to(target, Property::Offset, Vec3::ZERO, 1.5),
                Tween::to(target, Property::Rotation, 0.0, 1.5),
                Tween::to(target, Property::Opacity, 1.0, 1.5),
            ] {
                self.scheduler.schedule(tween.with_easing(Easing::QUART_OUT).with_delay(delay), None);
            }
            self.reveal.titles.push(id);
            self.reveal.handles.elements.push(id);
        }

        let gone = self.scheduler.delay(self.config.reveal.scatter_duration + 0.5, Cue::RevealSentenceGone);
        let scroll = self.scheduler.delay(self.config.reveal.scroll_stage_after, Cue::RevealScrollStage);
        self.reveal.handles.timers.extend([gone, scroll]);
    }

    pub(crate) fn reveal_sentence_gone(&mut self) {
        let Some(sentence) = self.reveal.sentence.take() else { return };
        for id in std::iter::once(sentence.id).chain(sentence.glyph_ids()) {
            self.scheduler.cancel(Target::Element(id), None);
            self.scene.overlays.remove(id);
        }
    }

    pub(crate) fn reveal_scroll_stage(&mut self, ctx: &mut EngineContext) {
        if !self.reveal.active {
            return;
        }
        let hint = ctx.next_id();
        self.scene.overlays.create(hint, ElementKind::ScrollHint, "SCROLL", None, 0);
        self.scheduler.schedule(Tween::to(Target::Element(hint), Property::Opacity, 1.0, 0.6), None);
        self.reveal.handles.elements.push(hint);

        let viewport = ctx.camera.viewport;
        let name = self.reveal.project.as_ref().map(|p| p.name.as_str()).unwrap_or_default();
        let rects = self.layout.glyph_rects(name, TextStyle::ProjectTitle, viewport);
        let cfg = &self.config.reveal;
        let cover = Rect::union(&rects)
            .filter(|r| r.width > 0.0 && r.height > 0.0)
            .map_or(1.0, |r| (viewport.x / r.width).max(viewport.y / r.height))
            * cfg.cover_boost;
        self.reveal.scroll =
            Some(ScrollStage { hint, offset: 0.0, max: viewport.y * cfg.scroll_distance, cover, done: false });
    }

    /// Drive the title zoom from the wheel offset.
    pub(crate) fn apply_scroll(&mut self, ctx: &mut EngineContext) {
        let Some(stage) = self.reveal.scroll else { return };
        if stage.done {
            return;
        }
        let progress = stage.progress();
        if progress <= 0.0 {
            return;
        }
        let eased = Easing::CUBIC_IN_OUT.apply(progress);
        for &id in &self.reveal.titles {
            if self.scheduler.is_animating(Target::Element(id), Property::Opacity) {
                continue;
            }
            if let Some(e) = self.scene.overlays.get_mut(id) {
                e.scale = 1.0 + (stage.cover - 1.0) * eased;
                e.opacity = 1.0 - eased;
            }
        }
        self.scheduler.cancel(Target::Element(stage.hint), Some(Property::Opacity));
        if let Some(hint) = self.scene.overlays.get_mut(stage.hint) {
            hint.opacity = 1.0 - (progress / 0.3).min(1.0);
        }
        if progress >= self.config.reveal.complete_progress {
            self.complete_scroll(ctx);
        }
    }

    fn complete_scroll(&mut self, ctx: &mut EngineContext) {
        let Some(stage) = self.reveal.scroll.as_mut() else { return };
        stage.done = true;
        let hint = stage.hint;
        self.scene.overlays.remove(hint);

        if let Some(blur) = self.reveal.blur.take() {
            self.scheduler.schedule(
                Tween::to(Target::Element(blur), Property::Opacity, 0.0, 0.4),
                Some(Cue::RemoveElement(blur)),
            );
        }

        let (name, description) = self
            .reveal
            .project
            .as_ref()
            .map(|p| (p.name.clone(), p.description.clone()))
            .unwrap_or_default();
        let panel = ctx.next_id();
        self.scene.overlays.create(panel, ElementKind::DetailPanel, &name, None, 0);
        self.scheduler.schedule(Tween::to(Target::Element(panel), Property::Opacity, 1.0, 0.3), None);

        let stagger = self.config.reveal.panel_stagger;
        let parts = [
            (ElementKind::DetailBack, "BACK"),
            (ElementKind::DetailHeader, name.as_str()),
            (ElementKind::DetailBody, description.as_str()),
        ];
        let count = parts.len();
        for (i, (kind, text)) in parts.into_iter().enumerate() {
            let id = ctx.next_id();
            self.scene.overlays.create(id, kind, text, Some(panel), i);
            if let Some(e) = self.scene.overlays.get_mut(id) {
                e.offset = Vec3::new(0.0, 60.0, 0.0);
            }
            let delay = 0.3 + i as f32 * stagger;
            let target = Target::Element(id);
            self.scheduler.schedule(
                Tween::to(target, Property::Offset, Vec3::ZERO, 0.8).with_easing(Easing::CUBIC_OUT).with_delay(delay),
                None,
            );
            let cue = (i + 1 == count).then_some(Cue::RevealDetailShown);
            self.scheduler.schedule(
                Tween::to(target, Property::Opacity, 1.0, 0.8).with_easing(Easing::CUBIC_OUT).with_delay(delay),
                cue,
            );
        }
    }

    /// The panel is in: hand over to the detail view.
    pub(crate) fn reveal_detail_shown(&mut self, ctx: &mut EngineContext) {
        if !self.reveal.active {
            return;
        }
        let project_id = self.reveal.project.as_ref().map(|p| p.id.clone());
        self.reveal.handles.teardown(&mut self.scheduler, &mut ctx.effects, &mut self.scene.overlays);
        self.reveal = RevealState::default();
        if let Some(id) = project_id {
            self.show_detail(&id);
        }
        self.clear_selection();
        self.rebuild_gallery(ctx);
    }

    /// Stop a running reveal without opening the detail. The project stays collected.
    pub(crate) fn abort_reveal(&mut self, ctx: &mut EngineContext) {
        log::debug!("reveal: aborted");
        self.reveal.handles.teardown(&mut self.scheduler, &mut ctx.effects, &mut self.scene.overlays);
        for &id in &self.reveal.matched {
            self.scheduler.cancel(Target::Keyword(id), None);
            if let Some(e) = self.scene.field.get_mut(id) {
                e.position = e.original_position;
                e.scale = 1.0;
            }
        }
        self.reveal = RevealState::default();
        self.close_detail_panel();
        self.clear_selection();
        self.phase = FieldPhase::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{three_projects, Harness};
    use crate::app::{Command, View};
    use wander_engine::InputEvent;

    fn unlock_a(h: &mut Harness) {
        h.enter_field();
        for w in ["sea", "salt", "shore"] {
            h.select(w);
        }
        assert!(h.app.reveal.active);
    }

    #[test]
    fn gathered_words_line_up_in_front_of_the_camera() {
        let mut h = Harness::new(&three_projects());
        unlock_a(&mut h);
        h.run(2.4);
        let ids = h.app.reveal.matched.clone();
        assert_eq!(ids.len(), 3);
        let xs: Vec<f32> = ids.iter().map(|id| h.app.scene.field.get(*id).unwrap().position.x).collect();
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);
        let anchor_z = h.ctx.camera.position.z - h.app.config.reveal.anchor_depth;
        for id in &ids {
            let e = h.app.scene.field.get(*id).unwrap();
            assert_eq!(e.state, EntityState::Fixed);
            assert!((e.position.z - anchor_z).abs() < 1e-3);
        }
    }

    #[test]
    fn sentence_glyphs_appear_when_particles_drift() {
        let mut h = Harness::new(&three_projects());
        unlock_a(&mut h);
        h.run(3.0);
        let sentence = h.app.reveal.sentence.clone().unwrap();
        assert!(!sentence.glyphs.is_empty());
        assert!(h.app.reveal.effect.is_some());
        let first = sentence.glyphs[0].0;
        assert_eq!(h.app.scene.overlays.get(first).unwrap().opacity, 0.0);
        h.run(5.0);
        assert!(h.app.scene.overlays.get(first).unwrap().opacity > 0.9);
        assert!(h.app.reveal.blur.is_some());
    }

    #[test]
    fn scrolling_opens_the_detail_and_back_returns_to_the_field() {
        let mut h = Harness::new(&three_projects());
        unlock_a(&mut h);
        h.run(19.0);
        assert!(h.app.reveal.scroll.is_some());
        assert!(h.app.reveal.sentence.is_none());
        assert_eq!(h.app.reveal.titles.len(), 2);

        h.event(InputEvent::Wheel { delta: 300.0 });
        h.frame(0.05);
        let title = h.app.reveal.titles[0];
        assert!(h.app.scene.overlays.get(title).unwrap().scale > 1.0);
        h.event(InputEvent::Wheel { delta: 5000.0 });
        h.run(2.0);

        assert_eq!(h.app.view(), View::ProjectDetail);
        assert_eq!(h.app.phase(), FieldPhase::ProjectReveal);
        assert!(!h.app.reveal.active);
        assert!(h.app.selection().is_empty());
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::DetailBody).count(), 1);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::TitleWord).count(), 0);

        h.command(Command::DetailBack);
        assert_eq!(h.app.view(), View::Field);
        assert_eq!(h.app.phase(), FieldPhase::Active);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::DetailPanel).count(), 0);
    }

    #[test]
    fn leaving_the_field_aborts_the_reveal() {
        let mut h = Harness::new(&three_projects());
        unlock_a(&mut h);
        h.run(8.0);
        h.command(Command::Navigate(View::Gallery));
        assert!(!h.app.reveal.active);
        assert!(h.app.collection().contains("a"));
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::Glyph).count(), 0);
        assert!(h.app.scene.field.entities.iter().all(|e| e.state == EntityState::Idle));
        h.run(15.0);
        assert_eq!(h.app.view(), View::Gallery);
    }
}
