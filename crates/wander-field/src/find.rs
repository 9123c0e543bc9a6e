//! Find-yourself: the user's own words join the field, and picking enough of
//! them plays a sentence of its own instead of unlocking a project.

use wander_engine::{EffectId, Easing, EngineContext, EntityId, Property, Tween};

use crate::app::{App, FieldPhase, Handles, View};
use crate::error::FieldError;
use crate::field::{EntityState, WHITE};
use crate::messages::Message;
use crate::project::normalize_word;
use crate::reveal::Sentence;
use crate::session::{split_find_input, FIND_MIN_WORDS};
use crate::stage::{Cue, Target};

/// The running completion choreography.
#[derive(Debug, Default)]
pub struct FindSequence {
    pub matched: Vec<EntityId>,
    pub sentence: Option<Sentence>,
    pub effect: Option<EffectId>,
    pub(crate) handles: Handles,
}

impl App {
    pub(crate) fn find_add(&mut self, raw: &str) {
        for word in split_find_input(raw) {
            let key = normalize_word(&word);
            if !self.find_input.iter().any(|w| normalize_word(w) == key) {
                self.find_input.push(word);
            }
        }
        self.post_find_words();
    }

    pub(crate) fn find_remove(&mut self, raw: &str) {
        let key = normalize_word(raw);
        self.find_input.retain(|w| normalize_word(w) != key);
        self.post_find_words();
    }

    fn post_find_words(&mut self) {
        self.outbox.push(Message::FindWords { words: self.find_input.clone(), active: self.find.active });
    }

    /// Submit the staged words. Before the field exists they are kept and
    /// applied once the projects finish loading.
    pub(crate) fn find_start(&mut self, ctx: &mut EngineContext) {
        let needed = self.config.find_threshold.max(FIND_MIN_WORDS);
        if self.find_input.len() < needed {
            let err = FieldError::Precondition(format!("find-yourself needs {} words, got {}", needed, self.find_input.len()));
            log::warn!("find: {}", err);
            return;
        }
        if self.reveal.active || self.find.sequence_active || self.finale.active {
            log::debug!("find: busy, submission ignored");
            return;
        }
        let words = std::mem::take(&mut self.find_input);
        self.reset_find();
        self.find.active = true;

        if self.view != View::Field {
            self.switch_view(ctx, View::Field);
        }
        if matches!(self.phase, FieldPhase::Landing | FieldPhase::Shattering) {
            self.enter_active();
        }
        if self.field_ready {
            self.apply_find_words(ctx, &words);
        } else {
            log::info!("find: {} words pending until the field loads", words.len());
            self.find.pending = words.clone();
        }
        self.outbox.push(Message::FindWords { words, active: true });
    }

    /// Attach each word to an entity, reusing one that already carries it.
    pub(crate) fn apply_find_words(&mut self, ctx: &mut EngineContext, words: &[String]) {
        for word in words {
            if !self.find.add_word(word) {
                continue;
            }
            let id = match self.scene.field.find_word(word) {
                Some(e) => e.id,
                None => {
                    let id = self.spawn_keyword(ctx, word, true);
                    self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Opacity, 0.6, 1.2), None);
                    id
                }
            };
            self.find.word_entities.push(id);
        }
        log::info!("find: {} words in the field", self.find.words.len());
    }

    /// End the session and drop the entities it added to the field.
    pub(crate) fn reset_find(&mut self) {
        let added: Vec<EntityId> =
            self.scene.field.entities.iter().filter(|e| e.user_submitted).map(|e| e.id).collect();
        for id in added {
            self.scheduler.cancel(Target::Keyword(id), None);
            self.scene.field.remove(id);
            self.outbox.push(Message::KeywordRemoved { id });
        }
        for &id in self.find.selection.entities() {
            if let Some(e) = self.scene.field.get_mut(id) {
                e.state = EntityState::Idle;
                e.tint = WHITE;
                e.scale = 1.0;
            }
        }
        self.find.reset();
    }

    pub(crate) fn select_user_keyword(&mut self, ctx: &mut EngineContext, id: EntityId) {
        if self.find.sequence_active {
            return;
        }
        let Some(word) = self.scene.field.get(id).map(|e| e.word.clone()) else { return };
        if !self.find.selection.push(&word, id) {
            self.user_hints(id);
            return;
        }
        if let Some(e) = self.scene.field.get_mut(id) {
            e.state = EntityState::Selected;
        }
        self.selection_feedback(ctx, id);
        self.post_collected_bar(true);
        self.user_hints(id);

        if self.find.ready(self.config.find_threshold) {
            if let Err(err) = self.start_find_sequence(ctx) {
                log::warn!("find: {}", err);
            }
        }
    }

    /// Link `from` to the user words not yet picked.
    fn user_hints(&mut self, from: EntityId) {
        self.clear_hints();
        let picked = self.find.selection.entities();
        let others: Vec<EntityId> =
            self.find.word_entities.iter().copied().filter(|id| *id != from && !picked.contains(id)).collect();
        self.mark_hinted(&others, self.config.interaction.user_hint_tint);
        self.outbox.push(Message::HintLines { from: Some(from), to: others });
    }

    pub(crate) fn start_find_sequence(&mut self, ctx: &mut EngineContext) -> Result<(), FieldError> {
        self.set_phase(FieldPhase::Unlocking);
        self.find.sequence_active = true;
        let matched: Vec<EntityId> = self.find.selection.entities().iter().take(FIND_MIN_WORDS).copied().collect();
        if matched.len() < FIND_MIN_WORDS {
            self.find.sequence_active = false;
            self.set_phase(FieldPhase::Active);
            return Err(FieldError::Precondition(format!(
                "find-yourself sequence needs {} picked words, got {}",
                FIND_MIN_WORDS,
                matched.len()
            )));
        }
        log::info!("find: sequence started");
        self.find_seq = FindSequence { matched: matched.clone(), ..FindSequence::default() };
        self.nav.stop();
        self.clear_hints();
        self.dim_others(&matched, 0.0, self.config.reveal.dim_duration);
        self.gather_words(&ctx.camera, &matched);
        self.post_collected_bar(false);
        let timer = self.scheduler.delay(self.config.reveal.explode_after, Cue::FindExplode);
        self.find_seq.handles.timers.push(timer);
        Ok(())
    }

    pub(crate) fn find_explode(&mut self, ctx: &mut EngineContext) {
        if !self.find.sequence_active {
            return;
        }
        let text = self.config.find_sentence.clone();
        let matched = self.find_seq.matched.clone();
        let (sentence, effect) = self.explode_to_sentence(ctx, &text, &matched);

        let handles = &mut self.find_seq.handles;
        handles.elements.push(sentence.id);
        handles.elements.extend(sentence.glyph_ids());
        handles.effects.extend(effect);
        self.find_seq.effect = effect;
        self.find_seq.sentence = Some(sentence);

        let timer = self.scheduler.delay(self.config.reveal.complete_after, Cue::FindSentenceDone);
        self.find_seq.handles.timers.push(timer);
    }

    pub(crate) fn find_sentence_done(&mut self) {
        if !self.find.sequence_active {
            return;
        }
        let glyphs = self.find_seq.sentence.as_ref().map(|s| s.glyphs.clone()).unwrap_or_default();
        if glyphs.is_empty() {
            let timer = self.scheduler.delay(0.0, Cue::FindScatterDone);
            self.find_seq.handles.timers.push(timer);
        } else {
            self.scatter_glyphs(&glyphs, Some(Cue::FindScatterDone));
        }
    }

    /// Put the picked words back where they came from and hand the field back.
    pub(crate) fn finish_find_sequence(&mut self, ctx: &mut EngineContext) {
        if !self.find.sequence_active {
            return;
        }
        self.find_seq.handles.teardown(&mut self.scheduler, &mut ctx.effects, &mut self.scene.overlays);
        let matched = std::mem::take(&mut self.find_seq.matched);
        self.find_seq = FindSequence::default();

        for id in self.scene.field.ids() {
            if !matched.contains(&id) {
                self.scheduler.schedule(Tween::to(Target::Keyword(id), Property::Opacity, 0.6, 1.2), None);
            }
        }
        for &id in &matched {
            let target = Target::Keyword(id);
            self.scheduler.cancel(target, None);
            let Some(e) = self.scene.field.get_mut(id) else { continue };
            e.state = EntityState::Idle;
            e.tint = WHITE;
            let home = e.original_position;
            self.scheduler.schedule(Tween::to(target, Property::Opacity, 0.6, 0.6), None);
            self.scheduler
                .schedule(Tween::to(target, Property::Scale, 1.0, 1.2).with_easing(Easing::QUART_OUT), None);
            self.scheduler
                .schedule(Tween::to(target, Property::Position, home, 1.6).with_easing(Easing::QUART_IN_OUT), None);
        }

        self.clear_hints();
        for &id in self.find.selection.entities() {
            if let Some(e) = self.scene.field.get_mut(id) {
                if e.state == EntityState::Selected {
                    e.state = EntityState::Idle;
                    e.tint = WHITE;
                }
            }
        }
        self.find.selection.clear();
        self.find.sequence_active = false;
        self.set_phase(FieldPhase::Active);
        self.post_collected_bar(false);
        log::info!("find: sequence finished");
    }

    pub(crate) fn abort_find_sequence(&mut self, ctx: &mut EngineContext) {
        log::debug!("find: sequence aborted");
        self.finish_find_sequence(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{three_projects, Harness};
    use crate::app::Command;
    use crate::config::FieldConfig;
    use crate::overlay::ElementKind;
    use wander_engine::InputEvent;

    #[test]
    fn staged_words_are_distinct() {
        let mut h = Harness::new(&three_projects());
        h.command(Command::FindAdd("River, stone; river".into()));
        h.command(Command::FindAdd("STONE\nsea".into()));
        assert_eq!(h.app.find_input, vec!["River".to_string(), "stone".to_string(), "sea".to_string()]);
        h.command(Command::FindRemove(" river ".into()));
        assert_eq!(h.app.find_input.len(), 2);
    }

    #[test]
    fn too_few_words_do_not_start() {
        let mut h = Harness::new(&three_projects());
        h.command(Command::FindAdd("river, stone".into()));
        h.command(Command::FindStart);
        assert!(!h.app.find.active);
        assert_eq!(h.app.find_input.len(), 2);
    }

    #[test]
    fn words_submitted_before_loading_wait_for_the_field() {
        let records = three_projects();
        let mut config = FieldConfig::default();
        config.project_ids = records.iter().map(|r| r.id.clone()).collect();
        let mut app = App::headless(config);
        let mut ctx = EngineContext::new();
        app.init(&mut ctx);

        app.command(&mut ctx, Command::FindAdd("river, stone, sea".into()));
        app.command(&mut ctx, Command::FindStart);
        assert!(app.find.active);
        assert_eq!(app.find.pending.len(), 3);
        assert_eq!(app.phase(), FieldPhase::Active);
        assert!(app.scene.field.is_empty());

        for r in &records {
            let body = serde_json::to_string(r).unwrap();
            app.handle_event(&mut ctx, &InputEvent::Payload { key: r.id.clone(), body: Ok(body) });
        }
        assert!(app.find.pending.is_empty());
        assert_eq!(app.find.word_entities.len(), 3);
        assert_eq!(app.scene.field.len(), 11);
        assert_eq!(app.scene.field.entities.iter().filter(|e| e.user_submitted).count(), 2);
    }

    #[test]
    fn picking_three_user_words_plays_and_restores() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.command(Command::FindAdd("river, stone, sea".into()));
        h.command(Command::FindStart);
        assert_eq!(h.app.find.word_entities.len(), 3);

        h.select("river");
        h.select("stone");
        assert!(!h.app.find.sequence_active);
        let stone = h.id_of("stone");
        assert_eq!(h.app.scene.field.get(stone).unwrap().state, EntityState::Selected);
        h.select("sea");
        assert!(h.app.find.sequence_active);
        assert_eq!(h.app.phase(), FieldPhase::Unlocking);
        assert!(h.app.collection().is_empty());

        h.run(3.0);
        assert!(h.app.find_seq.sentence.is_some());
        h.run(14.0);
        assert!(!h.app.find.sequence_active);
        assert_eq!(h.app.phase(), FieldPhase::Active);
        assert!(h.app.find.selection.is_empty());
        assert!(h.app.find.active);
        assert_eq!(h.app.scene.overlays.of_kind(ElementKind::Glyph).count(), 0);
        h.run(2.0);
        let e = h.app.scene.field.get(stone).unwrap();
        assert_eq!(e.state, EntityState::Idle);
        assert!((e.position - e.original_position).length() < 0.1);
    }

    #[test]
    fn sequence_needs_three_picked_words() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.app.find.active = true;
        let sea = h.id_of("sea");
        h.app.find.selection.push("sea", sea);
        let result = h.app.start_find_sequence(&mut h.ctx);
        assert!(matches!(result, Err(FieldError::Precondition(_))));
        assert!(!h.app.find.sequence_active);
        assert_eq!(h.app.phase(), FieldPhase::Active);
    }

    #[test]
    fn reset_removes_user_words() {
        let mut h = Harness::new(&three_projects());
        h.enter_field();
        h.command(Command::FindAdd("river, stone, sea".into()));
        h.command(Command::FindStart);
        assert_eq!(h.app.scene.field.len(), 11);
        h.app.reset_find();
        assert_eq!(h.app.scene.field.len(), 9);
        assert!(!h.app.find.active);
        h.frame(0.05);
        assert_eq!(h.posted_of_type("keywordRemoved"), 2);
    }
}
