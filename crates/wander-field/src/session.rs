use wander_engine::EntityId;

use crate::project::normalize_word;

/// Words picked toward the next unlock, in selection order.
///
/// `words` and `entities` always have the same length and no normalized
/// word appears twice.
#[derive(Debug, Clone, Default)]
pub struct SelectionSession {
    words: Vec<String>,
    entities: Vec<EntityId>,
}

impl SelectionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pick. Returns `false` when the word is already collected.
    pub fn push(&mut self, word: &str, entity: EntityId) -> bool {
        let key = normalize_word(word);
        if self.contains(&key) || self.entities.contains(&entity) {
            return false;
        }
        self.words.push(word.trim().to_string());
        self.entities.push(entity);
        true
    }

    pub fn contains(&self, word: &str) -> bool {
        let key = normalize_word(word);
        self.words.iter().any(|w| normalize_word(w) == key)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.entities.clear();
    }
}

/// Fewest user words a find-yourself session accepts.
pub const FIND_MIN_WORDS: usize = 3;

/// Split raw form input on commas, semicolons and newlines into distinct
/// trimmed words, keeping their first spelling.
pub fn split_find_input(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split([',', ';', '\n']) {
        let word = part.trim();
        if word.is_empty() {
            continue;
        }
        let key = normalize_word(word);
        if out.iter().any(|w| normalize_word(w) == key) {
            continue;
        }
        out.push(word.to_string());
    }
    out
}

/// The user-supplied matching mode.
#[derive(Debug, Clone, Default)]
pub struct FindYourselfSession {
    pub active: bool,
    /// Normalized user words.
    pub words: Vec<String>,
    /// Entity carrying each user word, parallel to `words` once applied.
    pub word_entities: Vec<EntityId>,
    pub selection: SelectionSession,
    /// Raw words submitted before the field existed.
    pub pending: Vec<String>,
    /// Completion choreography running.
    pub sequence_active: bool,
}

impl FindYourselfSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_word(&self, word: &str) -> bool {
        let key = normalize_word(word);
        self.words.iter().any(|w| *w == key)
    }

    /// Register a user word. Returns `false` for blanks and repeats.
    pub fn add_word(&mut self, word: &str) -> bool {
        let key = normalize_word(word);
        if key.is_empty() || self.has_word(&key) {
            return false;
        }
        self.words.push(key);
        true
    }

    pub fn remove_word(&mut self, word: &str) -> bool {
        let key = normalize_word(word);
        let Some(index) = self.words.iter().position(|w| *w == key) else {
            return false;
        };
        self.words.remove(index);
        if index < self.word_entities.len() {
            self.word_entities.remove(index);
        }
        true
    }

    /// Whether the completion sequence should start now.
    pub fn ready(&self, threshold: usize) -> bool {
        self.active && !self.sequence_active && self.selection.len() >= threshold.max(FIND_MIN_WORDS)
    }

    /// End the session, keeping nothing but queued pending input.
    pub fn reset(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        *self = Self { pending, ..Self::default() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_keeps_parallel_lists_without_duplicates() {
        let mut s = SelectionSession::new();
        let picks = [("Mirror", 1), ("mirror ", 2), ("sea", 3), ("SEA", 3), ("tide", 4), ("x", 4)];
        for (word, id) in picks {
            s.push(word, EntityId(id));
            assert_eq!(s.words().len(), s.entities().len());
        }
        assert_eq!(s.words(), &["Mirror", "sea", "tide"]);
        assert_eq!(s.entities(), &[EntityId(1), EntityId(3), EntityId(4)]);
        s.clear();
        assert!(s.is_empty());
        assert!(s.entities().is_empty());
    }

    #[test]
    fn split_trims_and_deduplicates() {
        let words = split_find_input(" Home, home;rain\n\n  Rain ;light ,");
        assert_eq!(words, vec!["Home", "rain", "light"]);
        assert!(split_find_input(" , ;\n").is_empty());
    }

    #[test]
    fn find_session_is_ready_once() {
        let mut f = FindYourselfSession::new();
        f.active = true;
        for (i, w) in ["a", "b", "c"].iter().enumerate() {
            assert!(f.add_word(w));
            f.selection.push(w, EntityId(i as u32));
        }
        assert!(!f.add_word(" A "));
        assert!(f.ready(3));
        f.sequence_active = true;
        assert!(!f.ready(3));
    }

    #[test]
    fn reset_keeps_pending_words() {
        let mut f = FindYourselfSession::new();
        f.active = true;
        f.add_word("a");
        f.pending.push("late".into());
        f.reset();
        assert!(!f.active);
        assert!(f.words.is_empty());
        assert_eq!(f.pending, vec!["late"]);
    }

    #[test]
    fn remove_word_keeps_entities_aligned() {
        let mut f = FindYourselfSession::new();
        f.add_word("a");
        f.add_word("b");
        f.word_entities = vec![EntityId(1), EntityId(2)];
        assert!(f.remove_word("A"));
        assert_eq!(f.words, vec!["b"]);
        assert_eq!(f.word_entities, vec![EntityId(2)]);
        assert!(!f.remove_word("zzz"));
    }
}
