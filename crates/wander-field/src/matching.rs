//! Keyword/project matching.

use wander_engine::Rng;

use crate::collection::CollectionState;
use crate::project::{normalize_word, ProjectRecord};

/// A project whose keywords the selection satisfies.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub project_id: String,
    /// Selected words that are keywords of the project, in selection order.
    pub matched_words: Vec<String>,
}

/// First uncollected project, in catalog order, sharing at least
/// `threshold` keywords with `words`.
pub fn check_match<'a>(
    projects: impl IntoIterator<Item = &'a ProjectRecord>,
    collection: &CollectionState,
    words: &[String],
    threshold: usize,
) -> Option<Match> {
    for project in projects {
        if collection.contains(&project.id) {
            continue;
        }
        let matched: Vec<String> = words.iter().filter(|w| project.has_keyword(w)).cloned().collect();
        if matched.len() >= threshold {
            return Some(Match { project_id: project.id.clone(), matched_words: matched });
        }
    }
    None
}

/// Keywords worth hinting at after `word` was picked: other keywords of
/// uncollected projects that contain it, minus the words already picked.
/// At most `limit`, randomly chosen.
pub fn hint_targets<'a>(
    projects: impl IntoIterator<Item = &'a ProjectRecord>,
    collection: &CollectionState,
    word: &str,
    picked: &[String],
    limit: usize,
    rng: &mut Rng,
) -> Vec<String> {
    let key = normalize_word(word);
    let picked: Vec<String> = picked.iter().map(|w| normalize_word(w)).collect();
    let mut candidates: Vec<String> = Vec::new();
    for project in projects {
        if collection.contains(&project.id) || !project.has_keyword(&key) {
            continue;
        }
        for keyword in &project.keywords {
            let k = normalize_word(keyword);
            if k == key || picked.contains(&k) || candidates.contains(&k) {
                continue;
            }
            candidates.push(k);
        }
    }
    rng.shuffle(&mut candidates);
    candidates.truncate(limit);
    candidates
}
