//! Floating card wall of every project.

use glam::{Vec2, Vec3};
use wander_engine::{Camera3D, EntityId, KeywordInstance, Rng};

use crate::collection::CollectionState;
use crate::config::GalleryConfig;
use crate::field::{billboard_hit, local_ray};
use crate::messages::CardInfo;
use crate::project::ProjectRecord;

#[derive(Debug, Clone)]
pub struct Card {
    pub id: EntityId,
    pub project_id: String,
    pub base_position: Vec3,
    pub position: Vec3,
    pub scale: f32,
    pub float_seed: f32,
    pub collected: bool,
    /// Driven by a transition instead of the float animation.
    pub transitioning: bool,
}

/// Card flying to or from the detail view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransition {
    pub card: EntityId,
    pub from_position: Vec3,
    pub from_scale: f32,
    pub active: bool,
}

#[derive(Debug, Default)]
pub struct Gallery {
    pub cards: Vec<Card>,
    pub hovered: Option<EntityId>,
    pub transition: Option<CardTransition>,
}

impl Gallery {
    /// Lay out `projects` in shuffled order on a gently curved wall.
    pub fn build(
        projects: &[&ProjectRecord],
        collection: &CollectionState,
        cfg: &GalleryConfig,
        rng: &mut Rng,
        mut next_id: impl FnMut() -> EntityId,
    ) -> Self {
        let mut order: Vec<&ProjectRecord> = projects.to_vec();
        rng.shuffle(&mut order);

        let rows = cfg.row_counts.len();
        let start_y = (rows.saturating_sub(1)) as f32 * cfg.spacing_y / 2.0;
        let mut cards = Vec::with_capacity(order.len());
        let mut remaining = order.into_iter();

        'rows: for (row, &cols) in cfg.row_counts.iter().enumerate() {
            let row_start_x = -((cols.saturating_sub(1)) as f32 * cfg.spacing_x) / 2.0;
            let centre = (cols.saturating_sub(1)) as f32 / 2.0;
            for col in 0..cols {
                let Some(project) = remaining.next() else { break 'rows };
                let (c, r) = (col as f32, row as f32);
                let stagger = (c - centre) * cfg.spacing_x * 0.08;
                let x = row_start_x + c * cfg.spacing_x + stagger + rng.spread(0.2);
                let y = start_y - r * cfg.spacing_y + rng.spread(0.15) + (c * 0.6 + r * 0.4).sin() * 0.3;
                let col_offset = if cols > 1 { (c - centre) / centre } else { 0.0 };
                let z = -col_offset.abs() * 2.1 + rng.spread(0.3) + (r * 0.7).sin() * 0.3;
                let position = Vec3::new(x, y, z);
                cards.push(Card {
                    id: next_id(),
                    project_id: project.id.clone(),
                    base_position: position,
                    position,
                    scale: 1.0,
                    float_seed: rng.range(0.0, std::f32::consts::TAU),
                    collected: collection.contains(&project.id),
                    transitioning: false,
                });
            }
        }
        Self { cards, hovered: None, transition: None }
    }

    pub fn get(&self, id: EntityId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.transition.map_or(false, |t| t.active)
    }

    /// Float every idle card around its base position and refresh collected flags.
    pub fn update(&mut self, time: f32, collection: &CollectionState) {
        for card in &mut self.cards {
            card.collected = collection.contains(&card.project_id);
            if card.transitioning {
                continue;
            }
            let s = card.float_seed;
            card.position = card.base_position
                + Vec3::new(
                    (time * 0.6 + s).sin() * 0.12,
                    (time * 0.7 + s).cos() * 0.16,
                    (time * 0.5 + s).sin() * 0.08,
                );
        }
    }

    pub fn pick(&self, camera: &Camera3D, ndc: Vec2, cfg: &GalleryConfig) -> Option<EntityId> {
        let dir = local_ray(camera, ndc)?;
        let half = Vec2::new(cfg.card_width, cfg.card_height) / 2.0;
        self.cards
            .iter()
            .filter_map(|c| billboard_hit(camera, dir, c.position, half * c.scale).map(|d| (d, c.id)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    /// Where a card must go to cover the viewport: (position, scale).
    pub fn cover_pose(camera: &Camera3D, cfg: &GalleryConfig) -> (Vec3, f32) {
        let position = camera.position + camera.forward() * cfg.focus_depth;
        let height = camera.visible_height(cfg.focus_depth);
        let width = height * camera.aspect();
        let scale = (width / cfg.card_width).max(height / cfg.card_height) * 1.03;
        (position, scale)
    }

    pub fn card_infos(&self, projects: &[&ProjectRecord]) -> Vec<CardInfo> {
        self.cards
            .iter()
            .filter_map(|c| {
                let p = projects.iter().find(|p| p.id == c.project_id)?;
                Some(CardInfo {
                    id: c.id,
                    project_id: p.id.clone(),
                    name: p.name.clone(),
                    image: p.image.clone(),
                    collected: c.collected,
                })
            })
            .collect()
    }

    pub fn instances(&self) -> impl Iterator<Item = KeywordInstance> + '_ {
        self.cards.iter().map(|c| KeywordInstance {
            x: c.position.x,
            y: c.position.y,
            z: c.position.z,
            scale: c.scale,
            opacity: 1.0,
            r: 1.0,
            g: 1.0,
            b: 1.0,
            spin: 0.0,
            word: c.id.0 as f32,
            state: if c.collected { 6.0 } else { 5.0 },
            _pad: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::record;

    fn build(n: usize) -> (Gallery, Vec<ProjectRecord>) {
        let records: Vec<ProjectRecord> = (0..n).map(|i| record(&format!("p{}", i), &["a"])).collect();
        let refs: Vec<&ProjectRecord> = records.iter().collect();
        let mut collection = CollectionState::new();
        collection.collect("p0", &[]);
        let mut next = 100;
        let gallery = Gallery::build(&refs, &collection, &GalleryConfig::default(), &mut Rng::new(5), || {
            next += 1;
            EntityId(next)
        });
        (gallery, records)
    }

    #[test]
    fn rows_hold_at_most_ten_cards() {
        let (g, _) = build(10);
        assert_eq!(g.len(), 10);
        let (g, _) = build(12);
        assert_eq!(g.len(), 10);
        let (g, _) = build(2);
        assert_eq!(g.len(), 2);
        assert_eq!(g.cards.iter().filter(|c| c.collected).count(), 1);
    }

    #[test]
    fn picking_hits_the_card_under_the_pointer() {
        let (mut g, _) = build(1);
        g.cards[0].position = Vec3::new(0.0, 0.0, 0.0);
        let mut camera = Camera3D::default();
        camera.position = Vec3::new(0.0, 0.0, 12.0);
        let cfg = GalleryConfig::default();
        assert_eq!(g.pick(&camera, Vec2::ZERO, &cfg), Some(g.cards[0].id));
        assert_eq!(g.pick(&camera, Vec2::new(0.9, 0.9), &cfg), None);
    }

    #[test]
    fn cover_pose_fills_the_view() {
        let camera = Camera3D::default();
        let cfg = GalleryConfig::default();
        let (position, scale) = Gallery::cover_pose(&camera, &cfg);
        assert!((position - Vec3::new(0.0, 0.0, 5.0 - cfg.focus_depth)).length() < 1e-4);
        let h = camera.visible_height(cfg.focus_depth);
        assert!(cfg.card_height * scale >= h);
        assert!(cfg.card_width * scale >= h * camera.aspect());
    }

    #[test]
    fn floating_skips_transitioning_cards() {
        let (mut g, _) = build(2);
        g.cards[1].transitioning = true;
        g.cards[1].position = Vec3::splat(9.0);
        g.update(1.0, &CollectionState::new());
        assert_eq!(g.cards[1].position, Vec3::splat(9.0));
        assert!((g.cards[0].position - g.cards[0].base_position).length() < 0.3);
        assert!(!g.cards[0].collected);
    }
}
