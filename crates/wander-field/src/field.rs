//! The keyword field: a camera-relative, toroidally wrapped volume of
//! billboarded keyword labels with distance fog.

use glam::{Quat, Vec2, Vec3};
use wander_engine::{Camera3D, EntityId, KeywordInstance, Rng};

use crate::config::FogConfig;
use crate::presentation::TextLayout;
use crate::project::normalize_word;

pub const WHITE: Vec3 = Vec3::ONE;

/// Interaction state of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Idle,
    Hovered,
    Selected,
    Hinted,
    /// Pinned by a running sequence.
    Fixed,
}

impl EntityState {
    /// Selected and fixed entities are exempt from bob, fog and wrap.
    pub fn is_pinned(self) -> bool {
        matches!(self, EntityState::Selected | EntityState::Fixed)
    }

    /// Numeric code written into the render instance.
    pub fn code(self) -> f32 {
        match self {
            EntityState::Idle => 0.0,
            EntityState::Hovered => 1.0,
            EntityState::Selected => 2.0,
            EntityState::Hinted => 3.0,
            EntityState::Fixed => 4.0,
        }
    }
}

/// Galaxy orbit assigned at the start of the finale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub radius: f32,
    pub base_angle: f32,
    pub tilt: f32,
    pub speed: f32,
    pub wobble: f32,
}

impl Orbit {
    /// Orbit through `position` around the origin.
    pub fn through(position: Vec3, rng: &mut Rng) -> Self {
        let radius = position.length().max(4.0);
        let flat = Vec2::new(position.x, position.z).length().max(0.001);
        Self {
            radius,
            base_angle: position.z.atan2(position.x),
            tilt: position.y.atan2(flat),
            speed: rng.range(0.6, 1.3),
            wobble: rng.range(0.0, std::f32::consts::TAU),
        }
    }

    /// Position after the shared spin angle has advanced by `spin`.
    pub fn position(&self, spin: f32) -> Vec3 {
        let angle = self.base_angle + spin * self.speed;
        Vec3::new(
            angle.cos() * self.radius,
            (angle * 0.35 + self.wobble).sin() * self.radius * 0.12,
            angle.sin() * self.radius,
        )
    }
}

#[derive(Debug, Clone)]
pub struct KeywordEntity {
    pub id: EntityId,
    pub word: String,
    /// Normalized word, the natural key within the field.
    pub key: String,
    pub position: Vec3,
    pub original_position: Vec3,
    pub velocity: Vec3,
    pub state: EntityState,
    pub user_submitted: bool,
    pub opacity: f32,
    pub tint: Vec3,
    /// Multiplier on the label's base size.
    pub scale: f32,
    /// Extra rotation about the label's vertical axis, radians.
    pub spin: f32,
    pub orbit: Option<Orbit>,
}

impl KeywordEntity {
    pub fn new(id: EntityId, word: &str, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            word: word.trim().to_string(),
            key: normalize_word(word),
            position,
            original_position: position,
            velocity,
            state: EntityState::Idle,
            user_submitted: false,
            opacity: 0.0,
            tint: WHITE,
            scale: 1.0,
            spin: 0.0,
            orbit: None,
        }
    }
}

/// Target opacity at distance `d` for world radius `r`. Non-increasing in `d`.
pub fn fog_opacity(d: f32, r: f32, fog: &FogConfig) -> f32 {
    let near = r * fog.near;
    let mid = r * fog.mid;
    let far = r * fog.far;
    if d <= near {
        fog.full_opacity
    } else if d <= mid {
        let t = (d - near) / (mid - near);
        fog.full_opacity - t * (fog.full_opacity - fog.mid_opacity)
    } else if d <= r {
        let t = (d - mid) / (r - mid);
        fog.mid_opacity - t * (fog.mid_opacity - fog.edge_opacity)
    } else {
        let t = ((d - r) / (far - r)).min(1.0);
        fog.edge_opacity * (1.0 - t)
    }
}

/// Shift `position` by whole multiples of `2r` along the camera axes so every
/// camera-relative component lies in `[-r, r]`. A non-positive `r` wraps nothing.
pub fn wrap_position(position: Vec3, camera: &Camera3D, r: f32) -> Vec3 {
    if r.is_nan() || r <= 0.0 {
        return position;
    }
    let span = 2.0 * r;
    let mut p = position;
    for axis in [camera.right(), camera.up(), camera.forward()] {
        let along = (p - camera.position).dot(axis);
        if along.abs() > r {
            p -= axis * (span * ((along + r) / span).floor());
        }
    }
    p
}

/// Point `radius` away from `center`, in the direction of `position` turned by
/// `turn` radians about the world Y axis.
pub fn orbit_slot(center: Vec3, position: Vec3, radius: f32, turn: f32) -> Vec3 {
    let direction = (position - center).try_normalize().unwrap_or(Vec3::X);
    center + Quat::from_rotation_y(turn) * direction * radius
}

/// Per-tick settings for `Field::advance`.
pub struct Ambient<'a> {
    pub time: f32,
    pub radius: f32,
    pub bob: f32,
    pub fog: Option<&'a FogConfig>,
}

/// All keyword entities of one field session.
#[derive(Debug, Default)]
pub struct Field {
    pub entities: Vec<KeywordEntity>,
}

impl Field {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&KeywordEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut KeywordEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn find_word(&self, word: &str) -> Option<&KeywordEntity> {
        let key = normalize_word(word);
        self.entities.iter().find(|e| e.key == key)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    /// Random spawn point inside the field volume.
    pub fn scatter_point(rng: &mut Rng, r: f32) -> Vec3 {
        Vec3::new(rng.spread(r * 0.7), rng.spread(r * 0.45), rng.spread(r * 0.7))
    }

    /// Add an entity for `word` unless one with the same normalized word exists.
    /// Returns the id of the entity now carrying the word.
    pub fn spawn(&mut self, id: EntityId, word: &str, rng: &mut Rng, r: f32) -> (EntityId, bool) {
        if let Some(existing) = self.find_word(word) {
            return (existing.id, false);
        }
        let position = Self::scatter_point(rng, r);
        let velocity = Vec3::new(rng.spread(0.005), rng.spread(0.005), rng.spread(0.005));
        self.entities.push(KeywordEntity::new(id, word, position, velocity));
        (id, true)
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id != id);
        before != self.entities.len()
    }

    /// Billboarded labels only need bob, fog and wrap; orientation is applied
    /// by the presenter from the camera uniform.
    pub fn advance(&mut self, camera: &Camera3D, ambient: &Ambient) {
        for e in &mut self.entities {
            if e.state.is_pinned() {
                continue;
            }
            e.position.y += (ambient.time + e.position.x).sin() * ambient.bob;

            if let Some(fog) = ambient.fog {
                let target = fog_opacity(e.position.distance(camera.position), ambient.radius, fog);
                e.opacity += (target - e.opacity) * fog.smoothing;
            }

            e.position = wrap_position(e.position, camera, ambient.radius);
        }
    }

    /// Move every orbiting, unpinned entity to its place on the spinning galaxy.
    pub fn orbit(&mut self, spin: f32) {
        for e in &mut self.entities {
            if e.state == EntityState::Selected {
                continue;
            }
            if let Some(orbit) = e.orbit {
                e.position = orbit.position(spin);
            }
        }
    }

    pub fn instances(&self) -> impl Iterator<Item = KeywordInstance> + '_ {
        self.entities.iter().map(|e| KeywordInstance {
            x: e.position.x,
            y: e.position.y,
            z: e.position.z,
            scale: e.scale,
            opacity: e.opacity,
            r: e.tint.x,
            g: e.tint.y,
            b: e.tint.z,
            spin: e.spin,
            word: e.id.0 as f32,
            state: e.state.code(),
            _pad: 0.0,
        })
    }

    /// Nearest entity whose billboard rect the NDC ray passes through.
    pub fn pick(&self, camera: &Camera3D, ndc: Vec2, layout: &dyn TextLayout) -> Option<EntityId> {
        let dir = local_ray(camera, ndc)?;
        let mut best: Option<(f32, EntityId)> = None;
        for e in &self.entities {
            let half = layout.label_size(&e.word) * e.scale / 2.0;
            if let Some(depth) = billboard_hit(camera, dir, e.position, half) {
                if best.map_or(true, |(d, _)| depth < d) {
                    best = Some((depth, e.id));
                }
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Camera-local direction of the eye ray through `ndc`, if it points forward.
pub fn local_ray(camera: &Camera3D, ndc: Vec2) -> Option<Vec3> {
    let (_, dir) = camera.ray(ndc);
    let local = camera.orientation.inverse() * dir;
    (local.z < -1e-6).then_some(local)
}

/// Depth at which a camera-local ray crosses the camera-facing rect of
/// half-extent `half` centred on `center`.
pub fn billboard_hit(camera: &Camera3D, dir_local: Vec3, center: Vec3, half: Vec2) -> Option<f32> {
    let local = camera.to_local(center);
    if local.z >= -camera.near {
        return None;
    }
    let hit = dir_local * (local.z / dir_local.z);
    let inside = (hit.x - local.x).abs() <= half.x && (hit.y - local.y).abs() <= half.y;
    inside.then_some(-local.z)
}
