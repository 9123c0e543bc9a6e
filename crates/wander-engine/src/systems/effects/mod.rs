//! Visual effects system: particle choreographies.
//!
//! `EffectsState` owns every running particle system, advances them once per
//! tick and flattens the survivors into one vertex buffer for the presenter.

mod rng;
mod particle;

// Re-export public types
pub use rng::Rng;
pub use particle::{
    Behavior, FadeWindow, GlyphTarget, Milestone, Particle, ParticleParams, ParticleSystem, Phase,
    TEARDOWN_OPACITY,
};

/// Handle to a running particle system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(pub u32);

/// Container for all particle systems.
pub struct EffectsState {
    systems: Vec<(EffectId, ParticleSystem)>,
    milestones: Vec<(EffectId, Milestone)>,
    /// Flat vertex buffer: x, y, z, opacity per particle.
    pub effects_buffer: Vec<f32>,
    pub rng: Rng,
    next_id: u32,
}

impl EffectsState {
    pub const FLOATS_PER_VERTEX: usize = 4;

    /// Create a new EffectsState with the given RNG seed.
    pub fn new(seed: u64) -> Self {
        Self::with_capacity(seed, 4096)
    }

    /// Create a new EffectsState with a pre-allocated buffer capacity.
    pub fn with_capacity(seed: u64, max_vertices: usize) -> Self {
        EffectsState {
            systems: Vec::new(),
            milestones: Vec::new(),
            effects_buffer: Vec::with_capacity(max_vertices * Self::FLOATS_PER_VERTEX),
            rng: Rng::new(seed.wrapping_add(7919)),
            next_id: 1,
        }
    }

    /// Start a particle system.
    pub fn spawn(&mut self, params: ParticleParams) -> EffectId {
        let id = EffectId(self.next_id);
        self.next_id += 1;
        let system = ParticleSystem::new(params, &mut self.rng);
        log::debug!("effects: spawned {:?} with {} particles", id, system.particles.len());
        self.systems.push((id, system));
        id
    }

    /// Advance every system; finished systems are removed.
    pub fn tick(&mut self, dt: f32) {
        let mut scratch = Vec::new();
        let milestones = &mut self.milestones;
        self.systems.retain_mut(|(id, system)| {
            system.step(dt, &mut scratch);
            milestones.extend(scratch.drain(..).map(|m| (*id, m)));
            !system.is_done()
        });
    }

    /// Take milestones reported since the last drain, in order.
    pub fn drain_milestones(&mut self) -> Vec<(EffectId, Milestone)> {
        std::mem::take(&mut self.milestones)
    }

    /// Tear a system down immediately. No `Finished` milestone is reported.
    pub fn remove(&mut self, id: EffectId) -> bool {
        let before = self.systems.len();
        self.systems.retain(|(sid, _)| *sid != id);
        before != self.systems.len()
    }

    pub fn get(&self, id: EffectId) -> Option<&ParticleSystem> {
        self.systems.iter().find(|(sid, _)| *sid == id).map(|(_, s)| s)
    }

    pub fn is_active(&self, id: EffectId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Rebuild the effects vertex buffer.
    pub fn rebuild_effects_buffer(&mut self) {
        self.effects_buffer.clear();
        for (_, system) in &self.systems {
            for p in &system.particles {
                self.effects_buffer
                    .extend_from_slice(&[p.position.x, p.position.y, p.position.z, system.opacity]);
            }
        }
    }

    /// Clear all effects and pending milestones.
    pub fn clear(&mut self) {
        self.systems.clear();
        self.milestones.clear();
        self.effects_buffer.clear();
    }

    pub fn effects_vertex_count(&self) -> usize {
        self.effects_buffer.len() / Self::FLOATS_PER_VERTEX
    }

    pub fn effects_buffer_ptr(&self) -> *const f32 {
        self.effects_buffer.as_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn spawn_and_rebuild_buffer() {
        let mut effects = EffectsState::new(42);
        effects.spawn(ParticleParams::burst(vec![Vec3::ZERO], 10, 1.0));
        effects.tick(0.016);
        effects.rebuild_effects_buffer();
        assert_eq!(effects.effects_vertex_count(), 10);
        assert_eq!(effects.effects_buffer.len(), 40);
    }

    #[test]
    fn finished_systems_are_removed_with_milestone() {
        let mut effects = EffectsState::new(1);
        let id = effects.spawn(ParticleParams::burst(vec![Vec3::ZERO], 3, 0.2));
        for _ in 0..10 {
            effects.tick(0.05);
        }
        assert!(!effects.is_active(id));
        assert_eq!(effects.drain_milestones(), vec![(id, Milestone::Finished)]);
        assert!(effects.drain_milestones().is_empty());
    }

    #[test]
    fn removed_system_reports_nothing() {
        let mut effects = EffectsState::new(1);
        let id = effects.spawn(ParticleParams::burst(vec![Vec3::ZERO], 3, 0.2));
        assert!(effects.remove(id));
        for _ in 0..10 {
            effects.tick(0.05);
        }
        assert!(effects.drain_milestones().is_empty());
        assert!(effects.is_empty());
    }

    #[test]
    fn with_capacity_preallocates() {
        let effects = EffectsState::with_capacity(42, 1000);
        assert!(effects.effects_buffer.capacity() >= 4000);
    }

    #[test]
    fn clear_drops_everything() {
        let mut effects = EffectsState::new(42);
        effects.spawn(ParticleParams::burst(vec![Vec3::ZERO], 5, 1.0));
        effects.spawn(ParticleParams::gather(vec![Vec3::ZERO], Vec3::ZERO, 5));
        assert_eq!(effects.len(), 2);
        effects.clear();
        assert!(effects.is_empty());
    }
}
