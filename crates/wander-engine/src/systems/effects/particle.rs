//! Particle choreography: one simulation stepper driven by a phase table.
//!
//! Every effect starts as an outward explosion (uniform sphere directions,
//! time-normalized drag). What happens next is decided by the phase table:
//! converge onto glyph targets, drift, or gather toward a point. Opacity is
//! controlled by an independent fade window; the system is done once it has
//! faded out.

use glam::{Vec2, Vec3};
use super::rng::Rng;
use crate::extensions::easing::approach_factor;

/// Opacity at or below which a faded system is torn down.
pub const TEARDOWN_OPACITY: f32 = 0.02;

/// Motion phase of a particle system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Outward flight with drag.
    Explode,
    /// Exponential approach toward per-particle glyph targets.
    Converge,
    /// Fixed random drift ("settled" period).
    Drift,
    /// Staggered approach toward a single point.
    Gather,
    /// Opacity ramp-down; motion continues as in the previous phase.
    Fade,
    /// Torn down.
    Done,
}

/// Phase changes reported to the owner after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Entered(Phase),
    Finished,
}

/// A point the converge phase can be assigned to: the glyph's centre in
/// world space plus its world-space rect size (used to bound jitter).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphTarget {
    pub position: Vec3,
    pub size: Vec2,
}

/// Opacity envelope: linear from 1 to 0 over `[start, start + duration]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeWindow {
    pub start: f32,
    pub duration: f32,
}

impl FadeWindow {
    pub fn lifespan(seconds: f32) -> Self {
        Self { start: 0.0, duration: seconds }
    }

    pub fn opacity(&self, age: f32) -> f32 {
        if age <= self.start {
            return 1.0;
        }
        if self.duration <= 0.0 {
            return 0.0;
        }
        1.0 - ((age - self.start) / self.duration).min(1.0)
    }
}

/// What follows the explosion.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Pure outward drift with drag for the whole life.
    Burst,
    /// Explode until `converge_at`, converge until `drift_at`, then drift.
    ConvergeToText {
        targets: Vec<GlyphTarget>,
        converge_at: f32,
        drift_at: f32,
        /// Exponential approach rate `k` in `1 - e^(-k·dt)`.
        rate: f32,
        /// Half-range of the per-axis drift velocity.
        drift_speed: f32,
        /// Multiplier on drift velocity.
        scatter: f32,
    },
    /// Explode until `start`, then each particle begins approaching `point`
    /// at its own time drawn from `[start, start + window)`.
    Gather {
        point: Vec3,
        start: f32,
        window: f32,
        rate: f32,
        /// Velocity multiplier while a particle is still waiting to gather.
        drift_scale: f32,
    },
}

/// Full parameter set of one effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleParams {
    pub count: usize,
    /// Spawn points; particle `i` uses `origins[i % len]`.
    pub origins: Vec<Vec3>,
    /// Full width of the uniform spawn jitter box per axis.
    pub origin_jitter: Vec3,
    pub speed_min: f32,
    pub speed_max: f32,
    /// Drag base: `velocity *= drag^dt`.
    pub drag: f32,
    /// After `.0` seconds the drag base is multiplied by `.1`.
    pub slowdown: Option<(f32, f32)>,
    /// Velocity multiplier during the explosion.
    pub speed_scale: f32,
    pub behavior: Behavior,
    pub fade: FadeWindow,
    /// Largest simulated step.
    pub max_step: f32,
}

impl ParticleParams {
    /// A simple burst from `origins` that fades over `lifespan`.
    pub fn burst(origins: Vec<Vec3>, count: usize, lifespan: f32) -> Self {
        Self {
            count,
            origins,
            origin_jitter: Vec3::splat(0.4),
            speed_min: 2.0,
            speed_max: 6.0,
            drag: 0.3,
            slowdown: None,
            speed_scale: 1.0,
            behavior: Behavior::Burst,
            fade: FadeWindow::lifespan(lifespan),
            max_step: 0.05,
        }
    }

    /// Explosion from `centre` that converges onto `targets` and later fades.
    pub fn converge_to_text(centre: Vec3, targets: Vec<GlyphTarget>, count: usize) -> Self {
        Self {
            count,
            origins: vec![centre],
            origin_jitter: Vec3::ONE,
            speed_min: 5.0,
            speed_max: 10.0,
            drag: 0.15,
            slowdown: None,
            speed_scale: 7.4,
            behavior: Behavior::ConvergeToText {
                targets,
                converge_at: 1.5,
                drift_at: 4.0,
                rate: 6.0,
                drift_speed: 0.6,
                scatter: 1.7,
            },
            fade: FadeWindow { start: 10.5, duration: 4.0 },
            max_step: 0.05,
        }
    }

    /// Burst from `origins` that later collapses into `point`.
    pub fn gather(origins: Vec<Vec3>, point: Vec3, count: usize) -> Self {
        Self {
            count,
            origins,
            origin_jitter: Vec3::splat(0.4),
            speed_min: 6.0,
            speed_max: 16.0,
            drag: 0.92,
            slowdown: None,
            speed_scale: 6.5,
            behavior: Behavior::Gather {
                point,
                start: 1.0,
                window: 5.0,
                rate: 2.0,
                drift_scale: 3.2,
            },
            fade: FadeWindow { start: 1.0, duration: 5.0 },
            max_step: 0.05,
        }
    }

    // -- Builder methods --

    pub fn with_speed(mut self, min: f32, max: f32) -> Self {
        self.speed_min = min;
        self.speed_max = max;
        self
    }

    pub fn with_drag(mut self, drag: f32) -> Self {
        self.drag = drag;
        self
    }

    pub fn with_slowdown(mut self, after: f32, factor: f32) -> Self {
        self.slowdown = Some((after, factor));
        self
    }

    pub fn with_speed_scale(mut self, scale: f32) -> Self {
        self.speed_scale = scale;
        self
    }

    pub fn with_fade(mut self, fade: FadeWindow) -> Self {
        self.fade = fade;
        self
    }

    pub fn with_jitter(mut self, jitter: Vec3) -> Self {
        self.origin_jitter = jitter;
        self
    }

    /// Phase table: start time of each phase in order.
    fn phase_table(&self) -> Vec<(f32, Phase)> {
        let mut table = vec![(0.0, Phase::Explode)];
        match &self.behavior {
            Behavior::Burst => {}
            Behavior::ConvergeToText { converge_at, drift_at, .. } => {
                table.push((*converge_at, Phase::Converge));
                table.push((*drift_at, Phase::Drift));
            }
            Behavior::Gather { start, .. } => table.push((*start, Phase::Gather)),
        }
        // A fade that starts with or before the last motion phase is an envelope, not a phase.
        let last_motion = table.iter().map(|(start, _)| *start).fold(0.0, f32::max);
        if self.fade.start > last_motion {
            table.push((self.fade.start, Phase::Fade));
        }
        table.sort_by(|a, b| a.0.total_cmp(&b.0));
        table
    }
}

/// Per-particle simulation state.
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Index into the glyph target list.
    pub target: Option<usize>,
    /// Static jitter factors in [-0.5, 0.5) scaled by the target rect.
    pub jitter: Vec2,
    pub drift: Vec3,
    /// Time at which this particle starts gathering.
    pub gather_at: f32,
}

/// One running effect.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub params: ParticleParams,
    pub particles: Vec<Particle>,
    pub age: f32,
    pub opacity: f32,
    phase: Phase,
    table: Vec<(f32, Phase)>,
}

impl ParticleSystem {
    /// Spawn all particles. Deterministic for a given RNG state.
    pub fn new(params: ParticleParams, rng: &mut Rng) -> Self {
        let target_order = match &params.behavior {
            Behavior::ConvergeToText { targets, .. } if !targets.is_empty() => {
                Some(shuffled_blocks(targets.len(), params.count, rng))
            }
            _ => None,
        };
        let (gather_start, gather_window) = match params.behavior {
            Behavior::Gather { start, window, .. } => (start, window),
            _ => (0.0, 0.0),
        };
        let drift_speed = match params.behavior {
            Behavior::ConvergeToText { drift_speed, .. } => drift_speed,
            _ => 0.0,
        };

        let mut particles = Vec::with_capacity(params.count);
        for i in 0..params.count {
            let origin = if params.origins.is_empty() {
                Vec3::ZERO
            } else {
                params.origins[i % params.origins.len()]
            };
            let j = params.origin_jitter;
            let position = origin + Vec3::new(rng.spread(j.x / 2.0), rng.spread(j.y / 2.0), rng.spread(j.z / 2.0));
            let speed = rng.range(params.speed_min, params.speed_max);
            let velocity = rng.unit_direction() * speed;
            particles.push(Particle {
                position,
                velocity,
                target: target_order.as_ref().map(|order| order[i]),
                jitter: Vec2::new(rng.spread(0.5), rng.spread(0.5)),
                drift: Vec3::new(rng.spread(drift_speed), rng.spread(drift_speed), rng.spread(drift_speed)),
                gather_at: gather_start + rng.next_f32() * gather_window,
            });
        }

        let table = params.phase_table();
        Self {
            params,
            particles,
            age: 0.0,
            opacity: 1.0,
            phase: Phase::Explode,
            table,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Phase for an age, from the table.
    fn phase_at(&self, age: f32) -> Phase {
        self.table
            .iter()
            .take_while(|(start, _)| age >= *start)
            .last()
            .map(|(_, p)| *p)
            .unwrap_or(Phase::Explode)
    }

    /// Motion phase at an age (the fade phase moves like its predecessor).
    fn motion_at(&self, age: f32) -> Phase {
        self.table
            .iter()
            .take_while(|(start, _)| age >= *start)
            .filter(|(_, p)| *p != Phase::Fade)
            .last()
            .map(|(_, p)| *p)
            .unwrap_or(Phase::Explode)
    }

    fn drag_factor(&self, dt: f32) -> f32 {
        let base = match self.params.slowdown {
            Some((after, factor)) if self.age > after => self.params.drag * factor,
            _ => self.params.drag,
        };
        base.powf(dt)
    }

    /// Advance one step. Appends milestones in the order they happened.
    pub fn step(&mut self, dt: f32, milestones: &mut Vec<Milestone>) {
        if self.is_done() {
            return;
        }
        let dt = dt.clamp(0.0, self.params.max_step);
        self.age += dt;
        let age = self.age;
        let drag = self.drag_factor(dt);
        let motion = self.motion_at(age);

        match (&self.params.behavior, motion) {
            (Behavior::ConvergeToText { targets, rate, .. }, Phase::Converge) => {
                let k = approach_factor(*rate, dt);
                for p in &mut self.particles {
                    let Some(target) = p.target.and_then(|t| targets.get(t)) else { continue };
                    let goal = target.position
                        + Vec3::new(p.jitter.x * target.size.x, p.jitter.y * target.size.y, 0.0);
                    p.position += (goal - p.position) * k;
                }
            }
            (Behavior::ConvergeToText { scatter, .. }, Phase::Drift) => {
                for p in &mut self.particles {
                    p.position += p.drift * dt * *scatter;
                }
            }
            (Behavior::Gather { point, rate, drift_scale, .. }, Phase::Gather) => {
                let k = approach_factor(*rate, dt);
                for p in &mut self.particles {
                    if age >= p.gather_at {
                        p.position += (*point - p.position) * k;
                    } else {
                        p.velocity *= drag;
                        p.position += p.velocity * dt * *drift_scale;
                    }
                }
            }
            _ => {
                let scale = self.params.speed_scale;
                for p in &mut self.particles {
                    p.velocity *= drag;
                    p.position += p.velocity * dt * scale;
                }
            }
        }

        self.opacity = self.params.fade.opacity(age);

        let next = if self.opacity <= TEARDOWN_OPACITY { Phase::Done } else { self.phase_at(age) };
        if next != self.phase {
            self.phase = next;
            if next == Phase::Done {
                milestones.push(Milestone::Finished);
            } else {
                milestones.push(Milestone::Entered(next));
            }
        }
    }
}

/// Assign targets in shuffled blocks so every glyph receives a near-equal share.
fn shuffled_blocks(targets: usize, count: usize, rng: &mut Rng) -> Vec<usize> {
    let mut order = Vec::with_capacity(count + targets);
    while order.len() < count {
        let mut block: Vec<usize> = (0..targets).collect();
        rng.shuffle(&mut block);
        order.extend(block);
    }
    order.truncate(count);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(system: &mut ParticleSystem, seconds: f32, dt: f32) -> Vec<Milestone> {
        let mut out = Vec::new();
        let steps = (seconds / dt).round() as usize;
        for _ in 0..steps {
            system.step(dt, &mut out);
        }
        out
    }

    #[test]
    fn burst_fades_and_finishes() {
        let mut rng = Rng::new(1);
        let mut sys = ParticleSystem::new(ParticleParams::burst(vec![Vec3::ZERO], 50, 1.0), &mut rng);
        assert_eq!(sys.particles.len(), 50);
        let milestones = run(&mut sys, 1.2, 0.02);
        assert!(sys.is_done());
        assert_eq!(milestones, vec![Milestone::Finished]);
    }

    #[test]
    fn burst_moves_outward_and_slows() {
        let mut rng = Rng::new(2);
        let mut sys = ParticleSystem::new(
            ParticleParams::burst(vec![Vec3::ZERO], 20, 5.0).with_jitter(Vec3::ZERO),
            &mut rng,
        );
        let speed0: f32 = sys.particles.iter().map(|p| p.velocity.length()).sum();
        run(&mut sys, 0.5, 0.05);
        let speed1: f32 = sys.particles.iter().map(|p| p.velocity.length()).sum();
        assert!(speed1 < speed0);
        assert!(sys.particles.iter().all(|p| p.position.length() > 0.0));
    }

    #[test]
    fn drag_is_time_normalized() {
        let params = ParticleParams::burst(vec![Vec3::ZERO], 1, 10.0).with_jitter(Vec3::ZERO);
        let mut a = ParticleSystem::new(params.clone(), &mut Rng::new(9));
        let mut b = ParticleSystem::new(params, &mut Rng::new(9));
        let mut sink = Vec::new();
        a.step(0.04, &mut sink);
        b.step(0.02, &mut sink);
        b.step(0.02, &mut sink);
        let va = a.particles[0].velocity.length();
        let vb = b.particles[0].velocity.length();
        assert!((va - vb).abs() < 1e-4, "{} vs {}", va, vb);
    }

    #[test]
    fn step_is_clamped() {
        let mut sys = ParticleSystem::new(ParticleParams::burst(vec![Vec3::ZERO], 1, 10.0), &mut Rng::new(4));
        let mut sink = Vec::new();
        sys.step(1.0, &mut sink);
        assert!((sys.age - 0.05).abs() < 1e-6);
    }

    #[test]
    fn converge_reaches_targets_then_drifts_then_fades() {
        let targets = vec![
            GlyphTarget { position: Vec3::new(-1.0, 0.0, -5.0), size: Vec2::new(0.2, 0.3) },
            GlyphTarget { position: Vec3::new(1.0, 0.0, -5.0), size: Vec2::new(0.2, 0.3) },
        ];
        let mut sys = ParticleSystem::new(
            ParticleParams::converge_to_text(Vec3::new(0.0, 0.0, -5.0), targets.clone(), 40),
            &mut Rng::new(11),
        );
        let milestones = run(&mut sys, 4.1, 0.02);
        assert_eq!(
            milestones,
            vec![Milestone::Entered(Phase::Converge), Milestone::Entered(Phase::Drift)]
        );
        for p in &sys.particles {
            let t = targets[p.target.unwrap()];
            assert!((p.position - t.position).length() < 0.6, "particle far from glyph");
        }

        let rest = run(&mut sys, 11.0, 0.05);
        assert_eq!(rest, vec![Milestone::Entered(Phase::Fade), Milestone::Finished]);
    }

    #[test]
    fn targets_are_evenly_assigned() {
        let order = shuffled_blocks(4, 10, &mut Rng::new(8));
        assert_eq!(order.len(), 10);
        for t in 0..4 {
            let n = order.iter().filter(|&&o| o == t).count();
            assert!(n == 2 || n == 3, "target {} got {}", t, n);
        }
    }

    #[test]
    fn gather_collapses_toward_point() {
        let point = Vec3::new(0.0, 0.0, -2.0);
        let mut sys = ParticleSystem::new(ParticleParams::gather(vec![Vec3::ZERO], point, 60), &mut Rng::new(5));
        let milestones = run(&mut sys, 1.5, 0.05);
        assert_eq!(milestones, vec![Milestone::Entered(Phase::Gather)]);
        run(&mut sys, 4.0, 0.05);
        let early_starters: Vec<&Particle> = sys.particles.iter().filter(|p| p.gather_at < 2.0).collect();
        assert!(!early_starters.is_empty());
        for p in early_starters {
            assert!((p.position - point).length() < 1.0, "early gatherer still far away");
        }
        let tail = run(&mut sys, 1.0, 0.05);
        assert_eq!(tail, vec![Milestone::Finished]);
    }

    #[test]
    fn slowdown_raises_drag() {
        let params = ParticleParams::burst(vec![Vec3::ZERO], 1, 10.0)
            .with_drag(0.4)
            .with_slowdown(0.6, 0.05);
        let mut sys = ParticleSystem::new(params, &mut Rng::new(3));
        run(&mut sys, 0.6, 0.05);
        let before = sys.particles[0].velocity.length();
        run(&mut sys, 0.1, 0.05);
        let after = sys.particles[0].velocity.length();
        // Two steps at drag 0.02 lose far more than at 0.4.
        assert!(after < before * 0.75);
    }

    #[test]
    fn fade_window_is_linear() {
        let f = FadeWindow { start: 2.0, duration: 4.0 };
        assert_eq!(f.opacity(1.0), 1.0);
        assert!((f.opacity(4.0) - 0.5).abs() < 1e-6);
        assert_eq!(f.opacity(10.0), 0.0);
    }
}
