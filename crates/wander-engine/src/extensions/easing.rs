// extensions/easing.rs
//
// Pure easing curves for tween interpolation.
// No dependencies on the scheduler or the scene, just math.
//
// Curves are defined once as their "in" form; "out" and "in-out" are derived
// by reflection, so every family supports all three directions.

use std::f32::consts::PI;
use glam::Vec3;

/// Curve family. Power curves follow the usual naming:
/// Quad = power1, Cubic = power2, Quart = power3, Quint = power4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Quad,
    Cubic,
    Quart,
    Quint,
    Sine,
    Expo,
    /// Overshoot then settle.
    Back,
}

impl Curve {
    /// The "in" form of the curve for `t` in [0, 1].
    #[inline]
    fn ease_in(self, t: f32) -> f32 {
        match self {
            Curve::Quad => t * t,
            Curve::Cubic => t * t * t,
            Curve::Quart => t.powi(4),
            Curve::Quint => t.powi(5),
            Curve::Sine => 1.0 - (t * PI / 2.0).cos(),
            Curve::Expo => {
                if t <= 0.0 { 0.0 } else { 2.0_f32.powf(10.0 * t - 10.0) }
            }
            Curve::Back => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                C3 * t * t * t - C1 * t * t
            }
        }
    }
}

/// Easing direction applied to a curve family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    /// Constant velocity.
    #[default]
    Linear,
    /// Slow start.
    In(Curve),
    /// Slow end.
    Out(Curve),
    /// Slow start and end.
    InOut(Curve),
}

impl Easing {
    pub const QUAD_IN: Easing = Easing::In(Curve::Quad);
    pub const QUAD_OUT: Easing = Easing::Out(Curve::Quad);
    pub const CUBIC_IN: Easing = Easing::In(Curve::Cubic);
    pub const CUBIC_OUT: Easing = Easing::Out(Curve::Cubic);
    pub const CUBIC_IN_OUT: Easing = Easing::InOut(Curve::Cubic);
    pub const QUART_IN: Easing = Easing::In(Curve::Quart);
    pub const QUART_OUT: Easing = Easing::Out(Curve::Quart);
    pub const QUART_IN_OUT: Easing = Easing::InOut(Curve::Quart);
    pub const QUINT_IN_OUT: Easing = Easing::InOut(Curve::Quint);
    pub const EXPO_OUT: Easing = Easing::Out(Curve::Expo);
    pub const BACK_OUT: Easing = Easing::Out(Curve::Back);

    /// Apply the easing to a normalized time value `t` (clamped to [0, 1]).
    /// The result is typically in [0, 1] but Back curves overshoot.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::In(curve) => curve.ease_in(t),
            Easing::Out(curve) => 1.0 - curve.ease_in(1.0 - t),
            Easing::InOut(curve) => {
                if t < 0.5 {
                    curve.ease_in(2.0 * t) / 2.0
                } else {
                    1.0 - curve.ease_in(2.0 - 2.0 * t) / 2.0
                }
            }
        }
    }
}

// ── Interpolation helpers ────────────────────────────────────────────────

/// Linearly interpolate between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate with easing.
#[inline]
pub fn ease(a: f32, b: f32, t: f32, easing: Easing) -> f32 {
    lerp(a, b, easing.apply(t))
}

/// Interpolate Vec3 with easing.
#[inline]
pub fn ease_vec3(a: Vec3, b: Vec3, t: f32, easing: Easing) -> Vec3 {
    a.lerp(b, easing.apply(t))
}

/// Frame-rate independent approach factor: `1 - e^(-rate·dt)`.
/// Multiplying a remaining distance by this each step is an exponential decay.
#[inline]
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Curve; 7] = [
        Curve::Quad, Curve::Cubic, Curve::Quart, Curve::Quint,
        Curve::Sine, Curve::Expo, Curve::Back,
    ];

    #[test]
    fn linear_endpoints() {
        assert_eq!(Easing::Linear.apply(0.0), 0.0);
        assert_eq!(Easing::Linear.apply(1.0), 1.0);
        assert_eq!(Easing::Linear.apply(0.5), 0.5);
    }

    #[test]
    fn every_direction_hits_endpoints() {
        for curve in ALL {
            for easing in [Easing::In(curve), Easing::Out(curve), Easing::InOut(curve)] {
                assert!(easing.apply(0.0).abs() < 1e-3, "{:?} at 0", easing);
                assert!((easing.apply(1.0) - 1.0).abs() < 1e-3, "{:?} at 1", easing);
            }
        }
    }

    #[test]
    fn out_is_faster_at_start() {
        let mid = Easing::QUAD_OUT.apply(0.5);
        assert!(mid > 0.5, "QuadOut at 0.5 should be > 0.5, got {}", mid);
        assert!(Easing::QUAD_IN.apply(0.5) < 0.5);
    }

    #[test]
    fn in_out_is_symmetric() {
        let e = Easing::CUBIC_IN_OUT;
        assert!((e.apply(0.5) - 0.5).abs() < 1e-5);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn back_out_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::BACK_OUT.apply(i as f32 / 100.0))
            .fold(0.0_f32, f32::max);
        assert!(peak > 1.0, "BackOut should overshoot, peak {}", peak);
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::QUART_OUT.apply(2.0), 1.0);
        assert_eq!(Easing::QUART_OUT.apply(-1.0), 0.0);
    }

    #[test]
    fn approach_factor_is_time_normalized() {
        // Two half steps decay the same remaining distance as one full step.
        let full = 1.0 - approach_factor(6.0, 0.1);
        let half = 1.0 - approach_factor(6.0, 0.05);
        assert!((full - half * half).abs() < 1e-6);
    }

    #[test]
    fn ease_vec3_interpolates() {
        let v = ease_vec3(Vec3::ZERO, Vec3::new(10.0, 0.0, -4.0), 0.5, Easing::Linear);
        assert!((v - Vec3::new(5.0, 0.0, -2.0)).length() < 1e-5);
    }
}
