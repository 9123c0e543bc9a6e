use std::collections::HashSet;

use glam::Vec3;
use wander_engine::{Camera3D, Key};

use crate::config::NavigationConfig;

/// Inertial fly-through camera controls.
#[derive(Debug, Default)]
pub struct Navigator {
    held: HashSet<Key>,
    /// Local-z speed; negative flies forward.
    pub velocity: f32,
    pub yaw_velocity: f32,
    pub pitch_velocity: f32,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Forget held keys and momentum.
    pub fn stop(&mut self) {
        self.held.clear();
        self.velocity = 0.0;
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
    }

    /// Integrate one tick and move the camera.
    pub fn step(&mut self, dt: f32, camera: &mut Camera3D, cfg: &NavigationConfig) {
        let frame_scale = dt * 60.0;
        let thrust = cfg.thrust * frame_scale;
        let yaw = cfg.yaw * frame_scale;
        let pitch = cfg.pitch * frame_scale;
        let friction = cfg.friction.powf(frame_scale);

        if self.is_held(Key::Forward) {
            self.velocity -= thrust;
        }
        if self.is_held(Key::Back) {
            self.velocity += thrust;
        }
        if self.is_held(Key::YawLeft) {
            self.yaw_velocity += yaw;
        }
        if self.is_held(Key::YawRight) {
            self.yaw_velocity -= yaw;
        }
        if self.is_held(Key::PitchUp) {
            self.pitch_velocity -= pitch;
        }
        if self.is_held(Key::PitchDown) {
            self.pitch_velocity += pitch;
        }

        self.velocity *= friction;
        self.yaw_velocity *= friction;
        self.pitch_velocity *= friction;

        if self.velocity.abs() < cfg.min_drift {
            self.velocity = -cfg.min_drift;
        }

        camera.translate_local(Vec3::new(0.0, 0.0, self.velocity));
        camera.yaw(self.yaw_velocity);
        camera.pitch(self.pitch_velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_camera_drifts_forward() {
        let mut nav = Navigator::new();
        let mut camera = Camera3D::default();
        let cfg = NavigationConfig::default();
        for _ in 0..10 {
            nav.step(1.0 / 60.0, &mut camera, &cfg);
        }
        assert!((nav.velocity + cfg.min_drift).abs() < 1e-6);
        assert!(camera.position.z < 5.0);
    }

    #[test]
    fn thrust_accelerates_then_friction_decays() {
        let mut nav = Navigator::new();
        let mut camera = Camera3D::default();
        let cfg = NavigationConfig::default();
        nav.press(Key::Forward);
        for _ in 0..30 {
            nav.step(1.0 / 60.0, &mut camera, &cfg);
        }
        let fast = nav.velocity;
        assert!(fast < -0.05);

        nav.release(Key::Forward);
        for _ in 0..30 {
            nav.step(1.0 / 60.0, &mut camera, &cfg);
        }
        assert!(nav.velocity > fast);
        assert!(nav.velocity < 0.0);
    }

    #[test]
    fn yaw_turns_the_camera() {
        let mut nav = Navigator::new();
        let mut camera = Camera3D::default();
        let cfg = NavigationConfig::default();
        nav.press(Key::YawLeft);
        for _ in 0..60 {
            nav.step(1.0 / 60.0, &mut camera, &cfg);
        }
        assert!(camera.forward().dot(Vec3::NEG_Z) < 0.999);
        nav.stop();
        assert!(!nav.is_held(Key::YawLeft));
        assert_eq!(nav.yaw_velocity, 0.0);
    }
}
