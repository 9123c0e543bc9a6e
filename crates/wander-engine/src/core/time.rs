/// Frame clock: exactly one logical tick per rendered frame.
/// Clamps each frame delta so a stalled tab does not teleport simulations.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Largest delta handed to a tick.
    max_dt: f32,
    /// Seconds since the clock started (sum of clamped deltas).
    elapsed: f32,
    /// Delta of the most recent tick.
    dt: f32,
    frames: u64,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            max_dt,
            elapsed: 0.0,
            dt: 0.0,
            frames: 0,
        }
    }

    /// Register a rendered frame. Returns the clamped delta for this tick.
    pub fn advance(&mut self, frame_dt: f32) -> f32 {
        let dt = if frame_dt.is_finite() { frame_dt.clamp(0.0, self.max_dt) } else { 0.0 };
        self.dt = dt;
        self.elapsed += dt;
        self.frames += 1;
        dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tick_per_frame() {
        let mut clock = FrameClock::new(0.1);
        assert_eq!(clock.advance(1.0 / 60.0), 1.0 / 60.0);
        assert_eq!(clock.frames(), 1);
    }

    #[test]
    fn clamps_long_frames() {
        let mut clock = FrameClock::new(0.1);
        assert_eq!(clock.advance(2.5), 0.1);
        assert!((clock.elapsed() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn rejects_negative_and_nan() {
        let mut clock = FrameClock::new(0.1);
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.advance(f32::NAN), 0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }
}
