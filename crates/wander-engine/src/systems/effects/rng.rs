//! Seedable pseudo-random number generator (xorshift64).
//! Deterministic and fast, so every choreography replays identically for a seed.

use glam::Vec3;
use std::f32::consts::TAU;

/// Seedable pseudo-random number generator (xorshift64).
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a random number in [0, upper_bound). Returns 0 for a zero bound.
    pub fn next_int(&mut self, upper_bound: u32) -> u32 {
        if upper_bound == 0 {
            return 0;
        }
        (self.next_u64() % upper_bound as u64) as u32
    }

    /// Uniform float in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // 24 high bits fit an f32 mantissa exactly.
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform float in [min, max).
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// Uniform float in [-half, half).
    pub fn spread(&mut self, half: f32) -> f32 {
        self.range(-half, half)
    }

    /// Direction sampled uniformly on the unit sphere
    /// (theta uniform in [0, 2π), phi = acos(U(-1, 1))).
    pub fn unit_direction(&mut self) -> Vec3 {
        let theta = self.next_f32() * TAU;
        let phi = self.range(-1.0, 1.0).clamp(-1.0, 1.0).acos();
        Vec3::new(
            phi.sin() * theta.cos(),
            phi.sin() * theta.sin(),
            phi.cos(),
        )
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_int(i as u32 + 1) as usize;
            items.swap(i, j);
        }
    }

    /// Pick a random element.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.next_int(items.len() as u32) as usize)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_deterministic() {
        let mut rng1 = Rng::new(42);
        let mut rng2 = Rng::new(42);
        for _ in 0..10 {
            assert_eq!(rng1.next_int(1000), rng2.next_int(1000));
        }
    }

    #[test]
    fn rng_zero_seed_handled() {
        let mut rng = Rng::new(0);
        let _ = rng.next_int(100);
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn floats_stay_in_range() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f), "next_f32 out of range: {}", f);
            let r = rng.range(2.0, 6.0);
            assert!((2.0..6.0).contains(&r), "range out of bounds: {}", r);
        }
    }

    #[test]
    fn directions_are_unit_length() {
        let mut rng = Rng::new(99);
        for _ in 0..200 {
            let d = rng.unit_direction();
            assert!((d.length() - 1.0).abs() < 1e-4, "length {}", d.length());
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Rng::new(3);
        let mut items: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn choose_handles_empty() {
        let mut rng = Rng::new(5);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        assert!(rng.choose(&[1, 2, 3]).is_some());
    }
}
