//! Deterministic noise helpers
//!
//! Pure functions of their inputs: the same lattice point, time and seed
//! always give the same value, which keeps turbulence replayable.

use glam::Vec2;

/// Integer avalanche hash
#[inline]
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Hash of a lattice point, in [0, 1)
#[inline]
pub fn lattice(ix: i32, iy: i32, seed: u32) -> f32 {
    let h = hash_u32((ix as u32).wrapping_mul(0x27d4_eb2d) ^ hash_u32((iy as u32) ^ seed));
    (h >> 8) as f32 / (1u32 << 24) as f32
}

/// Smooth 2D value noise in [-1, 1], drifting with `t`
pub fn value_noise(p: Vec2, t: f32, seed: u32) -> f32 {
    let q = Vec2::new(p.x + t * 0.37, p.y - t * 0.23);
    if !q.is_finite() {
        return 0.0;
    }
    let base = q.floor();
    let f = q - base;
    let (ix, iy) = (base.x as i32, base.y as i32);
    let s = f * f * (Vec2::splat(3.0) - 2.0 * f);

    let a = lattice(ix, iy, seed);
    let b = lattice(ix + 1, iy, seed);
    let c = lattice(ix, iy + 1, seed);
    let d = lattice(ix + 1, iy + 1, seed);

    let top = a + (b - a) * s.x;
    let bottom = c + (d - c) * s.x;
    (top + (bottom - top) * s.y) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_bounded_and_repeatable() {
        for i in 0..200 {
            let p = Vec2::new(i as f32 * 0.731, i as f32 * -1.37);
            let n = value_noise(p, i as f32, 7);
            assert!((-1.0..=1.0).contains(&n));
            assert_eq!(n, value_noise(p, i as f32, 7));
        }
    }

    #[test]
    fn non_finite_input_gives_zero() {
        assert_eq!(value_noise(Vec2::new(f32::NAN, 0.0), 0.0, 1), 0.0);
    }
}
