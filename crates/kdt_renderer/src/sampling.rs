//! Random sampling helpers.
//!
//! Every function takes the caller's generator; render tasks each own one, so
//! nothing here is shared between threads.

use kdt_math::Vec3;
use rand::{Rng, RngCore};

/// Uniform sample in [0, 1).
#[inline]
pub fn gen_f64(rng: &mut dyn RngCore) -> f64 {
    rng.gen::<f64>()
}

/// Uniform point inside the unit sphere (rejection sampling).
pub fn random_in_unit_sphere(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f64(rng) * 2.0 - 1.0,
            gen_f64(rng) * 2.0 - 1.0,
            gen_f64(rng) * 2.0 - 1.0,
        );
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Point inside the unit sphere restricted to octant `stratum % 8`.
///
/// Eight consecutive strata cover the whole sphere once, which keeps a small
/// fixed sample budget from clumping on one side of a light.
pub fn stratified_in_unit_sphere(rng: &mut dyn RngCore, stratum: u32) -> Vec3 {
    let p = random_in_unit_sphere(rng).abs();
    let octant = stratum % 8;
    let sign = |bit: u32| if octant & bit == 0 { 1.0 } else { -1.0 };
    Vec3::new(p.x * sign(1), p.y * sign(2), p.z * sign(4))
}
