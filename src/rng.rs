// Provides random number generation.

use super::types::*;
use rand::distributions::Uniform;
pub use rand::Rng;
pub use rand::SeedableRng;

/// The [xoshiro](http://xoshiro.di.unimi.it/) generator is particularly well
/// suited for path tracing: it is a best-in-class PRNG (from a statistical and
/// performance POV) and it supports an efficient jump-ahead operation which is
/// essential to prevent threads from having similar patterns. The 256 bit
/// variant is used because every draw feeds an f64.
pub type RtRng = rand_xoshiro::Xoshiro256PlusPlus;

/// Returns true with probability `p`.
#[inline]
pub fn probability(rng: &mut RtRng, p: f64) -> bool {
  rng.gen::<f64>() < p
}

// ultraviolet::DVec3 traits

pub trait RngVector {
  /// Generates a random vector inside the unit sphere from a uniform
  /// distribution.
  fn gen_uniform_random_in_unit_sphere(rng: &mut RtRng) -> Self;

  /// Generates a random unit vector from a uniform distribution.
  fn gen_uniform_random_unit(rng: &mut RtRng) -> Self;

  /// Generates a random unit vector in the hemisphere around `normal` from a
  /// uniform distribution.
  fn gen_uniform_random_hemisphere(rng: &mut RtRng, normal: Self) -> Self;

  /// Generates a random unit vector in the hemisphere around `normal` with a
  /// density proportional to the cosine of the angle to `normal`.
  fn gen_cosine_random_hemisphere(rng: &mut RtRng, normal: Self) -> Self;
}

impl RngVector for Vec3d {
  fn gen_uniform_random_in_unit_sphere(rng: &mut RtRng) -> Vec3d {
    let d = Uniform::new_inclusive(-1., 1.);
    loop {
      let v = Vec3d::new(rng.sample(d), rng.sample(d), rng.sample(d));
      if v.dot(v) < 1. {
        return v;
      }
    }
  }

  fn gen_uniform_random_unit(rng: &mut RtRng) -> Vec3d {
    loop {
      let v = Vec3d::gen_uniform_random_in_unit_sphere(rng);
      let m = v.mag();
      if m > 1e-8 {
        return v / m;
      }
    }
  }

  fn gen_uniform_random_hemisphere(rng: &mut RtRng, normal: Vec3d) -> Vec3d {
    let v = Vec3d::gen_uniform_random_unit(rng);
    if v.dot(normal) < 0. {
      -v
    } else {
      v
    }
  }

  fn gen_cosine_random_hemisphere(rng: &mut RtRng, normal: Vec3d) -> Vec3d {
    // Lambert's construction: a unit sphere tangent to the surface.
    let v = normal + Vec3d::gen_uniform_random_unit(rng);
    let m = v.mag();
    if m < 1e-8 {
      normal
    } else {
      v / m
    }
  }
}
