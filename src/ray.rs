//! Spectral rays and the recursive path sampling engine.

use super::error::{Error, Result};
use super::rng::*;
use super::spectrum::Spectrum;
use super::types::*;
use super::world::World;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Configuration shared verbatim by a primary ray and all of its daughters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCreateInfo {
    pub min_wavelength: f64,
    pub max_wavelength: f64,
    pub bins: usize,
    pub max_distance: f64,
    /// Probability of terminating the path at each bounce once `min_depth` is
    /// reached.
    pub extinction_prob: f64,
    pub min_depth: usize,
    pub max_depth: usize,
    /// Hint to materials to bias their sampling towards important paths.
    pub importance_sampling: bool,
    /// Probability with which materials sample important paths when
    /// importance sampling is enabled.
    pub important_path_weight: f64,
}

impl Default for RayCreateInfo {
    fn default() -> RayCreateInfo {
        RayCreateInfo {
            min_wavelength: 375.,
            max_wavelength: 740.,
            bins: 40,
            max_distance: f64::INFINITY,
            extinction_prob: 0.1,
            min_depth: 3,
            max_depth: 100,
            importance_sampling: true,
            important_path_weight: 0.2,
        }
    }
}

impl RayCreateInfo {
    pub fn validate(&self) -> Result<()> {
        if self.bins < 1 {
            return Err(Error::config("number of spectral bins must be at least 1"));
        }
        if !(self.min_wavelength > 0.) || !self.max_wavelength.is_finite() {
            return Err(Error::config(format!(
                "wavelengths must be positive and finite, got {}..{}",
                self.min_wavelength, self.max_wavelength
            )));
        }
        if self.max_wavelength < self.min_wavelength {
            return Err(Error::config(format!(
                "maximum wavelength {} is below minimum wavelength {}",
                self.max_wavelength, self.min_wavelength
            )));
        }
        if !(self.max_distance > 0.) {
            return Err(Error::config("maximum distance must be greater than zero"));
        }
        if !(0. ..1.).contains(&self.extinction_prob) {
            return Err(Error::config(format!(
                "extinction probability must be in [0, 1), got {}",
                self.extinction_prob
            )));
        }
        if self.max_depth < self.min_depth {
            return Err(Error::config(format!(
                "maximum depth {} is below minimum depth {}",
                self.max_depth, self.min_depth
            )));
        }
        if !(0. ..=1.).contains(&self.important_path_weight) {
            return Err(Error::config(format!(
                "important path weight must be in [0, 1], got {}",
                self.important_path_weight
            )));
        }
        Ok(())
    }

    /// Same configuration restricted to bins `start..end` of this one.
    pub fn for_bins(&self, start: usize, end: usize) -> RayCreateInfo {
        let delta = (self.max_wavelength - self.min_wavelength) / self.bins as f64;
        RayCreateInfo {
            min_wavelength: self.min_wavelength + start as f64 * delta,
            max_wavelength: self.min_wavelength + end as f64 * delta,
            bins: end - start,
            ..*self
        }
    }
}

/// State shared by every ray of one recursion tree.
#[derive(Debug, Default)]
struct PrimaryRecord {
    spawned: AtomicUsize,
}

#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Point3d,
    pub direction: Vec3d,
    info: RayCreateInfo,
    depth: usize,
    ray_count: usize,
    primary: Arc<PrimaryRecord>,
}

impl Ray {
    /// Makes a primary ray (depth 0) with a fresh spawn counter.
    pub fn new(origin: Point3d, direction: Vec3d, info: &RayCreateInfo) -> Result<Ray> {
        info.validate()?;
        let finite = |v: Vec3d| v.x.is_finite() && v.y.is_finite() && v.z.is_finite();
        if !finite(origin) || !finite(direction) || direction.mag_sq() == 0. {
            return Err(Error::config("ray origin and direction must be finite, direction non-zero"));
        }
        Ok(Ray {
            origin,
            direction,
            info: *info,
            depth: 0,
            ray_count: 0,
            primary: Arc::new(PrimaryRecord::default()),
        })
    }

    pub fn point_at(&self, t: f64) -> Point3d {
        self.origin + (t * self.direction)
    }

    pub fn info(&self) -> &RayCreateInfo {
        &self.info
    }

    pub fn bins(&self) -> usize {
        self.info.bins
    }

    pub fn min_wavelength(&self) -> f64 {
        self.info.min_wavelength
    }

    pub fn max_wavelength(&self) -> f64 {
        self.info.max_wavelength
    }

    pub fn max_distance(&self) -> f64 {
        self.info.max_distance
    }

    pub fn extinction_prob(&self) -> f64 {
        self.info.extinction_prob
    }

    pub fn min_depth(&self) -> usize {
        self.info.min_depth
    }

    pub fn max_depth(&self) -> usize {
        self.info.max_depth
    }

    pub fn importance_sampling(&self) -> bool {
        self.info.importance_sampling
    }

    pub fn important_path_weight(&self) -> f64 {
        self.info.important_path_weight
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_primary(&self) -> bool {
        self.depth == 0
    }

    /// Number of rays the tree had spawned when this ray was created.
    pub fn ray_count(&self) -> usize {
        self.ray_count
    }

    /// Number of rays spawned so far by the whole tree.
    pub fn spawned(&self) -> usize {
        self.primary.spawned.load(Ordering::Relaxed)
    }

    /// Whether both rays descend from the same primary ray.
    pub fn shares_primary(&self, other: &Ray) -> bool {
        Arc::ptr_eq(&self.primary, &other.primary)
    }

    /// A zero spectrum matching this ray's wavelength configuration.
    pub fn new_spectrum(&self) -> Spectrum {
        Spectrum::new(self.info.min_wavelength, self.info.max_wavelength, self.info.bins)
    }

    /// Makes the next ray of the path. Everything but origin and direction is
    /// inherited; the shared spawn counter is incremented.
    pub fn spawn_daughter(&self, origin: Point3d, direction: Vec3d) -> Ray {
        let ray_count = self.primary.spawned.fetch_add(1, Ordering::Relaxed) + 1;
        Ray {
            origin,
            direction,
            info: self.info,
            depth: self.depth + 1,
            ray_count,
            primary: Arc::clone(&self.primary),
        }
    }

    /// Russian roulette. Returns the weight to apply to this ray's
    /// contribution when the path continues.
    pub fn survives(&self, rng: &mut RtRng) -> Option<f64> {
        if self.depth < self.info.min_depth {
            return Some(1.);
        }
        if self.depth >= self.info.max_depth || probability(rng, self.info.extinction_prob) {
            return None;
        }
        Some(1. / (1. - self.info.extinction_prob))
    }

    /// Traces the ray through `world` and returns the radiance it carries back
    /// to its origin. `keep_alive` exempts this ray (not its daughters) from
    /// termination. Every volume enclosing the origin acts on the segment up
    /// to the hit point, or up to the distance limit on a miss.
    pub fn trace(&self, world: &dyn World, keep_alive: bool, rng: &mut RtRng) -> Spectrum {
        let normalisation = if keep_alive {
            1.
        } else {
            match self.survives(rng) {
                Some(w) => w,
                None => return self.new_spectrum(),
            }
        };
        if self.info.max_wavelength <= self.info.min_wavelength {
            return self.new_spectrum();
        }

        let hit = world.hit(self).filter(|hit| hit.t <= self.info.max_distance);
        let mut spectrum = match &hit {
            Some(hit) => hit.material.evaluate_surface(world, self, hit, rng),
            None => world.background(self),
        };

        // Volumes are integrated from the end of the segment back to the
        // origin. A miss with no distance limit leaves no bounded segment.
        let segment_end = match &hit {
            Some(hit) => Some(hit.hit_point),
            None if self.info.max_distance.is_finite() => Some(self.point_at(self.info.max_distance)),
            None => None,
        };
        match (world.contains(self.origin), &hit) {
            (Some(enclosing), _) => {
                if let Some(end) = segment_end {
                    for material in enclosing {
                        spectrum = material.evaluate_volume(spectrum, world, self, end, self.origin, rng);
                    }
                }
            }
            (None, Some(hit)) if hit.exiting => {
                spectrum = hit
                    .material
                    .evaluate_volume(spectrum, world, self, hit.hit_point, self.origin, rng);
            }
            _ => {}
        }
        debug_assert!(spectrum.bins() == self.info.bins);
        spectrum *= normalisation;
        spectrum
    }

    /// Mean of `samples` independent traces. Zero when `samples` is zero.
    pub fn sample(&self, world: &dyn World, samples: usize, rng: &mut RtRng) -> Spectrum {
        let mut spectrum = self.new_spectrum();
        if samples == 0 {
            return spectrum;
        }
        for _ in 0..samples {
            spectrum += &self.trace(world, false, rng);
        }
        spectrum *= 1. / samples as f64;
        spectrum
    }

    /// Spawns and traces a daughter ray. No daughter is spawned when it would
    /// reach the maximum depth.
    pub fn trace_daughter(
        &self,
        world: &dyn World,
        origin: Point3d,
        direction: Vec3d,
        rng: &mut RtRng,
    ) -> Spectrum {
        if self.depth + 1 >= self.info.max_depth {
            return self.new_spectrum();
        }
        self.spawn_daughter(origin, direction).trace(world, false, rng)
    }
}
