//! Collaborator contracts between the ray engine and a scene.
//!
//! The ray engine does not know how primitives are intersected or how
//! surfaces scatter light. A scene implements [`World`], its primitives carry
//! a [`Material`], and the engine composes the two through [`Ray::trace`].

use super::ray::Ray;
use super::rng::RtRng;
use super::spectrum::Spectrum;
use super::types::*;

/// Nearest intersection of a ray with a scene primitive.
pub struct Intersection<'scene> {
    /// Distance along the ray direction, in units of the direction's length.
    pub t: f64,
    pub hit_point: Point3d,
    /// Surface normal at the hit point, pointing out of the primitive.
    pub normal: Vec3d,
    /// True when the ray was travelling inside the primitive it hit.
    pub exiting: bool,
    pub material: &'scene (dyn Material + Sync),
}

pub trait World: Sync {
    /// Finds the nearest intersection along `ray`, if any.
    fn hit<'scene>(&'scene self, ray: &Ray) -> Option<Intersection<'scene>>;

    /// Radiance arriving along a ray that leaves the scene. Zero by default.
    fn background(&self, ray: &Ray) -> Spectrum {
        ray.new_spectrum()
    }

    /// Materials of every primitive enclosing `point`, outermost first.
    ///
    /// `None` means the world cannot answer; the ray engine then applies the
    /// volume of the hit primitive alone, when the ray leaves it.
    fn contains<'scene>(&'scene self, _point: Point3d) -> Option<Vec<&'scene (dyn Material + Sync)>> {
        None
    }
}

pub trait Material {
    /// Radiance leaving the surface at `hit` towards the ray origin. Daughter
    /// rays are spawned through [`Ray::trace_daughter`].
    fn evaluate_surface(
        &self,
        world: &dyn World,
        ray: &Ray,
        hit: &Intersection,
        rng: &mut RtRng,
    ) -> Spectrum;

    /// Modifies `spectrum` for the segment the ray travelled inside the
    /// primitive. Light propagates from `start` (the far end of the segment)
    /// to `end` (the ray origin). Transparent by default.
    fn evaluate_volume(
        &self,
        spectrum: Spectrum,
        _world: &dyn World,
        _ray: &Ray,
        _start: Point3d,
        _end: Point3d,
        _rng: &mut RtRng,
    ) -> Spectrum {
        spectrum
    }
}

/// A world without primitives.
#[derive(Clone, Copy, Default)]
pub struct EmptyWorld;

impl World for EmptyWorld {
    fn hit<'scene>(&'scene self, _: &Ray) -> Option<Intersection<'scene>> {
        None
    }
}
