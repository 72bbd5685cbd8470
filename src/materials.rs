use super::ray::Ray;
use super::rng::*;
use super::spectrum::Spectrum;
use super::types::*;
use super::world::*;

/// Daughter rays start this far off the surface along the normal.
const SURFACE_OFFSET: f64 = 1e-9;

fn filled(ray: &Ray, value: f64) -> Spectrum {
    let mut s = ray.new_spectrum();
    s.samples_mut().iter_mut().for_each(|v| *v = value);
    s
}

/// Normal on the side the ray arrived from.
fn facing_normal(ray: &Ray, hit: &Intersection) -> Vec3d {
    if ray.direction.dot(hit.normal) < 0. {
        hit.normal
    } else {
        -hit.normal
    }
}

// Emitters

/// Emits the same spectral radiance at every wavelength and reflects nothing.
pub struct UniformSurfaceEmitter {
    pub radiance: f64,
}

impl Material for UniformSurfaceEmitter {
    fn evaluate_surface(&self, _: &dyn World, ray: &Ray, _: &Intersection, _: &mut RtRng) -> Spectrum {
        filled(ray, self.radiance)
    }
}

/// Transparent boundary around a uniformly glowing medium. Radiance grows
/// linearly with the distance travelled inside.
pub struct UniformVolumeEmitter {
    pub emission: f64,
}

impl Material for UniformVolumeEmitter {
    fn evaluate_surface(
        &self,
        world: &dyn World,
        ray: &Ray,
        hit: &Intersection,
        rng: &mut RtRng,
    ) -> Spectrum {
        let n = facing_normal(ray, hit);
        ray.trace_daughter(world, hit.hit_point - SURFACE_OFFSET * n, ray.direction, rng)
    }

    fn evaluate_volume(
        &self,
        mut spectrum: Spectrum,
        _: &dyn World,
        _: &Ray,
        start: Point3d,
        end: Point3d,
        _: &mut RtRng,
    ) -> Spectrum {
        let glow = self.emission * (end - start).mag();
        spectrum.samples_mut().iter_mut().for_each(|v| *v += glow);
        spectrum
    }
}

// Absorber

pub struct AbsorbingSurface;

impl Material for AbsorbingSurface {
    fn evaluate_surface(&self, _: &dyn World, ray: &Ray, _: &Intersection, _: &mut RtRng) -> Spectrum {
        ray.new_spectrum()
    }
}

// Lambertian

/// Ideal diffuse reflector with a wavelength independent reflectivity.
pub struct Lambertian {
    pub reflectivity: f64,
}

impl Material for Lambertian {
    fn evaluate_surface(
        &self,
        world: &dyn World,
        ray: &Ray,
        hit: &Intersection,
        rng: &mut RtRng,
    ) -> Spectrum {
        let n = facing_normal(ray, hit);
        let origin = hit.hit_point + SURFACE_OFFSET * n;
        if ray.importance_sampling() {
            // Cosine weighted: the pdf cancels the cosine and 1/pi of the BRDF.
            let direction = Vec3d::gen_cosine_random_hemisphere(rng, n);
            let mut s = ray.trace_daughter(world, origin, direction, rng);
            s *= self.reflectivity;
            s
        } else {
            let direction = Vec3d::gen_uniform_random_hemisphere(rng, n);
            let mut s = ray.trace_daughter(world, origin, direction, rng);
            s *= 2. * self.reflectivity * direction.dot(n);
            s
        }
    }
}
