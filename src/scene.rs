use super::materials::*;
use super::ray::Ray;
use super::spectrum::Spectrum;
use super::sphere::*;
use super::types::*;
use super::world::*;

/// Hits closer than this to the ray origin are ignored.
const T_MIN: f64 = 1e-9;

pub struct Scene {
    pub spheres: Vec<Sphere>,
    /// Spectral radiance of the sky, the same at every wavelength.
    pub background: f64,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            spheres: vec![],
            background: 0.,
        }
    }
}

impl Default for Scene {
    fn default() -> Scene {
        Scene::new()
    }
}

impl World for Scene {
    fn hit<'scene>(&'scene self, r: &Ray) -> Option<Intersection<'scene>> {
        let mut closest_t = r.max_distance();
        let mut closest_hit: Option<Intersection> = None;
        for sphere in &self.spheres {
            if let Some(hit) = sphere.hit(r, T_MIN, closest_t) {
                closest_t = hit.t;
                closest_hit = Some(hit);
            }
        }
        closest_hit
    }

    fn background(&self, ray: &Ray) -> Spectrum {
        let mut s = ray.new_spectrum();
        s.samples_mut().iter_mut().for_each(|v| *v = self.background);
        s
    }

    fn contains<'scene>(&'scene self, point: Point3d) -> Option<Vec<&'scene (dyn Material + Sync)>> {
        Some(
            self.spheres
                .iter()
                .filter(|s| s.contains(point))
                .map(|s| s.material())
                .collect(),
        )
    }
}

/// A diffuse floor under a dim sky, a lamp, a glowing cloud and a black
/// sphere, all on the z = 0 plane.
pub fn demo_scene() -> Scene {
    let mut scene = Scene::new();
    scene.background = 0.05;

    scene.spheres.push(Sphere::new(
        Vec3d::new(0., -1000., 0.),
        999.,
        Box::new(Lambertian { reflectivity: 0.5 }),
    ));
    scene.spheres.push(Sphere::new(
        Vec3d::new(0., 0., 0.),
        1.,
        Box::new(UniformSurfaceEmitter { radiance: 1. }),
    ));
    scene.spheres.push(Sphere::new(
        Vec3d::new(-3., 0., 0.),
        1.,
        Box::new(UniformVolumeEmitter { emission: 0.25 }),
    ));
    scene.spheres.push(Sphere::new(
        Vec3d::new(3., 0., 0.),
        1.,
        Box::new(AbsorbingSurface),
    ));
    scene
}
