#![allow(clippy::suspicious_operation_groupings)]

use super::ray::Ray;
use super::types::*;
use super::world::*;
use std::borrow::Borrow;

pub struct Sphere {
    center: Point3d,
    radius: f64,
    material: Box<dyn Material + Sync>,
}

impl Sphere {
    pub fn new(center: Point3d, radius: f64, material: Box<dyn Material + Sync>) -> Sphere {
        Sphere {
            center,
            radius,
            material,
        }
    }

    pub fn center(&self) -> Point3d {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn material(&self) -> &(dyn Material + Sync) {
        self.material.borrow()
    }

    /// Whether `p` lies strictly inside the sphere.
    pub fn contains(&self, p: Point3d) -> bool {
        (p - self.center).mag_sq() < self.radius * self.radius
    }

    pub fn hit<'scene>(&'scene self, r: &Ray, t_min: f64, t_max: f64) -> Option<Intersection<'scene>> {
        let oc = r.origin - self.center;
        let a = r.direction.dot(r.direction);
        let half_b = oc.dot(r.direction);
        let c = oc.dot(oc) - (self.radius * self.radius);
        let discriminant = (half_b * half_b) - (a * c);
        if discriminant < 0. {
            return None;
        }
        let discriminant_sqrt = discriminant.sqrt();
        let mut root = (-half_b - discriminant_sqrt) / a;
        if root < t_min || t_max < root {
            root = (-half_b + discriminant_sqrt) / a;
            if root < t_min || t_max < root {
                return None;
            }
        }
        let hit_point = r.point_at(root);
        let normal = (hit_point - self.center) / self.radius;
        Some(Intersection {
            t: root,
            hit_point,
            normal,
            exiting: r.direction.dot(normal) > 0.,
            material: self.material.borrow(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::AbsorbingSurface;
    use crate::ray::RayCreateInfo;

    #[test]
    fn entering_and_exiting() {
        let s = Sphere::new(Vec3d::new(0., 0., 5.), 1., Box::new(AbsorbingSurface));
        let info = RayCreateInfo::default();
        let outside = Ray::new(Vec3d::zero(), Vec3d::new(0., 0., 1.), &info).unwrap();
        let hit = s.hit(&outside, 1e-9, f64::INFINITY).unwrap();
        assert!((hit.t - 4.).abs() < 1e-12);
        assert!(!hit.exiting);
        assert!((hit.normal - Vec3d::new(0., 0., -1.)).mag() < 1e-12);

        let inside = Ray::new(Vec3d::new(0., 0., 5.), Vec3d::new(0., 0., 1.), &info).unwrap();
        let hit = s.hit(&inside, 1e-9, f64::INFINITY).unwrap();
        assert!((hit.t - 1.).abs() < 1e-12);
        assert!(hit.exiting);

        let away = Ray::new(Vec3d::zero(), Vec3d::new(0., 0., -1.), &info).unwrap();
        assert!(s.hit(&away, 1e-9, f64::INFINITY).is_none());
    }

    #[test]
    fn containment_is_strict() {
        let s = Sphere::new(Vec3d::new(0., 0., 5.), 1., Box::new(AbsorbingSurface));
        assert!(s.contains(Vec3d::new(0., 0., 5.)));
        assert!(s.contains(Vec3d::new(0., 0.5, 5.5)));
        assert!(!s.contains(Vec3d::new(0., 0., 6.)));
        assert!(!s.contains(Vec3d::zero()));
    }
}
