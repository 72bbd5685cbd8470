use approx::assert_abs_diff_eq;
use spectral_rt::materials::*;
use spectral_rt::observer::*;
use spectral_rt::pipeline::*;
use spectral_rt::ray::RayCreateInfo;
use spectral_rt::rng::*;
use spectral_rt::scene::Scene;
use spectral_rt::sphere::Sphere;
use spectral_rt::threadpool::init_pool_with_rng;
use spectral_rt::types::*;

/// A lamp at the origin under a dim sky.
fn lamp() -> Scene {
    let mut scene = Scene::new();
    scene.background = 0.5;
    scene.spheres.push(Sphere::new(
        Vec3d::zero(),
        1.,
        Box::new(UniformSurfaceEmitter { radiance: 2. }),
    ));
    scene
}

/// Line 0 looks at the lamp, line 1 at the sky.
fn observer(spectral_rays: usize, pixel_samples: usize) -> Observer<SightLines> {
    let lines = SightLines::new(vec![
        SightLine {
            origin: Vec3d::new(0., 0., 5.),
            direction: Vec3d::new(0., 0., -1.),
            sensitivity: 1.,
        },
        SightLine {
            origin: Vec3d::new(0., 0., 5.),
            direction: Vec3d::new(0., 0., 1.),
            sensitivity: 2.,
        },
    ])
    .unwrap();
    let info = ObserverCreateInfo {
        ray: RayCreateInfo {
            min_wavelength: 400.,
            max_wavelength: 700.,
            bins: 30,
            ..Default::default()
        },
        spectral_rays,
        pixel_samples,
        ray_samples: 1,
    };
    Observer::new(lines, info).unwrap()
}

#[test]
fn power_is_independent_of_slicing() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(1)).unwrap();
    let scene = lamp();
    for &slices in &[1, 3, 7] {
        let obs = observer(slices, 4);
        let frame = obs.observe(&scene, &mut PowerPipeline::new(PowerPolicy), &pool).unwrap();
        let lamp = frame.get(Coordinate::Point(0)).unwrap()[0];
        let sky = frame.get(Coordinate::Point(1)).unwrap()[0];
        assert_abs_diff_eq!(lamp.mean(), 600., epsilon = 1e-9);
        assert_abs_diff_eq!(sky.mean(), 300., epsilon = 1e-9);
        assert_abs_diff_eq!(lamp.variance(), 0., epsilon = 1e-9);
        assert_eq!(lamp.samples(), 4);
    }
}

#[test]
fn spectral_pipeline_keeps_every_bin() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(2)).unwrap();
    let obs = observer(4, 2);
    let frame = obs
        .observe(&lamp(), &mut SpectralPowerPipeline::new(SpectralPowerPolicy), &pool)
        .unwrap();
    assert_eq!(frame.channels(), 30);
    assert!(frame.means(Coordinate::Point(0)).unwrap().iter().all(|&m| (m - 2.).abs() < 1e-12));
    assert!(frame.means(Coordinate::Point(1)).unwrap().iter().all(|&m| (m - 1.).abs() < 1e-12));
}

#[test]
fn rgb_pipeline_produces_one_pixel_per_line() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(3)).unwrap();
    let obs = observer(2, 2);
    let image = obs
        .observe(&lamp(), &mut RgbPipeline::new(RgbPolicy { exposure: 0.01 }), &pool)
        .unwrap();
    assert_eq!(image.shape, Shape::Points(2));
    assert_eq!(image.pixels.len(), 2);
    for px in image.pixels.iter() {
        assert!(px.srgb.iter().all(|c| (0. ..=1.).contains(c)));
    }
    let sum = |px: &RgbPixel| px.linear.iter().sum::<f64>();
    assert!(sum(&image.pixels[0]) > sum(&image.pixels[1]));
}

#[test]
fn accumulating_observations_add_samples() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(4)).unwrap();
    let scene = lamp();
    let obs = observer(1, 5);
    let mut pipeline = PowerPipeline::new(PowerPolicy).with_accumulate(true);
    obs.observe(&scene, &mut pipeline, &pool).unwrap();
    let frame = obs.observe(&scene, &mut pipeline, &pool).unwrap();
    assert_eq!(frame.get(Coordinate::Point(0)).unwrap()[0].samples(), 10);
    assert_abs_diff_eq!(frame.get(Coordinate::Point(0)).unwrap()[0].mean(), 600., epsilon = 1e-9);
}

#[test]
fn diffuse_floor_under_a_lamp_is_lit_on_average() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(5)).unwrap();
    let mut scene = Scene::new();
    scene.spheres.push(Sphere::new(
        Vec3d::new(0., 0., -1000.),
        1000.,
        Box::new(Lambertian { reflectivity: 0.5 }),
    ));
    scene.background = 1.;
    let lines = SightLines::new(vec![SightLine {
        origin: Vec3d::new(0., 0., 1.),
        direction: Vec3d::new(0., 0., -1.),
        sensitivity: 1.,
    }])
    .unwrap();
    let info = ObserverCreateInfo {
        ray: RayCreateInfo {
            bins: 1,
            ..Default::default()
        },
        spectral_rays: 1,
        pixel_samples: 4000,
        ray_samples: 1,
    };
    let frame = Observer::new(lines, info)
        .unwrap()
        .observe(&scene, &mut SpectralPowerPipeline::new(SpectralPowerPolicy), &pool)
        .unwrap();
    // Half of the sky is reflected; the floor is flat so nothing else is seen.
    assert_abs_diff_eq!(frame.means(Coordinate::Point(0)).unwrap()[0], 0.5, epsilon = 0.05);
}
