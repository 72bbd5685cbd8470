//! Drives a pipeline through one observation job.

use super::error::{Error, Result};
use super::pipeline::*;
use super::ray::{Ray, RayCreateInfo};
use super::rng::*;
use super::threadpool::with_thread_rng;
use super::types::*;
use super::world::World;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of primary rays for the coordinates of an observer.
pub trait RayGenerator: Sync {
  /// Coordinates the generator produces rays for.
  fn shape(&self) -> Shape;

  /// Makes `count` primary rays for `coordinate` from `template`, each paired
  /// with its sensitivity.
  fn generate(
    &self,
    coordinate: Coordinate,
    template: &RayCreateInfo,
    count: usize,
    rng: &mut RtRng,
  ) -> Result<Vec<(Ray, f64)>>;
}

/// One fixed line of sight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SightLine {
  pub origin: Point3d,
  pub direction: Vec3d,
  pub sensitivity: f64,
}

/// Observes along a fixed set of sight lines, one point coordinate each.
#[derive(Clone, Debug)]
pub struct SightLines {
  lines: Vec<SightLine>,
}

impl SightLines {
  pub fn new(lines: Vec<SightLine>) -> Result<SightLines> {
    if lines.is_empty() {
      return Err(Error::config("at least one sight line is required"));
    }
    for (i, l) in lines.iter().enumerate() {
      let d = l.direction;
      if !(d.x.is_finite() && d.y.is_finite() && d.z.is_finite()) || d.mag_sq() == 0. {
        return Err(Error::config(format!("sight line {} has an invalid direction", i)));
      }
      if !(l.sensitivity >= 0.) {
        return Err(Error::config(format!("sight line {} has a negative sensitivity", i)));
      }
    }
    Ok(SightLines { lines })
  }

  pub fn lines(&self) -> &[SightLine] {
    &self.lines
  }
}

impl RayGenerator for SightLines {
  fn shape(&self) -> Shape {
    Shape::Points(self.lines.len())
  }

  fn generate(
    &self,
    coordinate: Coordinate,
    template: &RayCreateInfo,
    count: usize,
    _: &mut RtRng,
  ) -> Result<Vec<(Ray, f64)>> {
    let line = self.lines[self.shape().index(coordinate)?];
    (0..count)
      .map(|_| Ok((Ray::new(line.origin, line.direction, template)?, line.sensitivity)))
      .collect()
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObserverCreateInfo {
  /// Template of every primary ray; its bins are split into slices.
  pub ray: RayCreateInfo,
  /// Number of spectral slices, each traced with its own rays.
  pub spectral_rays: usize,
  /// Primary rays per coordinate and slice.
  pub pixel_samples: usize,
  /// Traces averaged by each primary ray.
  pub ray_samples: usize,
}

impl Default for ObserverCreateInfo {
  fn default() -> ObserverCreateInfo {
    ObserverCreateInfo {
      ray: RayCreateInfo::default(),
      spectral_rays: 1,
      pixel_samples: 100,
      ray_samples: 1,
    }
  }
}

impl ObserverCreateInfo {
  pub fn validate(&self) -> Result<()> {
    self.ray.validate()?;
    if self.spectral_rays < 1 || self.spectral_rays > self.ray.bins {
      return Err(Error::config(format!(
        "spectral rays must be in 1..={}, got {}",
        self.ray.bins, self.spectral_rays
      )));
    }
    if self.pixel_samples < 1 || self.ray_samples < 1 {
      return Err(Error::config("sample counts must be at least 1"));
    }
    Ok(())
  }
}

pub struct Observer<G: RayGenerator> {
  generator: G,
  info: ObserverCreateInfo,
  progress: Arc<AtomicUsize>,
}

impl<G: RayGenerator> Observer<G> {
  pub fn new(generator: G, info: ObserverCreateInfo) -> Result<Observer<G>> {
    info.validate()?;
    generator.shape().validate()?;
    Ok(Observer {
      generator,
      info,
      progress: Arc::new(AtomicUsize::new(0)),
    })
  }

  pub fn generator(&self) -> &G {
    &self.generator
  }

  pub fn info(&self) -> &ObserverCreateInfo {
    &self.info
  }

  /// Counts (coordinate, slice) pairs completed by the running job.
  pub fn progress(&self) -> Arc<AtomicUsize> {
    Arc::clone(&self.progress)
  }

  /// Number of (coordinate, slice) pairs in one job.
  pub fn work_units(&self) -> usize {
    self.generator.shape().len() * self.info.spectral_rays
  }

  pub fn pipeline_config(&self) -> Result<PipelineConfig> {
    let ray = &self.info.ray;
    PipelineConfig::new(
      ray.min_wavelength,
      ray.max_wavelength,
      ray.bins,
      SpectralSlices::partition(ray.bins, self.info.spectral_rays)?,
      self.generator.shape(),
      self.info.pixel_samples,
    )
  }

  /// Runs one job: initialises `pipeline`, traces every coordinate of every
  /// slice on `pool` and returns the finalised output. The pipeline's job is
  /// dropped when tracing fails.
  #[tracing::instrument(skip_all, fields(shape = %self.generator.shape(), slices = self.info.spectral_rays))]
  pub fn observe<P: PipelinePolicy>(
    &self,
    world: &dyn World,
    pipeline: &mut Pipeline<P>,
    pool: &rayon::ThreadPool,
  ) -> Result<P::Output> {
    pipeline.initialise(self.pipeline_config()?)?;
    self.progress.store(0, Ordering::Relaxed);
    if let Err(e) = self.trace_job(world, pipeline, pool) {
      tracing::warn!(error = %e, "observation failed");
      pipeline.abort();
      return Err(e);
    }
    let output = pipeline.finalise()?;
    tracing::info!(units = self.progress.load(Ordering::Relaxed), "observation complete");
    Ok(output)
  }

  fn trace_job<P: PipelinePolicy>(
    &self,
    world: &dyn World,
    pipeline: &Pipeline<P>,
    pool: &rayon::ThreadPool,
  ) -> Result<()> {
    let coordinates: Vec<Coordinate> = self.generator.shape().coordinates().collect();
    let slices = pipeline.config()?.spectral_slices().clone();
    for (slice_id, slice) in slices.iter().enumerate() {
      let template = self.info.ray.for_bins(slice.start, slice.end);
      tracing::debug!(
        slice = slice_id,
        min_wavelength = template.min_wavelength,
        max_wavelength = template.max_wavelength,
        "tracing slice"
      );
      pool.install(|| {
        coordinates.par_iter().try_for_each(|&coordinate| {
          with_thread_rng(|rng| {
            self.trace_coordinate(world, pipeline, coordinate, slice_id, &template, rng)
          })
        })
      })?;
    }
    Ok(())
  }

  fn trace_coordinate<P: PipelinePolicy>(
    &self,
    world: &dyn World,
    pipeline: &Pipeline<P>,
    coordinate: Coordinate,
    slice_id: usize,
    template: &RayCreateInfo,
    rng: &mut RtRng,
  ) -> Result<()> {
    let mut processor = pipeline.pixel_processor(coordinate, slice_id)?;
    let rays = self
      .generator
      .generate(coordinate, template, self.info.pixel_samples, rng)?;
    for (ray, sensitivity) in rays.iter() {
      let spectrum = ray.sample(world, self.info.ray_samples, rng);
      processor.add_sample(&spectrum, *sensitivity);
    }
    pipeline.update(coordinate, slice_id, &processor.pack_results(), rays.len())?;
    self.progress.fetch_add(1, Ordering::Relaxed);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::threadpool::init_pool_with_rng;
  use crate::world::EmptyWorld;

  fn lines(n: usize) -> SightLines {
    SightLines::new(
      (0..n)
        .map(|i| SightLine {
          origin: Vec3d::new(i as f64, 0., 0.),
          direction: Vec3d::new(0., 0., 1.),
          sensitivity: 1.,
        })
        .collect(),
    )
    .unwrap()
  }

  #[test]
  fn invalid_observers_are_rejected() {
    assert!(SightLines::new(vec![]).is_err());
    let bad = SightLine {
      origin: Vec3d::zero(),
      direction: Vec3d::zero(),
      sensitivity: 1.,
    };
    assert!(SightLines::new(vec![bad]).is_err());
    let info = ObserverCreateInfo {
      spectral_rays: 41,
      ..Default::default()
    };
    assert!(Observer::new(lines(1), info).is_err());
    let info = ObserverCreateInfo {
      pixel_samples: 0,
      ..Default::default()
    };
    assert!(Observer::new(lines(1), info).is_err());
  }

  #[test]
  fn wrong_coordinate_kind_is_an_error() {
    let mut rng = RtRng::seed_from_u64(0);
    let template = RayCreateInfo::default();
    assert!(lines(2).generate(Coordinate::Unit, &template, 1, &mut rng).is_err());
    let rays = lines(2).generate(Coordinate::Point(1), &template, 3, &mut rng).unwrap();
    assert_eq!(rays.len(), 3);
    assert_eq!(rays[0].0.origin, Vec3d::new(1., 0., 0.));
    assert!(!rays[0].0.shares_primary(&rays[1].0));
  }

  #[test]
  fn empty_world_observes_nothing() {
    let pool = init_pool_with_rng(RtRng::seed_from_u64(1)).unwrap();
    let info = ObserverCreateInfo {
      spectral_rays: 4,
      pixel_samples: 3,
      ..Default::default()
    };
    let observer = Observer::new(lines(5), info).unwrap();
    let mut pipeline = SpectralPowerPipeline::new(SpectralPowerPolicy);
    let frame = observer.observe(&EmptyWorld, &mut pipeline, &pool).unwrap();
    assert_eq!(frame.channels(), 40);
    assert_eq!(frame.shape(), Shape::Points(5));
    for i in 0..5 {
      assert!(frame.means(Coordinate::Point(i)).unwrap().iter().all(|&m| m == 0.));
      assert_eq!(frame.get(Coordinate::Point(i)).unwrap()[0].samples(), 3);
    }
    assert_eq!(observer.progress().load(Ordering::Relaxed), observer.work_units());
    assert!(!pipeline.is_accumulating());
  }
}
