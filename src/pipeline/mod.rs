//! Aggregation of per-sample spectra into per-coordinate results.
//!
//! A [`Pipeline`] lives through one job at a time:
//!
//! 1. [`Pipeline::initialise`] fixes the wavelength range, the spectral
//!    slices and the coordinate [`Shape`].
//! 2. For every (coordinate, slice) pair a worker obtains a processor with
//!    [`Pipeline::pixel_processor`], feeds it spectra, and hands the packed
//!    result back through [`Pipeline::update`]. Updates lock only the
//!    coordinate they touch and may arrive in any order.
//! 3. [`Pipeline::finalise`] reduces the slices of every coordinate, merges the
//!    job into the output frame and converts it with the pipeline's policy.
//!
//! What a processor measures is decided by a [`PipelinePolicy`]: total power,
//! a full spectrum, or CIE XYZ converted to sRGB.

mod power;
mod rgb;
mod shape;
mod slices;
mod spectral;

pub use power::*;
pub use rgb::*;
pub use shape::*;
pub use slices::*;
pub use spectral::*;

use crate::error::{Error, Result};
use crate::spectrum::Spectrum;
use crate::stats::StatsBin;
use parking_lot::Mutex;

/// Per-channel summary of the samples seen by one processor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedResult {
    pub mean: Vec<f64>,
    /// Unbiased sample variance per channel.
    pub variance: Vec<f64>,
}

impl PackedResult {
    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    pub(crate) fn from_bins(bins: &[StatsBin]) -> PackedResult {
        PackedResult {
            mean: bins.iter().map(|b| b.mean()).collect(),
            variance: bins.iter().map(|b| b.variance()).collect(),
        }
    }
}

/// Short-lived accumulator bound to one (coordinate, slice) pair.
pub trait PixelProcessor {
    fn add_sample(&mut self, spectrum: &Spectrum, sensitivity: f64);
    fn pack_results(&self) -> PackedResult;
}

/// How the channels of the slices of one coordinate form its final channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceReduction {
    /// Every slice produces the same channels; contributions add up.
    Sum,
    /// Every slice produces its own channels, laid out in slice order.
    Concatenate,
}

pub trait PipelinePolicy: Send + Sync {
    type Processor: PixelProcessor;
    type Output;

    /// Number of channels a processor for `slice` packs.
    fn channels(&self, slice: &SpectralSlice) -> usize;

    fn reduction(&self) -> SliceReduction;

    fn processor(&self, config: &PipelineConfig, slice: &SpectralSlice) -> Self::Processor;

    fn output(&self, frame: &Frame) -> Self::Output;
}

/// Job parameters, fixed by [`Pipeline::initialise`].
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    min_wavelength: f64,
    max_wavelength: f64,
    spectral_bins: usize,
    spectral_slices: SpectralSlices,
    shape: Shape,
    samples_per_coordinate: usize,
}

impl PipelineConfig {
    pub fn new(
        min_wavelength: f64,
        max_wavelength: f64,
        spectral_bins: usize,
        spectral_slices: SpectralSlices,
        shape: Shape,
        samples_per_coordinate: usize,
    ) -> Result<PipelineConfig> {
        if spectral_bins < 1 {
            return Err(Error::config("number of spectral bins must be at least 1"));
        }
        if !(min_wavelength > 0.) || !(max_wavelength > min_wavelength) || !max_wavelength.is_finite() {
            return Err(Error::config(format!(
                "invalid wavelength range {}..{}",
                min_wavelength, max_wavelength
            )));
        }
        if spectral_slices.bins() != spectral_bins {
            return Err(Error::config(format!(
                "spectral slices cover {} bins, expected {}",
                spectral_slices.bins(),
                spectral_bins
            )));
        }
        shape.validate()?;
        Ok(PipelineConfig {
            min_wavelength,
            max_wavelength,
            spectral_bins,
            spectral_slices,
            shape,
            samples_per_coordinate,
        })
    }

    pub fn min_wavelength(&self) -> f64 {
        self.min_wavelength
    }

    pub fn max_wavelength(&self) -> f64 {
        self.max_wavelength
    }

    pub fn spectral_bins(&self) -> usize {
        self.spectral_bins
    }

    pub fn spectral_slices(&self) -> &SpectralSlices {
        &self.spectral_slices
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn samples_per_coordinate(&self) -> usize {
        self.samples_per_coordinate
    }

    pub fn delta_wavelength(&self) -> f64 {
        (self.max_wavelength - self.min_wavelength) / self.spectral_bins as f64
    }

    /// Wavelength range covered by `slice`.
    pub fn slice_wavelengths(&self, slice: &SpectralSlice) -> (f64, f64) {
        let delta = self.delta_wavelength();
        (
            self.min_wavelength + slice.start as f64 * delta,
            self.min_wavelength + slice.end as f64 * delta,
        )
    }
}

/// Finalised per-coordinate, per-channel statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    shape: Shape,
    channels: usize,
    bins: Vec<StatsBin>,
}

impl Frame {
    pub fn new(shape: Shape, channels: usize) -> Frame {
        Frame {
            shape,
            channels,
            bins: vec![StatsBin::default(); shape.len() * channels],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Statistics of every channel of `coordinate`.
    pub fn get(&self, coordinate: Coordinate) -> Result<&[StatsBin]> {
        let i = self.shape.index(coordinate)?;
        Ok(&self.bins[i * self.channels..(i + 1) * self.channels])
    }

    /// Channel means of `coordinate`.
    pub fn means(&self, coordinate: Coordinate) -> Result<Vec<f64>> {
        Ok(self.get(coordinate)?.iter().map(|b| b.mean()).collect())
    }

    fn cell_mut(&mut self, index: usize) -> &mut [StatsBin] {
        &mut self.bins[index * self.channels..(index + 1) * self.channels]
    }
}

/// Statistics of one coordinate: one row of channel bins per slice.
type Cell = Vec<Vec<StatsBin>>;

struct Job {
    config: PipelineConfig,
    cells: Vec<Mutex<Cell>>,
}

enum State {
    Uninitialised,
    Accumulating(Job),
    Finalised,
}

pub struct Pipeline<P: PipelinePolicy> {
    policy: P,
    accumulate: bool,
    state: State,
    frame: Option<Frame>,
}

impl<P: PipelinePolicy> Pipeline<P> {
    pub fn new(policy: P) -> Pipeline<P> {
        Pipeline {
            policy,
            accumulate: false,
            state: State::Uninitialised,
            frame: None,
        }
    }

    /// With accumulation enabled each job is merged into the frame of the
    /// previous job as further samples, as long as the frame layout matches.
    pub fn with_accumulate(mut self, accumulate: bool) -> Pipeline<P> {
        self.accumulate = accumulate;
        self
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Frame produced by the last finalised job.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating(_))
    }

    /// Starts a job. Not allowed while another job is accumulating.
    pub fn initialise(&mut self, config: PipelineConfig) -> Result<()> {
        if self.is_accumulating() {
            return Err(Error::state("initialise called while a job is accumulating"));
        }
        let slices = config.spectral_slices();
        let rows: Vec<usize> = slices.iter().map(|s| self.policy.channels(s)).collect();
        if self.policy.reduction() == SliceReduction::Sum && rows.iter().any(|&c| c != rows[0]) {
            return Err(Error::config("summed slices must all produce the same channels"));
        }
        let cell: Cell = rows.iter().map(|&c| vec![StatsBin::default(); c]).collect();
        let cells = (0..config.shape().len()).map(|_| Mutex::new(cell.clone())).collect();
        tracing::debug!(
            shape = %config.shape(),
            bins = config.spectral_bins(),
            slices = slices.len(),
            "pipeline initialised"
        );
        self.state = State::Accumulating(Job { config, cells });
        Ok(())
    }

    fn job(&self) -> Result<&Job> {
        match &self.state {
            State::Accumulating(job) => Ok(job),
            State::Uninitialised => Err(Error::state("pipeline has not been initialised")),
            State::Finalised => Err(Error::state("pipeline has already been finalised")),
        }
    }

    pub fn config(&self) -> Result<&PipelineConfig> {
        Ok(&self.job()?.config)
    }

    /// A fresh processor for one coordinate and slice.
    pub fn pixel_processor(&self, coordinate: Coordinate, slice_id: usize) -> Result<P::Processor> {
        let job = self.job()?;
        job.config.shape().index(coordinate)?;
        let slice = job.config.spectral_slices().get(slice_id)?;
        Ok(self.policy.processor(&job.config, slice))
    }

    /// Merges a packed processor result, summarising `samples` samples, into
    /// the statistics of (coordinate, slice).
    pub fn update(
        &self,
        coordinate: Coordinate,
        slice_id: usize,
        packed: &PackedResult,
        samples: usize,
    ) -> Result<()> {
        let job = self.job()?;
        let index = job.config.shape().index(coordinate)?;
        let slice = job.config.spectral_slices().get(slice_id)?;
        let channels = self.policy.channels(slice);
        if packed.mean.len() != channels || packed.variance.len() != channels {
            return Err(Error::state(format!(
                "packed result has {} channels, slice {} expects {}",
                packed.mean.len(),
                slice_id,
                channels
            )));
        }
        let mut cell = job.cells[index].lock();
        for (bin, (&mean, &variance)) in cell[slice_id]
            .iter_mut()
            .zip(packed.mean.iter().zip(packed.variance.iter()))
        {
            bin.combine(mean, variance, samples);
        }
        Ok(())
    }

    /// Drops the current job, if any, without touching the frame.
    pub fn abort(&mut self) {
        if self.is_accumulating() {
            tracing::debug!("pipeline job aborted");
            self.state = State::Uninitialised;
        }
    }

    /// Ends the job and returns the policy's output for the resulting frame.
    #[tracing::instrument(skip_all)]
    pub fn finalise(&mut self) -> Result<P::Output> {
        self.job()?;
        let job = match std::mem::replace(&mut self.state, State::Finalised) {
            State::Accumulating(job) => job,
            _ => return Err(Error::state("pipeline is not accumulating")),
        };
        let shape = job.config.shape();
        let slices = job.config.spectral_slices();
        let channels = match self.policy.reduction() {
            SliceReduction::Sum => slices.iter().next().map_or(0, |s| self.policy.channels(s)),
            SliceReduction::Concatenate => slices.iter().map(|s| self.policy.channels(s)).sum(),
        };
        let mut frame = match self.frame.take() {
            Some(f) if self.accumulate && f.shape() == shape && f.channels() == channels => f,
            _ => Frame::new(shape, channels),
        };

        let mut touched = 0;
        for (index, cell) in job.cells.into_iter().enumerate() {
            let cell = cell.into_inner();
            if let Some(reduced) = reduce(&cell, self.policy.reduction()) {
                touched += 1;
                for (dst, src) in frame.cell_mut(index).iter_mut().zip(reduced.iter()) {
                    dst.merge(src);
                }
            }
        }
        tracing::debug!(touched, coordinates = shape.len(), "pipeline finalised");

        let output = self.policy.output(&frame);
        self.frame = Some(frame);
        Ok(output)
    }
}

/// Reduces the per-slice rows of one coordinate to its channels. `None` when
/// no slice received samples.
fn reduce(cell: &[Vec<StatsBin>], reduction: SliceReduction) -> Option<Vec<StatsBin>> {
    if cell.iter().flatten().all(|b| b.samples() == 0) {
        return None;
    }
    match reduction {
        SliceReduction::Concatenate => Some(cell.iter().flatten().copied().collect()),
        SliceReduction::Sum => {
            // Slices sample disjoint wavelengths independently: means and
            // variances add. The sample count is the smallest any slice saw.
            let samples = cell
                .iter()
                .filter_map(|row| row.first().map(|b| b.samples()))
                .filter(|&n| n > 0)
                .min()
                .unwrap_or(0);
            let channels = cell.first().map_or(0, Vec::len);
            Some(
                (0..channels)
                    .map(|c| {
                        let mean = cell.iter().map(|row| row[c].mean()).sum();
                        let variance = cell.iter().map(|row| row[c].variance()).sum();
                        StatsBin::from_summary(mean, variance, samples)
                    })
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn power_pipeline(shape: Shape, slices: usize) -> Pipeline<PowerPolicy> {
        let mut p = Pipeline::new(PowerPolicy::default());
        let config = PipelineConfig::new(
            400.,
            700.,
            6,
            SpectralSlices::partition(6, slices).unwrap(),
            shape,
            10,
        )
        .unwrap();
        p.initialise(config).unwrap();
        p
    }

    fn packed(mean: f64, variance: f64) -> PackedResult {
        PackedResult {
            mean: vec![mean],
            variance: vec![variance],
        }
    }

    #[test]
    fn update_order_does_not_matter() {
        let batches = [(1.0, 0.5, 3), (2.5, 0.1, 7), (0.25, 2.0, 2), (4.0, 0.0, 1)];
        let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];
        let mut results = Vec::new();
        for order in orders.iter() {
            let mut p = power_pipeline(Shape::Points(2), 1);
            for &i in order.iter() {
                let (m, v, n) = batches[i];
                p.update(Coordinate::Point(1), 0, &packed(m, v), n).unwrap();
            }
            let frame = p.finalise().unwrap();
            results.push(frame.get(Coordinate::Point(1)).unwrap()[0]);
        }
        for r in results.iter() {
            assert_eq!(r.samples(), 13);
            assert_abs_diff_eq!(r.mean(), results[0].mean(), epsilon = 1e-12);
            assert_abs_diff_eq!(r.variance(), results[0].variance(), epsilon = 1e-12);
        }
        let expected = (1.0 * 3. + 2.5 * 7. + 0.25 * 2. + 4.0) / 13.;
        assert_abs_diff_eq!(results[0].mean(), expected, epsilon = 1e-12);
    }

    #[test]
    fn concurrent_updates_to_one_coordinate() {
        use rayon::prelude::*;
        let batches: Vec<(f64, f64, usize)> = (0..400)
            .map(|i| (i as f64 * 0.25, (i % 7) as f64 * 0.1, 1 + i % 5))
            .collect();

        let mut serial = power_pipeline(Shape::Points(3), 1);
        for &(m, v, n) in batches.iter() {
            serial.update(Coordinate::Point(2), 0, &packed(m, v), n).unwrap();
        }
        let expected = serial.finalise().unwrap().get(Coordinate::Point(2)).unwrap()[0];

        let pool = rayon::ThreadPoolBuilder::new().num_threads(8).build().unwrap();
        let mut parallel = power_pipeline(Shape::Points(3), 1);
        let shared = &parallel;
        pool.install(|| {
            batches.par_iter().for_each(|&(m, v, n)| {
                shared.update(Coordinate::Point(2), 0, &packed(m, v), n).unwrap();
            })
        });
        let got = parallel.finalise().unwrap().get(Coordinate::Point(2)).unwrap()[0];

        assert_eq!(got.samples(), expected.samples());
        assert_eq!(got.samples(), batches.iter().map(|b| b.2).sum::<usize>());
        assert_abs_diff_eq!(got.mean(), expected.mean(), epsilon = 1e-9);
        assert_abs_diff_eq!(got.variance(), expected.variance(), epsilon = 1e-6);
    }

    #[test]
    fn summed_slices_add_up() {
        let mut p = power_pipeline(Shape::Unit, 3);
        for slice in 0..3 {
            p.update(Coordinate::Unit, slice, &packed(slice as f64 + 1., 0.5), 4).unwrap();
        }
        let frame = p.finalise().unwrap();
        let bin = frame.get(Coordinate::Unit).unwrap()[0];
        assert_abs_diff_eq!(bin.mean(), 6.);
        assert_abs_diff_eq!(bin.variance(), 1.5);
        assert_eq!(bin.samples(), 4);
    }

    #[test]
    fn untouched_coordinates_stay_empty() {
        let mut p = power_pipeline(Shape::Pixels { width: 2, height: 2 }, 1);
        p.update(Coordinate::Pixel(1, 0), 0, &packed(3., 0.), 2).unwrap();
        let frame = p.finalise().unwrap();
        assert_eq!(frame.get(Coordinate::Pixel(0, 0)).unwrap()[0].samples(), 0);
        assert_eq!(frame.get(Coordinate::Pixel(1, 0)).unwrap()[0].mean(), 3.);
        assert_eq!(frame.means(Coordinate::Pixel(1, 0)).unwrap(), vec![3.]);
        assert!(matches!(
            frame.means(Coordinate::Pixel(2, 0)),
            Err(Error::CoordinateOutOfBounds { .. })
        ));
        assert!(frame.means(Coordinate::Point(0)).is_err());
    }

    #[test]
    fn state_machine_is_enforced() {
        let mut p = Pipeline::new(PowerPolicy::default());
        assert!(matches!(
            p.pixel_processor(Coordinate::Unit, 0),
            Err(Error::PipelineState(_))
        ));
        assert!(p.finalise().is_err());

        let mut p = power_pipeline(Shape::Unit, 2);
        assert!(matches!(
            p.update(Coordinate::Unit, 2, &packed(1., 0.), 1),
            Err(Error::SliceOutOfBounds { .. })
        ));
        assert!(matches!(
            p.update(Coordinate::Point(0), 0, &packed(1., 0.), 1),
            Err(Error::CoordinateOutOfBounds { .. })
        ));
        let two = PackedResult {
            mean: vec![1., 2.],
            variance: vec![0., 0.],
        };
        assert!(p.update(Coordinate::Unit, 0, &two, 1).is_err());
        let config = p.config().unwrap().clone();
        assert!(p.initialise(config).is_err());

        p.finalise().unwrap();
        assert!(p.update(Coordinate::Unit, 0, &packed(1., 0.), 1).is_err());
        assert!(p.finalise().is_err());
    }

    #[test]
    fn abort_discards_the_job() {
        let mut p = power_pipeline(Shape::Unit, 1);
        p.update(Coordinate::Unit, 0, &packed(1., 0.), 1).unwrap();
        p.abort();
        assert!(!p.is_accumulating());
        assert!(p.frame().is_none());
        let config = PipelineConfig::new(
            400.,
            700.,
            6,
            SpectralSlices::single(6).unwrap(),
            Shape::Unit,
            1,
        )
        .unwrap();
        p.initialise(config).unwrap();
    }

    #[test]
    fn accumulate_merges_jobs() {
        let config = PipelineConfig::new(
            400.,
            700.,
            6,
            SpectralSlices::single(6).unwrap(),
            Shape::Unit,
            1,
        )
        .unwrap();
        let mut p = Pipeline::new(PowerPolicy::default()).with_accumulate(true);
        for &mean in &[2., 4.] {
            p.initialise(config.clone()).unwrap();
            p.update(Coordinate::Unit, 0, &packed(mean, 0.), 5).unwrap();
            p.finalise().unwrap();
        }
        let bin = p.frame().unwrap().get(Coordinate::Unit).unwrap()[0];
        assert_eq!(bin.samples(), 10);
        assert_abs_diff_eq!(bin.mean(), 3.);

        let mut fresh = Pipeline::new(PowerPolicy::default());
        for &mean in &[2., 4.] {
            fresh.initialise(config.clone()).unwrap();
            fresh.update(Coordinate::Unit, 0, &packed(mean, 0.), 5).unwrap();
            fresh.finalise().unwrap();
        }
        assert_abs_diff_eq!(fresh.frame().unwrap().get(Coordinate::Unit).unwrap()[0].mean(), 4.);
    }

    #[test]
    fn config_validation() {
        let slices = SpectralSlices::partition(4, 2).unwrap();
        assert!(PipelineConfig::new(400., 700., 5, slices.clone(), Shape::Unit, 1).is_err());
        assert!(PipelineConfig::new(700., 400., 4, slices.clone(), Shape::Unit, 1).is_err());
        assert!(PipelineConfig::new(400., 700., 4, slices.clone(), Shape::Points(0), 1).is_err());
        let config = PipelineConfig::new(400., 800., 4, slices, Shape::Unit, 1).unwrap();
        let second = *config.spectral_slices().get(1).unwrap();
        assert_eq!(config.slice_wavelengths(&second), (600., 800.));
    }
}
