use super::*;

/// Records the spectral power of every bin separately.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralPowerPolicy;

pub type SpectralPowerPipeline = Pipeline<SpectralPowerPolicy>;

pub struct SpectralPowerProcessor {
    bins: Vec<StatsBin>,
}

impl PixelProcessor for SpectralPowerProcessor {
    fn add_sample(&mut self, spectrum: &Spectrum, sensitivity: f64) {
        debug_assert_eq!(spectrum.bins(), self.bins.len());
        for (bin, s) in self.bins.iter_mut().zip(spectrum.samples()) {
            bin.add_sample(s * sensitivity);
        }
    }

    fn pack_results(&self) -> PackedResult {
        PackedResult::from_bins(&self.bins)
    }
}

impl PipelinePolicy for SpectralPowerPolicy {
    type Processor = SpectralPowerProcessor;
    type Output = Frame;

    fn channels(&self, slice: &SpectralSlice) -> usize {
        slice.bins()
    }

    fn reduction(&self) -> SliceReduction {
        SliceReduction::Concatenate
    }

    fn processor(&self, _: &PipelineConfig, slice: &SpectralSlice) -> SpectralPowerProcessor {
        SpectralPowerProcessor {
            bins: vec![StatsBin::new(); slice.bins()],
        }
    }

    fn output(&self, frame: &Frame) -> Frame {
        frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_fill_their_own_bins() {
        let config = PipelineConfig::new(
            400.,
            700.,
            5,
            SpectralSlices::partition(5, 2).unwrap(),
            Shape::Points(1),
            1,
        )
        .unwrap();
        let mut pipeline = SpectralPowerPipeline::new(SpectralPowerPolicy);
        pipeline.initialise(config).unwrap();
        for slice_id in 0..2 {
            let slice = *pipeline.config().unwrap().spectral_slices().get(slice_id).unwrap();
            let (lo, hi) = pipeline.config().unwrap().slice_wavelengths(&slice);
            let mut s = Spectrum::new(lo, hi, slice.bins());
            for (i, v) in s.samples_mut().iter_mut().enumerate() {
                *v = (slice.start + i) as f64;
            }
            let mut processor = pipeline.pixel_processor(Coordinate::Point(0), slice_id).unwrap();
            processor.add_sample(&s, 2.);
            pipeline
                .update(Coordinate::Point(0), slice_id, &processor.pack_results(), 1)
                .unwrap();
        }
        let frame = pipeline.finalise().unwrap();
        assert_eq!(frame.channels(), 5);
        assert_eq!(frame.means(Coordinate::Point(0)).unwrap(), vec![0., 2., 4., 6., 8.]);
    }
}
