use super::*;

/// Measures the total power of each sample: the spectrum integrated over the
/// slice's wavelengths, times the sample's sensitivity.
#[derive(Clone, Copy, Debug, Default)]
pub struct PowerPolicy;

pub type PowerPipeline = Pipeline<PowerPolicy>;

pub struct PowerProcessor {
    bin: StatsBin,
}

impl PixelProcessor for PowerProcessor {
    fn add_sample(&mut self, spectrum: &Spectrum, sensitivity: f64) {
        self.bin.add_sample(spectrum.total() * sensitivity);
    }

    fn pack_results(&self) -> PackedResult {
        PackedResult::from_bins(std::slice::from_ref(&self.bin))
    }
}

impl PipelinePolicy for PowerPolicy {
    type Processor = PowerProcessor;
    type Output = Frame;

    fn channels(&self, _: &SpectralSlice) -> usize {
        1
    }

    fn reduction(&self) -> SliceReduction {
        SliceReduction::Sum
    }

    fn processor(&self, _: &PipelineConfig, _: &SpectralSlice) -> PowerProcessor {
        PowerProcessor {
            bin: StatsBin::new(),
        }
    }

    fn output(&self, frame: &Frame) -> Frame {
        frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn power_is_integrated_and_weighted() {
        let mut s = Spectrum::new(400., 500., 4);
        s.samples_mut().iter_mut().for_each(|v| *v = 1.);
        let mut processor = PowerProcessor { bin: StatsBin::new() };
        processor.add_sample(&s, 1.);
        processor.add_sample(&s, 3.);
        let packed = processor.pack_results();
        assert_eq!(packed.channels(), 1);
        assert_abs_diff_eq!(packed.mean[0], 200.);
        assert_abs_diff_eq!(packed.variance[0], 20000.);
    }
}
