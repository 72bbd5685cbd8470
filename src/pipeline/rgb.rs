use super::*;
use palette::white_point::D65;
use palette::{FromColor, LinSrgb, Srgb, Xyz};

/// Converts every sample to CIE XYZ. Slices add their partial tristimulus
/// values; the output is an sRGB image.
#[derive(Clone, Copy, Debug)]
pub struct RgbPolicy {
    /// Scale applied to XYZ before conversion.
    pub exposure: f64,
}

impl Default for RgbPolicy {
    fn default() -> RgbPolicy {
        RgbPolicy { exposure: 1. }
    }
}

pub type RgbPipeline = Pipeline<RgbPolicy>;

pub struct XyzProcessor {
    bins: [StatsBin; 3],
}

impl PixelProcessor for XyzProcessor {
    fn add_sample(&mut self, spectrum: &Spectrum, sensitivity: f64) {
        let xyz = spectrum.to_xyz();
        for (bin, v) in self.bins.iter_mut().zip(xyz.iter()) {
            bin.add_sample(v * sensitivity);
        }
    }

    fn pack_results(&self) -> PackedResult {
        PackedResult::from_bins(&self.bins)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RgbPixel {
    pub linear: [f64; 3],
    /// Gamma encoded, clamped to [0, 1].
    pub srgb: [f64; 3],
    /// Standard error of the XYZ luminance.
    pub error: f64,
}

pub struct RgbImage {
    pub shape: Shape,
    pub pixels: Vec<RgbPixel>,
}

impl RgbPolicy {
    pub fn convert(&self, xyz: [f64; 3]) -> ([f64; 3], [f64; 3]) {
        let e = self.exposure;
        let xyz = Xyz::<D65, f64>::new(xyz[0] * e, xyz[1] * e, xyz[2] * e);
        let linear = LinSrgb::<f64>::from_xyz(xyz);
        let clamped = LinSrgb::<f64>::new(
            linear.red.max(0.).min(1.),
            linear.green.max(0.).min(1.),
            linear.blue.max(0.).min(1.),
        );
        let encoded = Srgb::<f64>::from_linear(clamped);
        (
            [linear.red, linear.green, linear.blue],
            [encoded.red, encoded.green, encoded.blue],
        )
    }
}

impl PipelinePolicy for RgbPolicy {
    type Processor = XyzProcessor;
    type Output = RgbImage;

    fn channels(&self, _: &SpectralSlice) -> usize {
        3
    }

    fn reduction(&self) -> SliceReduction {
        SliceReduction::Sum
    }

    fn processor(&self, _: &PipelineConfig, _: &SpectralSlice) -> XyzProcessor {
        XyzProcessor {
            bins: [StatsBin::new(); 3],
        }
    }

    fn output(&self, frame: &Frame) -> RgbImage {
        let pixels = (0..frame.shape().len())
            .map(|i| {
                let xyz = &frame.bins[i * 3..i * 3 + 3];
                let (linear, srgb) = self.convert([xyz[0].mean(), xyz[1].mean(), xyz[2].mean()]);
                let error = xyz[1].error() * self.exposure;
                RgbPixel { linear, srgb, error }
            })
            .collect();
        RgbImage {
            shape: frame.shape(),
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn d65_white_maps_to_white() {
        let policy = RgbPolicy::default();
        let (linear, srgb) = policy.convert([0.95047, 1., 1.08883]);
        for c in 0..3 {
            assert_abs_diff_eq!(linear[c], 1., epsilon = 1e-3);
            assert_abs_diff_eq!(srgb[c], 1., epsilon = 1e-3);
        }
        let (_, black) = policy.convert([0., 0., 0.]);
        assert_eq!(black, [0., 0., 0.]);
    }

    #[test]
    fn slices_add_tristimulus_values() {
        let config = PipelineConfig::new(
            380.,
            720.,
            34,
            SpectralSlices::partition(34, 4).unwrap(),
            Shape::Pixels { width: 1, height: 1 },
            1,
        )
        .unwrap();
        let mut pipeline = RgbPipeline::new(RgbPolicy { exposure: 0.01 });
        pipeline.initialise(config.clone()).unwrap();
        let mut whole = Spectrum::new(380., 720., 34);
        whole.samples_mut().iter_mut().for_each(|v| *v = 1.);
        for (slice_id, slice) in config.spectral_slices().iter().enumerate() {
            let (lo, hi) = config.slice_wavelengths(slice);
            let mut part = Spectrum::new(lo, hi, slice.bins());
            part.samples_mut().iter_mut().for_each(|v| *v = 1.);
            let mut processor = pipeline.pixel_processor(Coordinate::Pixel(0, 0), slice_id).unwrap();
            processor.add_sample(&part, 1.);
            pipeline
                .update(Coordinate::Pixel(0, 0), slice_id, &processor.pack_results(), 1)
                .unwrap();
        }
        pipeline.finalise().unwrap();
        let frame = pipeline.frame().unwrap();
        let expected = whole.to_xyz();
        let got = frame.means(Coordinate::Pixel(0, 0)).unwrap();
        for c in 0..3 {
            assert_abs_diff_eq!(got[c], expected[c], epsilon = 1e-9);
        }
    }
}
