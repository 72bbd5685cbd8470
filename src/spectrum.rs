//! Sampled spectra.

use super::cie;
use std::ops::{AddAssign, Index, IndexMut, MulAssign};

/// Spectral radiance sampled in `bins` equal-width bins spanning
/// `[min_wavelength, max_wavelength]` (nanometres).
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    min_wavelength: f64,
    max_wavelength: f64,
    samples: Vec<f64>,
}

impl Spectrum {
    /// Makes a zero-filled spectrum.
    pub fn new(min_wavelength: f64, max_wavelength: f64, bins: usize) -> Spectrum {
        Spectrum {
            min_wavelength,
            max_wavelength,
            samples: vec![0.; bins],
        }
    }

    /// Makes a spectrum with the same wavelength configuration as `self`,
    /// zero-filled.
    pub fn zeroed_like(&self) -> Spectrum {
        Spectrum::new(self.min_wavelength, self.max_wavelength, self.bins())
    }

    pub fn min_wavelength(&self) -> f64 {
        self.min_wavelength
    }

    pub fn max_wavelength(&self) -> f64 {
        self.max_wavelength
    }

    pub fn bins(&self) -> usize {
        self.samples.len()
    }

    pub fn delta_wavelength(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.;
        }
        (self.max_wavelength - self.min_wavelength) / self.samples.len() as f64
    }

    /// Centre wavelength of bin `i`.
    pub fn wavelength(&self, i: usize) -> f64 {
        self.min_wavelength + (i as f64 + 0.5) * self.delta_wavelength()
    }

    pub fn wavelengths(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.bins()).map(move |i| self.wavelength(i))
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f64] {
        &mut self.samples
    }

    pub fn is_zero(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.)
    }

    /// Spectrum integrated over its wavelength range.
    pub fn total(&self) -> f64 {
        self.samples.iter().sum::<f64>() * self.delta_wavelength()
    }

    /// Whether both spectra describe the same bins.
    pub fn is_compatible(&self, other: &Spectrum) -> bool {
        self.min_wavelength == other.min_wavelength
            && self.max_wavelength == other.max_wavelength
            && self.bins() == other.bins()
    }

    pub fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.);
    }

    /// CIE XYZ tristimulus values of the spectrum, matching functions
    /// evaluated at bin centres.
    pub fn to_xyz(&self) -> [f64; 3] {
        let delta = self.delta_wavelength();
        let mut xyz = [0.; 3];
        for (lambda, s) in self.wavelengths().zip(self.samples.iter()) {
            let bar = cie::xyz_bar(lambda);
            for c in 0..3 {
                xyz[c] += s * bar[c] * delta;
            }
        }
        xyz
    }
}

impl Index<usize> for Spectrum {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.samples[i]
    }
}

impl IndexMut<usize> for Spectrum {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.samples[i]
    }
}

impl AddAssign<&Spectrum> for Spectrum {
    /// Panics when the spectra are not compatible.
    fn add_assign(&mut self, rhs: &Spectrum) {
        assert!(
            self.bins() == rhs.bins(),
            "adding spectra with {} and {} bins",
            self.bins(),
            rhs.bins()
        );
        for (a, b) in self.samples.iter_mut().zip(rhs.samples.iter()) {
            *a += b;
        }
    }
}

impl MulAssign<f64> for Spectrum {
    fn mul_assign(&mut self, rhs: f64) {
        self.samples.iter_mut().for_each(|s| *s *= rhs);
    }
}
