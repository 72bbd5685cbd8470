//! CIE 1931 2° colour matching functions.
//!
//! Uses the multi-lobe piecewise Gaussian fit of Wyman, Sloan and Shirley,
//! "Simple Analytic Approximations to the CIE XYZ Color Matching Functions"
//! (JCGT 2013), which stays within a few percent of the tabulated curves and
//! avoids shipping the 1 nm tables.

#[inline]
fn lobe(lambda: f64, mu: f64, sigma_lo: f64, sigma_hi: f64) -> f64 {
    let sigma = if lambda < mu { sigma_lo } else { sigma_hi };
    let t = (lambda - mu) / sigma;
    (-0.5 * t * t).exp()
}

/// x̄(λ), λ in nanometres.
pub fn x_bar(lambda: f64) -> f64 {
    1.056 * lobe(lambda, 599.8, 37.9, 31.0) + 0.362 * lobe(lambda, 442.0, 16.0, 26.7)
        - 0.065 * lobe(lambda, 501.1, 20.4, 26.2)
}

/// ȳ(λ), λ in nanometres.
pub fn y_bar(lambda: f64) -> f64 {
    0.821 * lobe(lambda, 568.8, 46.9, 40.5) + 0.286 * lobe(lambda, 530.9, 16.3, 31.1)
}

/// z̄(λ), λ in nanometres.
pub fn z_bar(lambda: f64) -> f64 {
    1.217 * lobe(lambda, 437.0, 11.8, 36.0) + 0.681 * lobe(lambda, 459.0, 26.0, 13.8)
}

/// The three matching functions sampled at `lambda`.
#[inline]
pub fn xyz_bar(lambda: f64) -> [f64; 3] {
    [x_bar(lambda), y_bar(lambda), z_bar(lambda)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn luminance_peaks_near_555nm() {
        assert_abs_diff_eq!(y_bar(555.), 1.0, epsilon = 0.03);
        assert!(y_bar(555.) > y_bar(450.));
        assert!(y_bar(555.) > y_bar(650.));
    }

    #[test]
    fn curves_vanish_outside_the_visible_range() {
        for lambda in [250., 900.] {
            let [x, y, z] = xyz_bar(lambda);
            assert!(x.abs() < 1e-3 && y < 1e-3 && z < 1e-3);
        }
    }
}
