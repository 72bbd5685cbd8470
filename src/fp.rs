//! Provides floating point utilities.

use super::types::Point2d;

/// MACHINE_EPSILON is the numerical analysis definition of machine epsilon,
/// where it is interchangeble with unit roundoff. Rust's built-in EPSILON
/// constant is twice the unit roundoff. This constant matches pbrt.
///
/// See https://en.wikipedia.org/wiki/Machine_epsilon and
/// http://www.pbr-book.org/3ed-2018/Shapes/Managing_Rounding_Error.html#x1-ArithmeticOperations.
pub const MACHINE_EPSILON: f64 = f64::EPSILON * 0.5_f64;

/// gamma_eb computes a tight bound for products of (1 +/- machine epislon)
/// error terms. See http://www.pbr-book.org/3ed-2018/Shapes/Managing_Rounding_Error.html#x1-ErrorPropagation.
#[inline]
pub fn gamma_eb(n: i32) -> f64 {
    let n = n as f64;
    (n * MACHINE_EPSILON) / (1_f64 - n * MACHINE_EPSILON)
}

/// Twice the signed area of the 2D triangle (a, b, c) together with a bound
/// on the rounding error of that value. The area is indistinguishable from
/// zero when its magnitude does not exceed the bound.
pub fn signed_area2_with_error(a: Point2d, b: Point2d, c: Point2d) -> (f64, f64) {
    let l = (b.x - a.x) * (c.y - a.y);
    let r = (b.y - a.y) * (c.x - a.x);
    (l - r, gamma_eb(3) * (l.abs() + r.abs()))
}
