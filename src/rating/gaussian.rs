//! Gaussian primitives used by the skill update
//!
//! `norm_cdf` uses Hart's double precision rational approximation
//! (algorithm 5666, in the form published by G. West, "Better approximations
//! to cumulative normal functions", 2005). For |x| < 7.0710678 it evaluates
//! `exp(-x²/2) · P(|x|) / Q(|x|)` with degree 6/7 polynomials; beyond that a
//! five-term continued fraction of the Mills ratio is used, and the tail is
//! clamped to 0 past |x| = 37. The absolute error is below 1e-14 over the
//! whole real line, far inside the 1e-7 the rating update needs.

use std::f64::consts::PI;

/// Denominators below this are treated as numerically zero
pub const DEGENERATE_CDF: f64 = 1e-10;

const HART_SWITCH: f64 = 7.071_067_811_865_47;
const HART_TAIL: f64 = 37.0;
const SQRT_TWO_PI: f64 = 2.506_628_274_631;

/// Standard normal cumulative distribution function
pub fn norm_cdf(x: f64) -> f64 {
    let x_abs = x.abs();

    let tail = if x_abs > HART_TAIL {
        0.0
    } else {
        let exponential = (-x_abs * x_abs / 2.0).exp();
        if x_abs < HART_SWITCH {
            let mut numerator = 3.526_249_659_989_11e-2 * x_abs + 0.700_383_064_443_688;
            numerator = numerator * x_abs + 6.373_962_203_531_65;
            numerator = numerator * x_abs + 33.912_866_078_383;
            numerator = numerator * x_abs + 112.079_291_497_871;
            numerator = numerator * x_abs + 221.213_596_169_931;
            numerator = numerator * x_abs + 220.206_867_912_376;

            let mut denominator = 8.838_834_764_831_84e-2 * x_abs + 1.755_667_163_182_64;
            denominator = denominator * x_abs + 16.064_177_579_207;
            denominator = denominator * x_abs + 86.780_732_202_946_1;
            denominator = denominator * x_abs + 296.564_248_779_674;
            denominator = denominator * x_abs + 637.333_633_378_831;
            denominator = denominator * x_abs + 793.826_512_519_948;
            denominator = denominator * x_abs + 440.413_735_824_752;

            exponential * numerator / denominator
        } else {
            let mut fraction = x_abs + 0.65;
            fraction = x_abs + 4.0 / fraction;
            fraction = x_abs + 3.0 / fraction;
            fraction = x_abs + 2.0 / fraction;
            fraction = x_abs + 1.0 / fraction;
            exponential / fraction / SQRT_TWO_PI
        }
    };

    if x > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Standard normal probability density function
pub fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * PI).sqrt()
}

/// Mean additive correction of a Gaussian truncated below at `epsilon`
///
/// When the denominator vanishes the asymptote `-(t - epsilon)` is returned.
pub fn v(t: f64, epsilon: f64) -> f64 {
    let x = t - epsilon;
    let denominator = norm_cdf(x);
    if denominator < DEGENERATE_CDF {
        return -x;
    }
    norm_pdf(x) / denominator
}

/// Variance multiplicative correction of a Gaussian truncated below at `epsilon`
///
/// Falls back to its limits (1 far in the losing tail, 0 otherwise) when the
/// denominator vanishes.
pub fn w(t: f64, epsilon: f64) -> f64 {
    let x = t - epsilon;
    let denominator = norm_cdf(x);
    if denominator < DEGENERATE_CDF {
        return if x < 0.0 { 1.0 } else { 0.0 };
    }
    let v = v(t, epsilon);
    (v * (v + x)).clamp(0.0, 1.0)
}
