//! Numerically stable log-domain primitives.

use std::f64::consts::PI;

const LOG_SQRT_2PI: f64 = 0.918_938_533_204_672_8; // 0.5 * ln(2*pi)
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)] // published numerical constants
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_93,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_59,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_571_6e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the Gamma function (log |Gamma(z)|).
///
/// Lanczos approximation, with reflection for z < 0.5.
pub fn log_gamma(z: f64) -> f64 {
    if z.is_nan() || z == f64::NEG_INFINITY {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return f64::INFINITY;
    }
    if z <= 0.0 {
        let z_round = z.round();
        if (z - z_round).abs() < 1e-15 {
            // Poles at non-positive integers.
            return f64::NAN;
        }
    }
    if z < 0.5 {
        let sin_pi = (PI * z).sin();
        if sin_pi == 0.0 {
            return f64::NAN;
        }
        return PI.ln() - sin_pi.abs().ln() - log_gamma(1.0 - z);
    }

    let z_minus = z - 1.0;
    let mut x = LANCZOS_COEFFS[0];
    for (i, coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        x += coeff / (z_minus + i as f64);
    }
    let t = z_minus + LANCZOS_G + 0.5;
    LOG_SQRT_2PI + (z_minus + 0.5) * t.ln() - t + x.ln()
}

/// Log of the Beta function: log B(a, b) = lgamma(a) + lgamma(b) - lgamma(a+b).
pub fn log_beta(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn log_gamma_matches_factorials() {
        // Gamma(n) = (n-1)!
        assert!((log_gamma(1.0) - 0.0).abs() < TOL);
        assert!((log_gamma(2.0) - 0.0).abs() < TOL);
        assert!((log_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-9);
        assert!((log_gamma(11.0) - 3_628_800.0_f64.ln()).abs() < 1e-8);
    }

    #[test]
    fn log_gamma_half() {
        // Gamma(0.5) = sqrt(pi)
        assert!((log_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-10);
    }

    #[test]
    fn log_gamma_rejects_poles() {
        assert!(log_gamma(0.0).is_nan());
        assert!(log_gamma(-1.0).is_nan());
        assert!(log_gamma(f64::NAN).is_nan());
    }

    #[test]
    fn log_beta_symmetry_and_known_values() {
        // B(1,1) = 1
        assert!((log_beta(1.0, 1.0) - 0.0).abs() < TOL);
        // B(2,3) = 1/12
        assert!((log_beta(2.0, 3.0) - (1.0_f64 / 12.0).ln()).abs() < 1e-9);
        assert!((log_beta(3.5, 1.25) - log_beta(1.25, 3.5)).abs() < TOL);
    }

    #[test]
    fn log_beta_rejects_nonpositive() {
        assert!(log_beta(0.0, 1.0).is_nan());
        assert!(log_beta(1.0, -2.0).is_nan());
    }
}
