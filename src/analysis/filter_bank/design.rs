// Design - offline second-order section design
//
// Reproduces the Butterworth sections behind the shipped coefficient tables
// using the bilinear transform with frequency pre-warping. A second-order
// Butterworth section has Q = 1/sqrt(2), which makes the bilinear design
// identical to the classic cookbook formulas below.
//
// The detector never designs filters at runtime; this module exists so the
// tables can be regenerated, printed and checked for stability.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use super::biquad::BiquadCoefficients;

/// Kind of second-order section to design
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionKind {
    /// Butterworth low-pass at the corner frequency
    LowPass { corner_hz: f64 },
    /// Butterworth high-pass at the corner frequency
    HighPass { corner_hz: f64 },
    /// Resonant band-pass with unity peak gain
    BandPass { center_hz: f64, q: f64 },
}

/// Design a normalised second-order section for `sample_rate`
///
/// Returns `None` when a frequency lies outside (0, Nyquist) or Q is not
/// positive.
pub fn design_section(kind: SectionKind, sample_rate: f64) -> Option<BiquadCoefficients> {
    let nyquist = sample_rate / 2.0;
    let (frequency, q) = match kind {
        SectionKind::LowPass { corner_hz } | SectionKind::HighPass { corner_hz } => {
            (corner_hz, FRAC_1_SQRT_2)
        }
        SectionKind::BandPass { center_hz, q } => (center_hz, q),
    };
    if !(frequency > 0.0 && frequency < nyquist) || q <= 0.0 {
        return None;
    }

    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_w = omega.cos();
    let alpha = omega.sin() / (2.0 * q);
    let a0 = 1.0 + alpha;

    let (b0, b1, b2) = match kind {
        SectionKind::LowPass { .. } => ((1.0 - cos_w) / 2.0, 1.0 - cos_w, (1.0 - cos_w) / 2.0),
        SectionKind::HighPass { .. } => ((1.0 + cos_w) / 2.0, -(1.0 + cos_w), (1.0 + cos_w) / 2.0),
        SectionKind::BandPass { .. } => (alpha, 0.0, -alpha),
    };

    Some(BiquadCoefficients::new(
        b0 / a0,
        b1 / a0,
        b2 / a0,
        -2.0 * cos_w / a0,
        (1.0 - alpha) / a0,
    ))
}
