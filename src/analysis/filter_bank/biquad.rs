// Biquad - second-order IIR section in Direct Form II
//
// Each section keeps two delay values (w[n-1], w[n-2]) of the intermediate
// signal and computes, per sample:
//
//   w = x - a1*w1 - a2*w2
//   y = b0*w + b1*w1 + b2*w2
//
// Coefficients are normalised so that a0 = 1.

/// Normalised coefficients of one second-order section
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    pub const fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self { b0, b1, b2, a1, a2 }
    }

    /// Pass-through section, used to pad cascades
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0, 0.0);

    /// Jury stability test for z² + a1·z + a2
    ///
    /// Both poles lie strictly inside the unit circle iff |a2| < 1 and
    /// |a1| < 1 + a2.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Magnitudes of the two poles, largest first
    pub fn pole_magnitudes(&self) -> [f64; 2] {
        let discriminant = self.a1 * self.a1 - 4.0 * self.a2;
        if discriminant < 0.0 {
            // Complex-conjugate pair: |p|² = a2
            let magnitude = self.a2.sqrt();
            [magnitude, magnitude]
        } else {
            let root = discriminant.sqrt();
            let p1 = ((-self.a1 + root) / 2.0).abs();
            let p2 = ((-self.a1 - root) / 2.0).abs();
            [p1.max(p2), p1.min(p2)]
        }
    }

    /// Magnitude response at `frequency_hz` for the given sample rate
    pub fn magnitude_at(&self, frequency_hz: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * std::f64::consts::PI * frequency_hz / sample_rate;
        let (c1, s1) = (omega.cos(), omega.sin());
        let (c2, s2) = ((2.0 * omega).cos(), (2.0 * omega).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// One Direct-Form-II section with its delay line
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    coefficients: BiquadCoefficients,
    w1: f64,
    w2: f64,
}

impl Biquad {
    pub fn new(coefficients: BiquadCoefficients) -> Self {
        Self {
            coefficients,
            w1: 0.0,
            w2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coefficients;
        let w = input - c.a1 * self.w1 - c.a2 * self.w2;
        let output = c.b0 * w + c.b1 * self.w1 + c.b2 * self.w2;

        self.w2 = self.w1;
        self.w1 = w;

        output
    }

    pub fn reset(&mut self) {
        self.w1 = 0.0;
        self.w2 = 0.0;
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }

    /// Current delay line (w[n-1], w[n-2])
    pub fn state(&self) -> (f64, f64) {
        (self.w1, self.w2)
    }
}
