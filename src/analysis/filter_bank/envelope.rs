// Envelope follower - asymmetric exponential moving average of squared samples
//
// energy = alpha * x² + (1 - alpha) * energy
//
// alpha is the attack coefficient while x² exceeds the current envelope and
// the release coefficient otherwise, so sharp onsets register immediately
// while the decay is smoothed.

/// Fast attack coefficient (~5 ms)
pub const EMA_ATTACK_ALPHA: f64 = 0.3;
/// Slower release coefficient (~20 ms)
pub const EMA_RELEASE_ALPHA: f64 = 0.1;

/// Energy envelope with separate attack and release smoothing
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFollower {
    attack: f64,
    release: f64,
    energy: f64,
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self::new(EMA_ATTACK_ALPHA, EMA_RELEASE_ALPHA)
    }
}

impl EnvelopeFollower {
    /// Create a follower; both coefficients must lie in (0, 1]
    pub fn new(attack: f64, release: f64) -> Self {
        debug_assert!(attack > 0.0 && attack <= 1.0);
        debug_assert!(release > 0.0 && release <= 1.0);
        Self {
            attack,
            release,
            energy: 0.0,
        }
    }

    #[inline]
    pub fn update(&mut self, sample: f64) -> f64 {
        let sample_energy = sample * sample;
        let alpha = if sample_energy > self.energy {
            self.attack
        } else {
            self.release
        };
        self.energy = alpha * sample_energy + (1.0 - alpha) * self.energy;
        self.energy
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn reset(&mut self) {
        self.energy = 0.0;
    }
}
