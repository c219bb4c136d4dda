// Features - per-frame snap features
//
// Everything here is derived from the band energies after the last sample of
// a frame plus the frame's peak amplitude and RMS:
//
//   crest  = peak / rms                 (0 below the noise floor)
//   ratio  = snap / reject              (sentinel when reject ~ 0)
//   bright = bright / (snap + bright)
//   flux   = |snap - snap'| + |bright - bright'|
//   rise   = snap / mean(history)       (sentinel or 0 when history ~ 0)
//
// `FeatureTracker::update` also advances the energy history and the
// previous-frame energies. It must run on every frame, before any state
// machine shortcut, so the baseline never skips a frame.

use serde::{Deserialize, Serialize};

use crate::analysis::bands::BandSnapshot;
use crate::config::{
    OnsetCriteria, ENERGY_EPSILON, ENERGY_HISTORY_SIZE, HISTORY_FLOOR, RATIO_SENTINEL,
};

/// Peak and RMS of one frame on the 24-bit scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub peak_amplitude: i32,
    pub rms: f64,
}

impl FrameStats {
    pub fn new(peak_amplitude: i32, rms: f64) -> Self {
        Self {
            peak_amplitude,
            rms,
        }
    }

    /// Compute peak |x| and sqrt(mean x²) of a frame
    pub fn from_samples(samples: &[i32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut peak: u32 = 0;
        let mut sum_squares = 0.0;
        for &sample in samples {
            peak = peak.max(sample.unsigned_abs());
            let x = sample as f64;
            sum_squares += x * x;
        }
        Self {
            peak_amplitude: peak.min(i32::MAX as u32) as i32,
            rms: (sum_squares / samples.len() as f64).sqrt(),
        }
    }
}

/// Features derived for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub peak_amplitude: i32,
    pub rms: f64,
    pub crest_factor: f64,
    pub energies: BandSnapshot,
    pub snap_ratio: f64,
    pub bright_ratio: f64,
    pub spectral_flux: f64,
    pub rise_factor: f64,
}

impl FeatureVector {
    /// True when every enabled onset predicate passes
    pub fn is_onset(&self, criteria: &OnsetCriteria) -> bool {
        if let Some(min_peak) = criteria.min_peak_amplitude {
            if self.peak_amplitude <= min_peak {
                return false;
            }
        }
        if let Some(min_bright) = criteria.min_bright_ratio {
            if self.bright_ratio <= min_bright {
                return false;
            }
        }
        self.energies.snap > criteria.energy_threshold
            && self.snap_ratio > criteria.ratio_threshold
            && self.crest_factor > criteria.min_crest_factor
            && self.spectral_flux > criteria.flux_threshold
            && self.rise_factor > criteria.min_rise_factor
    }
}

/// Fixed-size ring of recent snap-band energies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyHistory {
    slots: [f64; ENERGY_HISTORY_SIZE],
    next: usize,
}

impl Default for EnergyHistory {
    fn default() -> Self {
        Self {
            slots: [0.0; ENERGY_HISTORY_SIZE],
            next: 0,
        }
    }
}

impl EnergyHistory {
    /// Overwrite the oldest slot
    pub fn push(&mut self, energy: f64) {
        self.slots[self.next] = energy;
        self.next = (self.next + 1) % ENERGY_HISTORY_SIZE;
    }

    /// Mean over all slots (empty slots count as zero)
    pub fn average(&self) -> f64 {
        self.slots.iter().sum::<f64>() / ENERGY_HISTORY_SIZE as f64
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn slots(&self) -> &[f64; ENERGY_HISTORY_SIZE] {
        &self.slots
    }
}

/// Frame-to-frame feature state: history ring and previous energies
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureTracker {
    history: EnergyHistory,
    prev_snap: f64,
    prev_bright: f64,
}

impl FeatureTracker {
    /// Derive this frame's features and advance the history
    pub fn update(
        &mut self,
        stats: FrameStats,
        energies: BandSnapshot,
        criteria: &OnsetCriteria,
    ) -> FeatureVector {
        let crest_factor = if stats.rms > criteria.noise_floor_rms {
            stats.peak_amplitude as f64 / stats.rms
        } else {
            0.0
        };

        let snap_ratio = if energies.reject > ENERGY_EPSILON {
            energies.snap / energies.reject
        } else {
            RATIO_SENTINEL
        };

        let total = energies.snap + energies.bright;
        let bright_ratio = if total > ENERGY_EPSILON {
            energies.bright / total
        } else {
            0.0
        };

        let spectral_flux =
            (energies.snap - self.prev_snap).abs() + (energies.bright - self.prev_bright).abs();

        let background = self.history.average();
        let rise_factor = if background > HISTORY_FLOOR {
            energies.snap / background
        } else if energies.snap > criteria.energy_threshold {
            RATIO_SENTINEL
        } else {
            0.0
        };

        self.history.push(energies.snap);
        self.prev_snap = energies.snap;
        self.prev_bright = energies.bright;

        FeatureVector {
            peak_amplitude: stats.peak_amplitude,
            rms: stats.rms,
            crest_factor,
            energies,
            snap_ratio,
            bright_ratio,
            spectral_flux,
            rise_factor,
        }
    }

    /// Forget the rise-factor baseline (after a confirmed snap)
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &EnergyHistory {
        &self.history
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
