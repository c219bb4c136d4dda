// Bands - the three frequency bands shared by every front-end
//
// A front-end turns samples into one energy value per band. The recognizer
// only ever reads those energies through `BandEnergies`, so the IIR filter
// bank and the FFT front-end are interchangeable.

use serde::{Deserialize, Serialize};

/// Frequency band tracked by a front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// High-pass band above ~500 Hz, the denominator of the snap ratio
    Reject,
    /// Band holding the dominant snap energy
    Snap,
    /// Bright (or transient) band above the snap band
    Bright,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Reject, Band::Snap, Band::Bright];

    pub(crate) const fn index(self) -> usize {
        match self {
            Band::Reject => 0,
            Band::Snap => 1,
            Band::Bright => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::Reject => "reject",
            Band::Snap => "snap",
            Band::Bright => "bright",
        }
    }
}

/// Read access to the current per-band energies
pub trait BandEnergies {
    fn band_energy(&self, band: Band) -> f64;

    /// Copy the three energies into a plain value
    fn snapshot(&self) -> BandSnapshot {
        BandSnapshot {
            reject: self.band_energy(Band::Reject),
            snap: self.band_energy(Band::Snap),
            bright: self.band_energy(Band::Bright),
        }
    }
}

/// Strategy that converts a stream of samples into band energies
///
/// Samples must be pushed in arrival order. After the last sample of a frame
/// has been pushed, `band_energy` reflects that whole frame.
pub trait BandFrontEnd: BandEnergies {
    /// Consume one sample (24-bit scale)
    fn process_sample(&mut self, sample: f64);

    /// Return every delay line and envelope to zero
    fn reset(&mut self);

    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;
}

/// Energies of all three bands at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandSnapshot {
    pub reject: f64,
    pub snap: f64,
    pub bright: f64,
}

impl BandSnapshot {
    pub fn new(reject: f64, snap: f64, bright: f64) -> Self {
        Self {
            reject,
            snap,
            bright,
        }
    }
}

impl BandEnergies for BandSnapshot {
    fn band_energy(&self, band: Band) -> f64 {
        match band {
            Band::Reject => self.reject,
            Band::Snap => self.snap,
            Band::Bright => self.bright,
        }
    }

    fn snapshot(&self) -> BandSnapshot {
        *self
    }
}
