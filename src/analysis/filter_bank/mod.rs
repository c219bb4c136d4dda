// Filter bank - IIR front-end
//
// Every band is a short cascade of biquad sections followed by an asymmetric
// envelope follower. One call to `process_sample` pushes a sample through all
// three bands; state is fixed-size and nothing allocates after construction.
//
// Algorithm:
// 1. For each band, run the sample through its cascaded sections in order
// 2. Square the band output and update that band's envelope
// 3. `band_energy` reads the envelope directly (O(1))

pub mod biquad;
pub mod coefficients;
pub mod design;
pub mod envelope;

use crate::analysis::bands::{Band, BandEnergies, BandFrontEnd};
use crate::config::FilterTuning;

use biquad::{Biquad, BiquadCoefficients};
use coefficients::FilterBankTable;
use envelope::EnvelopeFollower;

/// Longest cascade any band uses
pub const MAX_STAGES: usize = 2;

/// One band: cascaded sections plus its envelope
#[derive(Debug, Clone, Copy)]
struct BandFilter {
    stages: [Biquad; MAX_STAGES],
    stage_count: usize,
    envelope: EnvelopeFollower,
}

impl BandFilter {
    fn new(sections: &[BiquadCoefficients]) -> Self {
        debug_assert!(!sections.is_empty() && sections.len() <= MAX_STAGES);
        let mut stages = [Biquad::new(BiquadCoefficients::IDENTITY); MAX_STAGES];
        let stage_count = sections.len().min(MAX_STAGES);
        for (stage, coefficients) in stages.iter_mut().zip(sections) {
            *stage = Biquad::new(*coefficients);
        }
        Self {
            stages,
            stage_count,
            envelope: EnvelopeFollower::default(),
        }
    }

    #[inline]
    fn process(&mut self, sample: f64) {
        let mut y = sample;
        for stage in &mut self.stages[..self.stage_count] {
            y = stage.process(y);
        }
        self.envelope.update(y);
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.envelope.reset();
    }
}

/// Biquad filter bank with one envelope per band
#[derive(Debug, Clone)]
pub struct FilterBank {
    table: &'static FilterBankTable,
    bands: [BandFilter; 3],
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new(FilterTuning::default())
    }
}

impl FilterBank {
    /// Create a zeroed filter bank for a tuning generation
    pub fn new(tuning: FilterTuning) -> Self {
        Self::with_table(tuning.table())
    }

    /// Create a zeroed filter bank from an explicit coefficient table
    pub fn with_table(table: &'static FilterBankTable) -> Self {
        Self {
            table,
            bands: [
                BandFilter::new(table.reject),
                BandFilter::new(table.snap),
                BandFilter::new(table.bright),
            ],
        }
    }

    /// Zero all delay lines and envelopes
    pub fn init(&mut self) {
        for band in &mut self.bands {
            band.reset();
        }
    }

    pub fn table(&self) -> &'static FilterBankTable {
        self.table
    }

    /// Delay line of one section of a band, for inspection
    pub fn stage_state(&self, band: Band, stage: usize) -> Option<(f64, f64)> {
        let filter = &self.bands[band.index()];
        filter.stages[..filter.stage_count]
            .get(stage)
            .map(|section| section.state())
    }
}

impl BandEnergies for FilterBank {
    #[inline]
    fn band_energy(&self, band: Band) -> f64 {
        self.bands[band.index()].envelope.energy()
    }
}

impl BandFrontEnd for FilterBank {
    #[inline]
    fn process_sample(&mut self, sample: f64) {
        for band in &mut self.bands {
            band.process(sample);
        }
    }

    fn reset(&mut self) {
        self.init();
    }

    fn name(&self) -> &'static str {
        self.table.name
    }
}
