// Spectral front-end - FFT band powers, computed once per frame
//
// Alternative to the IIR filter bank behind the same `BandFrontEnd` contract.
// Samples are collected until a full frame is buffered; the frame is then
// Hann-windowed and transformed, and every band energy is replaced by the
// power summed over that band's bins.
//
// Power normalisation: P = 2 / (N * Σw²) * Σ|X_k|², so a sinusoid of
// amplitude A filling the frame reads A²/2, the same mean-square scale the
// envelope followers produce.
//
// The FFT plan, window and scratch space are allocated at construction; the
// per-sample path never allocates.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::analysis::bands::{Band, BandEnergies, BandFrontEnd};
use crate::config::{FRAME_SIZE, REJECT_FREQ_HZ, SAMPLE_RATE, SNAP_FREQ_HIGH_HZ, SNAP_FREQ_LOW_HZ};

/// Band powers plus spectral shape descriptors of the last complete frame
pub struct SpectralFrontEnd {
    sample_rate: u32,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    window_power: f64,
    frame: Vec<f64>,
    filled: usize,
    spectrum: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    energies: [f64; 3],
    centroid_hz: f64,
    concentration: f64,
}

impl std::fmt::Debug for SpectralFrontEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralFrontEnd")
            .field("sample_rate", &self.sample_rate)
            .field("frame_size", &self.window.len())
            .field("filled", &self.filled)
            .field("energies", &self.energies)
            .finish()
    }
}

impl Default for SpectralFrontEnd {
    fn default() -> Self {
        Self::new(SAMPLE_RATE, FRAME_SIZE)
    }
}

impl SpectralFrontEnd {
    /// Create a front-end transforming frames of `frame_size` samples
    pub fn new(sample_rate: u32, frame_size: usize) -> Self {
        let frame_size = frame_size.max(2);
        let fft = FftPlanner::<f64>::new().plan_fft_forward(frame_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        // Pre-compute Hann window to reduce spectral leakage
        let window: Vec<f64> = (0..frame_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f64::consts::PI * i as f64) / (frame_size as f64 - 1.0)).cos())
            })
            .collect();
        let window_power = window.iter().map(|w| w * w).sum();

        Self {
            sample_rate,
            fft,
            window,
            window_power,
            frame: vec![0.0; frame_size],
            filled: 0,
            spectrum: vec![Complex::new(0.0, 0.0); frame_size],
            scratch,
            energies: [0.0; 3],
            centroid_hz: 0.0,
            concentration: 0.0,
        }
    }

    /// Power-weighted mean frequency of the last frame (Hz)
    pub fn centroid_hz(&self) -> f64 {
        self.centroid_hz
    }

    /// Share of the last frame's power inside the snap band (0..=1)
    pub fn concentration(&self) -> f64 {
        self.concentration
    }

    pub fn frame_size(&self) -> usize {
        self.window.len()
    }

    fn analyze_frame(&mut self) {
        for ((bin, &sample), &w) in self.spectrum.iter_mut().zip(&self.frame).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let n = self.window.len();
        let scale = 2.0 / (n as f64 * self.window_power);
        let bin_width = self.sample_rate as f64 / n as f64;

        let mut energies = [0.0; 3];
        let mut total = 0.0;
        let mut weighted = 0.0;
        for (k, bin) in self.spectrum[..n / 2 + 1].iter().enumerate() {
            let freq = k as f64 * bin_width;
            let power = bin.norm_sqr() * scale;
            total += power;
            weighted += freq * power;
            if freq >= REJECT_FREQ_HZ {
                energies[Band::Reject.index()] += power;
            }
            if (SNAP_FREQ_LOW_HZ..SNAP_FREQ_HIGH_HZ).contains(&freq) {
                energies[Band::Snap.index()] += power;
            }
            if freq >= SNAP_FREQ_HIGH_HZ {
                energies[Band::Bright.index()] += power;
            }
        }

        self.energies = energies;
        if total > 0.0 {
            self.centroid_hz = weighted / total;
            self.concentration = energies[Band::Snap.index()] / total;
        } else {
            self.centroid_hz = 0.0;
            self.concentration = 0.0;
        }
    }
}

impl BandEnergies for SpectralFrontEnd {
    fn band_energy(&self, band: Band) -> f64 {
        self.energies[band.index()]
    }
}

impl BandFrontEnd for SpectralFrontEnd {
    fn process_sample(&mut self, sample: f64) {
        self.frame[self.filled] = sample;
        self.filled += 1;
        if self.filled == self.frame.len() {
            self.filled = 0;
            self.analyze_frame();
        }
    }

    fn reset(&mut self) {
        self.frame.iter_mut().for_each(|x| *x = 0.0);
        self.filled = 0;
        self.energies = [0.0; 3];
        self.centroid_hz = 0.0;
        self.concentration = 0.0;
    }

    fn name(&self) -> &'static str {
        "spectral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn feed_tone(front_end: &mut SpectralFrontEnd, freq: f64, amplitude: f64) {
        for n in 0..front_end.frame_size() {
            let t = n as f64 / 16_000.0;
            front_end.process_sample(amplitude * (2.0 * PI * freq * t).sin());
        }
    }

    #[test]
    fn test_energies_update_only_on_full_frame() {
        let mut front_end = SpectralFrontEnd::default();
        for _ in 0..511 {
            front_end.process_sample(1_000.0);
        }
        assert_eq!(front_end.band_energy(Band::Reject), 0.0);
        front_end.process_sample(1_000.0);
        // DC lands below every band edge; leakage stays tiny
        assert!(front_end.band_energy(Band::Snap) < 1.0);
    }

    #[test]
    fn test_sinusoid_power_is_mean_square() {
        let mut front_end = SpectralFrontEnd::default();
        // 2000 Hz sits exactly on bin 64
        feed_tone(&mut front_end, 2_000.0, 1_000.0);
        let snap = front_end.band_energy(Band::Snap);
        assert!((snap - 500_000.0).abs() / 500_000.0 < 0.01, "snap {}", snap);
        assert!((front_end.band_energy(Band::Reject) - snap).abs() / snap < 0.01);
        assert!(front_end.band_energy(Band::Bright) < snap * 1e-6);
        assert!((front_end.centroid_hz() - 2_000.0).abs() < 50.0);
        assert!(front_end.concentration() > 0.99);
    }

    #[test]
    fn test_bright_tone() {
        let mut front_end = SpectralFrontEnd::default();
        feed_tone(&mut front_end, 7_000.0, 1_000.0);
        assert!(front_end.band_energy(Band::Bright) > 400_000.0);
        assert!(front_end.band_energy(Band::Snap) < 1_000.0);
        assert!(front_end.concentration() < 0.01);
    }

    #[test]
    fn test_rumble_outside_all_bands() {
        let mut front_end = SpectralFrontEnd::default();
        feed_tone(&mut front_end, 125.0, 1_000.0);
        assert!(front_end.band_energy(Band::Reject) < 1_000.0);
        assert!(front_end.centroid_hz() < 300.0);
    }

    #[test]
    fn test_reset() {
        let mut front_end = SpectralFrontEnd::default();
        feed_tone(&mut front_end, 2_000.0, 1_000.0);
        for _ in 0..100 {
            front_end.process_sample(5.0);
        }
        front_end.reset();
        for band in Band::ALL {
            assert_eq!(front_end.band_energy(band), 0.0);
        }
        assert_eq!(front_end.centroid_hz(), 0.0);
        assert_eq!(front_end.name(), "spectral");
    }
}
