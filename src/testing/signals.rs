//! Deterministic synthetic signals on the 24-bit sample scale.
//!
//! Each generator adds its waveform into a shared `f64` buffer so events can
//! overlap; `Timeline` places them at millisecond offsets and rounds the sum
//! to integer samples at the end.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;

use crate::config::{SAMPLE_FULL_SCALE, SAMPLE_RATE};

/// Shape of a synthetic finger snap: a decaying 2 kHz + 6 kHz tone pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapShape {
    pub amplitude: f64,
    pub decay_ms: f64,
    pub duration_ms: f64,
}

impl Default for SnapShape {
    fn default() -> Self {
        Self {
            amplitude: 400_000.0,
            decay_ms: 6.0,
            duration_ms: 60.0,
        }
    }
}

fn sample_index(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0) as usize
}

/// Add `count` samples of `f(t)` starting at `onset_ms`, `t` in seconds from the onset
fn add_waveform<F>(buffer: &mut [f64], sample_rate: u32, onset_ms: f64, duration_ms: f64, f: F)
where
    F: Fn(f64, usize) -> f64,
{
    let start = sample_index(onset_ms, sample_rate);
    let count = sample_index(duration_ms, sample_rate);
    for (i, slot) in buffer.iter_mut().skip(start).take(count).enumerate() {
        let t = i as f64 / sample_rate as f64;
        *slot += f(t, start + i);
    }
}

/// Sharp onset, exponential decay, energy around 2 kHz with a 6 kHz partial
pub fn snap_burst(buffer: &mut [f64], sample_rate: u32, onset_ms: f64, shape: SnapShape) {
    add_waveform(buffer, sample_rate, onset_ms, shape.duration_ms, |t, _| {
        let envelope = shape.amplitude * (-t * 1000.0 / shape.decay_ms).exp();
        envelope * ((2.0 * PI * 2_000.0 * t).sin() + 0.8 * (2.0 * PI * 6_000.0 * t + 0.3).sin())
    });
}

/// Same spectrum as a snap but constant amplitude (running water)
pub fn sustained_hiss(
    buffer: &mut [f64],
    sample_rate: u32,
    onset_ms: f64,
    duration_ms: f64,
    amplitude: f64,
) {
    add_waveform(buffer, sample_rate, onset_ms, duration_ms, |_, n| {
        let t = n as f64 / sample_rate as f64;
        amplitude * ((2.0 * PI * 2_000.0 * t).sin() + 0.8 * (2.0 * PI * 6_000.0 * t + 0.3).sin())
    });
}

/// Loud 120 Hz decaying thump (door slam)
pub fn thump(buffer: &mut [f64], sample_rate: u32, onset_ms: f64, amplitude: f64) {
    add_waveform(buffer, sample_rate, onset_ms, 300.0, |t, _| {
        amplitude * (-t * 1000.0 / 40.0).exp() * (2.0 * PI * 120.0 * t).sin()
    });
}

/// Harmonic series on a 250 Hz fundamental with 1/h weighting
pub fn voice(buffer: &mut [f64], sample_rate: u32, onset_ms: f64, duration_ms: f64, amplitude: f64) {
    add_waveform(buffer, sample_rate, onset_ms, duration_ms, |t, _| {
        amplitude
            * (1..=8)
                .map(|h| (2.0 * PI * 250.0 * h as f64 * t).sin() / h as f64)
                .sum::<f64>()
    });
}

/// Uniform white noise in [-amplitude, amplitude], seeded
pub fn white_noise(buffer: &mut [f64], amplitude: f64, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for slot in buffer.iter_mut() {
        *slot += rng.gen_range(-amplitude..=amplitude);
    }
}

/// Builder placing synthetic events on a millisecond timeline
#[derive(Debug, Clone)]
pub struct Timeline {
    sample_rate: u32,
    buffer: Vec<f64>,
}

impl Timeline {
    /// Silent timeline of `duration_ms` at the detector sample rate
    pub fn new(duration_ms: u64) -> Self {
        Self::with_sample_rate(duration_ms, SAMPLE_RATE)
    }

    pub fn with_sample_rate(duration_ms: u64, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            buffer: vec![0.0; sample_index(duration_ms as f64, sample_rate)],
        }
    }

    pub fn snap(self, onset_ms: u64) -> Self {
        self.snap_with(onset_ms, SnapShape::default())
    }

    pub fn snap_with(mut self, onset_ms: u64, shape: SnapShape) -> Self {
        snap_burst(&mut self.buffer, self.sample_rate, onset_ms as f64, shape);
        self
    }

    pub fn snaps(self, onsets_ms: &[u64]) -> Self {
        onsets_ms.iter().fold(self, |timeline, &onset| timeline.snap(onset))
    }

    pub fn hiss(mut self, onset_ms: u64, duration_ms: u64) -> Self {
        sustained_hiss(
            &mut self.buffer,
            self.sample_rate,
            onset_ms as f64,
            duration_ms as f64,
            300_000.0,
        );
        self
    }

    pub fn thump(mut self, onset_ms: u64) -> Self {
        thump(&mut self.buffer, self.sample_rate, onset_ms as f64, 3_000_000.0);
        self
    }

    pub fn voice(mut self, onset_ms: u64, duration_ms: u64) -> Self {
        voice(
            &mut self.buffer,
            self.sample_rate,
            onset_ms as f64,
            duration_ms as f64,
            500_000.0,
        );
        self
    }

    pub fn noise(mut self, amplitude: f64, seed: u64) -> Self {
        white_noise(&mut self.buffer, amplitude, seed);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_ms(&self) -> u64 {
        self.buffer.len() as u64 * 1000 / self.sample_rate as u64
    }

    /// Rounded integer samples, clipped to the 24-bit range
    pub fn samples(&self) -> Vec<i32> {
        self.buffer
            .iter()
            .map(|x| x.round().clamp(-SAMPLE_FULL_SCALE, SAMPLE_FULL_SCALE) as i32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_length() {
        let timeline = Timeline::new(1_000);
        assert_eq!(timeline.samples().len(), 16_000);
        assert_eq!(timeline.duration_ms(), 1_000);
        assert!(timeline.samples().iter().all(|&x| x == 0));
    }

    #[test]
    fn test_snap_starts_at_onset_and_decays() {
        let samples = Timeline::new(200).snap(100).samples();
        assert!(samples[..1_600].iter().all(|&x| x == 0));
        let early = samples[1_600..1_616].iter().map(|x| x.abs()).max().unwrap();
        let late = samples[2_400..2_416].iter().map(|x| x.abs()).max().unwrap();
        assert!(early > 200_000);
        assert!(late < 1_000);
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        let a = Timeline::new(100).noise(1_000.0, 7).samples();
        let b = Timeline::new(100).noise(1_000.0, 7).samples();
        assert_eq!(a, b);
        assert!(a.iter().all(|x| x.abs() <= 1_000));
        assert!(a.iter().any(|&x| x != 0));
    }

    #[test]
    fn test_samples_clip_to_24_bit() {
        let samples = Timeline::new(10).noise(1.0e9, 1).samples();
        assert!(samples.iter().all(|x| x.abs() <= 8_388_607));
    }
}
