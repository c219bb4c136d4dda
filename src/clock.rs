// Clocks - monotonic millisecond time sources for the detector
//
// The recognizer never reads time itself; the frame loop passes a timestamp
// with every frame. Live capture uses wall-clock monotonic time, offline
// analysis derives time from the number of samples consumed.

use std::time::Instant;

/// Monotonic millisecond time source
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wraps `Instant`, counting from construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Sample-count clock: the timestamp of a frame is the time of its last sample
///
/// Time is kept in samples so that frame durations that are not whole
/// milliseconds do not accumulate rounding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    sample_rate: u32,
    samples: u64,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            samples: 0,
        }
    }

    /// Account for `frame_len` more samples and return the new time
    pub fn advance(&mut self, frame_len: usize) -> u64 {
        self.samples += frame_len as u64;
        self.now_ms()
    }

    /// Account for samples that were lost before reaching the detector
    pub fn skip(&mut self, samples: u64) {
        self.samples += samples;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn reset(&mut self) {
        self.samples = 0;
    }
}

impl Clock for FrameClock {
    fn now_ms(&self) -> u64 {
        self.samples * 1000 / self.sample_rate as u64
    }
}
