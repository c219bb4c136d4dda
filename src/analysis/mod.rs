// Analysis module - double-snap detection pipeline
//
// Architecture:
// - Front-end: FilterBank (IIR, per sample) or SpectralFrontEnd (FFT, per frame)
// - GestureRecognizer: per-frame features + state machine
// - SnapDetector: owns one of each, validates frames and feeds them in order
// - Analysis thread: pops float frames from the buffer pool, runs the detector
//   and broadcasts SnapEvents over a tokio channel. Its clock counts delivered
//   and dropped samples, so detector time follows the capture device
//
// Frame contract: every sample of a frame reaches the front-end, in order,
// before the recognizer sees that frame. A rejected frame changes nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::PopError;
use serde::Serialize;

use crate::audio::buffer_pool::AnalysisChannels;
use crate::clock::FrameClock;
use crate::config::{DetectorConfig, FrontEndConfig, FRAME_SIZE, SAMPLE_FULL_SCALE, SAMPLE_RATE};
use crate::error::FrameError;
use crate::report::SnapEvent;

pub mod bands;
pub mod features;
pub mod filter_bank;
pub mod gesture;
pub mod spectral;

use bands::{Band, BandEnergies, BandFrontEnd};
use features::{FeatureVector, FrameStats};
use filter_bank::FilterBank;
use gesture::{DoubleSnapListener, GestureRecognizer, SnapResult};
use spectral::SpectralFrontEnd;

/// Front-end selected at runtime from `FrontEndConfig`
#[derive(Debug)]
pub enum FrontEnd {
    Iir(FilterBank),
    Spectral(SpectralFrontEnd),
}

impl FrontEnd {
    pub fn from_config(config: &FrontEndConfig, sample_rate: u32, frame_size: usize) -> Self {
        match config {
            FrontEndConfig::Iir { tuning } => FrontEnd::Iir(FilterBank::new(*tuning)),
            FrontEndConfig::Spectral => {
                FrontEnd::Spectral(SpectralFrontEnd::new(sample_rate, frame_size))
            }
        }
    }
}

impl BandEnergies for FrontEnd {
    fn band_energy(&self, band: Band) -> f64 {
        match self {
            FrontEnd::Iir(bank) => bank.band_energy(band),
            FrontEnd::Spectral(spectral) => spectral.band_energy(band),
        }
    }
}

impl BandFrontEnd for FrontEnd {
    #[inline]
    fn process_sample(&mut self, sample: f64) {
        match self {
            FrontEnd::Iir(bank) => bank.process_sample(sample),
            FrontEnd::Spectral(spectral) => spectral.process_sample(sample),
        }
    }

    fn reset(&mut self) {
        match self {
            FrontEnd::Iir(bank) => bank.reset(),
            FrontEnd::Spectral(spectral) => spectral.reset(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FrontEnd::Iir(bank) => bank.name(),
            FrontEnd::Spectral(spectral) => spectral.name(),
        }
    }
}

/// Running totals kept by a detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectorStats {
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub first_snaps: u64,
    pub double_snaps: u64,
}

/// Front-end plus recognizer behind one per-frame call
#[derive(Debug)]
pub struct SnapDetector<F: BandFrontEnd = FrontEnd> {
    front_end: F,
    recognizer: GestureRecognizer,
    frame_size: usize,
    sample_rate: u32,
    stats: DetectorStats,
    converted: Vec<i32>,
}

impl SnapDetector<FrontEnd> {
    /// Build the detector described by `config`
    pub fn from_config(config: &DetectorConfig, sample_rate: u32, frame_size: usize) -> Self {
        let front_end = FrontEnd::from_config(&config.front_end, sample_rate, frame_size);
        let mut detector = Self::with_front_end(front_end, config);
        detector.frame_size = frame_size;
        detector.sample_rate = sample_rate;
        detector
    }
}

impl Default for SnapDetector<FrontEnd> {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default(), SAMPLE_RATE, FRAME_SIZE)
    }
}

impl<F: BandFrontEnd> SnapDetector<F> {
    /// Wrap an explicit front-end (default frame layout)
    pub fn with_front_end(front_end: F, config: &DetectorConfig) -> Self {
        Self {
            front_end,
            recognizer: GestureRecognizer::new(config),
            frame_size: FRAME_SIZE,
            sample_rate: SAMPLE_RATE,
            stats: DetectorStats::default(),
            converted: Vec::with_capacity(FRAME_SIZE),
        }
    }

    pub fn register_listener(&mut self, listener: Box<dyn DoubleSnapListener + Send>) {
        self.recognizer.register_listener(listener);
    }

    /// Process one frame of 24-bit samples
    ///
    /// # Arguments
    /// * `samples` - Exactly `frame_size` samples in arrival order
    /// * `now_ms` - Monotonic timestamp of the frame
    ///
    /// # Returns
    /// The recognizer result, or `FrameError` if the frame was rejected
    pub fn process_frame(&mut self, samples: &[i32], now_ms: u64) -> Result<SnapResult, FrameError> {
        if samples.len() != self.frame_size {
            return Err(self.reject_frame(FrameError::LengthMismatch {
                expected: self.frame_size,
                actual: samples.len(),
            }));
        }
        Ok(self.run_frame(samples, now_ms))
    }

    /// Process one frame captured at `sample_rate`
    pub fn process_frame_at(
        &mut self,
        samples: &[i32],
        sample_rate: u32,
        now_ms: u64,
    ) -> Result<SnapResult, FrameError> {
        if sample_rate != self.sample_rate {
            return Err(self.reject_frame(FrameError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: sample_rate,
            }));
        }
        self.process_frame(samples, now_ms)
    }

    /// Process one frame of normalised float samples in [-1.0, 1.0]
    ///
    /// The whole frame is validated before any state is touched.
    pub fn process_frame_f32(&mut self, samples: &[f32], now_ms: u64) -> Result<SnapResult, FrameError> {
        if samples.len() != self.frame_size {
            return Err(self.reject_frame(FrameError::LengthMismatch {
                expected: self.frame_size,
                actual: samples.len(),
            }));
        }
        if let Some(index) = samples.iter().position(|x| !x.is_finite()) {
            return Err(self.reject_frame(FrameError::NonFiniteSample { index }));
        }

        let mut converted = std::mem::take(&mut self.converted);
        converted.clear();
        converted.extend(samples.iter().map(|&x| f32_to_sample(x)));
        let result = self.run_frame(&converted, now_ms);
        self.converted = converted;
        Ok(result)
    }

    fn run_frame(&mut self, samples: &[i32], now_ms: u64) -> SnapResult {
        for &sample in samples {
            self.front_end.process_sample(sample as f64);
        }
        let stats = FrameStats::from_samples(samples);
        let result = self.recognizer.process_frame(&self.front_end, stats, now_ms);

        self.stats.frames_processed += 1;
        match result {
            SnapResult::FirstSnap => self.stats.first_snaps += 1,
            SnapResult::DoubleSnap => self.stats.double_snaps += 1,
            _ => {}
        }
        result
    }

    /// Count a rejected frame; nothing else is touched
    ///
    /// Also used by frame sources that find a corrupt sample before conversion.
    pub fn reject_frame(&mut self, err: FrameError) -> FrameError {
        self.stats.frames_rejected += 1;
        log::warn!("[SnapDetector] Frame rejected: {}", err);
        err
    }

    /// Zero the front-end and clear all gesture state; counters are kept
    pub fn reset(&mut self) {
        self.front_end.reset();
        self.recognizer.reset();
    }

    /// Event for a non-idle result, stamped with the latest features
    pub fn event_for(&self, result: SnapResult, now_ms: u64) -> Option<SnapEvent> {
        (result != SnapResult::None)
            .then(|| SnapEvent::new(result, now_ms, *self.recognizer.last_features()))
    }

    pub fn last_features(&self) -> &FeatureVector {
        self.recognizer.last_features()
    }

    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    pub fn recognizer(&self) -> &GestureRecognizer {
        &self.recognizer
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Map a normalised float onto the 24-bit integer scale
#[inline]
pub fn f32_to_sample(value: f32) -> i32 {
    (value.clamp(-1.0, 1.0) as f64 * SAMPLE_FULL_SCALE).round() as i32
}

struct AnalysisWorker {
    channels: AnalysisChannels,
    detector: SnapDetector,
    clock: FrameClock,
    event_sender: tokio::sync::broadcast::Sender<SnapEvent>,
    running: Arc<AtomicBool>,
}

impl AnalysisWorker {
    fn run(mut self) -> DetectorStats {
        tracing::info!(
            "[AnalysisThread] Starting analysis loop ({} front-end, {} samples/frame)",
            self.detector.front_end().name(),
            self.detector.frame_size()
        );

        loop {
            let frame = match self.channels.data_consumer.pop() {
                Ok(frame) => frame,
                Err(PopError::Empty) => {
                    // Check the flag only when the queue is drained
                    if !self.running.load(Ordering::SeqCst) {
                        tracing::info!("[AnalysisThread] Shutdown flag set and queue empty, exiting");
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            if frame.dropped_before > 0 {
                tracing::warn!(
                    "[AnalysisThread] {} samples dropped before frame, skipping ahead",
                    frame.dropped_before
                );
                self.clock.skip(frame.dropped_before);
            }
            let now_ms = self.clock.advance(frame.len());
            let outcome = self.detector.process_frame_f32(&frame.samples, now_ms);

            // Return frame to pool immediately
            if self.channels.pool_producer.push(frame).is_err() {
                tracing::warn!("[AnalysisThread] Pool queue full, dropping frame");
            }

            match outcome {
                Ok(result) => {
                    if let Some(event) = self.detector.event_for(result, now_ms) {
                        // No receivers is not an error
                        let _ = self.event_sender.send(event);
                    }
                }
                Err(err) => {
                    tracing::warn!("[AnalysisThread] Skipping frame at {} ms: {}", now_ms, err);
                }
            }
        }

        let stats = self.detector.stats();
        tracing::info!(
            "[AnalysisThread] Stopped after {} frames ({} rejected, {} double snaps)",
            stats.frames_processed,
            stats.frames_rejected,
            stats.double_snaps
        );
        stats
    }
}

/// Spawn the analysis thread
///
/// The thread drains the data queue and exits once `running` is cleared and
/// no filled frame is left. It returns the detector's final counters.
pub fn spawn_analysis_thread(
    channels: AnalysisChannels,
    detector: SnapDetector,
    event_sender: tokio::sync::broadcast::Sender<SnapEvent>,
    running: Arc<AtomicBool>,
) -> JoinHandle<DetectorStats> {
    let clock = FrameClock::new(detector.sample_rate());
    thread::spawn(move || {
        let worker = AnalysisWorker {
            channels,
            detector,
            clock,
            event_sender,
            running,
        };
        worker.run()
    })
}

#[cfg(test)]
mod tests;
