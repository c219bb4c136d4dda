// Frame sources - fixed-size frames of 24-bit samples for offline analysis
//
// A source hands out consecutive frames of exactly `frame.len()` samples. A
// trailing partial frame is dropped: the detector only accepts whole frames.

use std::path::Path;

use crate::analysis::bands::BandFrontEnd;
use crate::analysis::{f32_to_sample, SnapDetector};
use crate::clock::FrameClock;
use crate::config::{I2S_SAMPLE_SHIFT, SAMPLE_RATE};
use crate::error::{AudioError, FrameError};
use crate::report::SnapEvent;

/// Producer of fixed-size frames
pub trait FrameSource {
    fn sample_rate(&self) -> u32;

    /// Fill `frame` completely; `Ok(false)` once fewer samples remain than fit
    fn next_frame(&mut self, frame: &mut [i32]) -> Result<bool, AudioError>;

    /// Index within the last frame of a sample that did not decode to a
    /// finite value; such a frame must be rejected, not analysed
    fn corrupt_sample(&self) -> Option<usize> {
        None
    }
}

/// Frames cut from an in-memory sample vector
#[derive(Debug, Clone)]
pub struct SampleFrameSource {
    samples: Vec<i32>,
    position: usize,
    sample_rate: u32,
}

impl SampleFrameSource {
    pub fn new(samples: Vec<i32>, sample_rate: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
        }
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl FrameSource for SampleFrameSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_frame(&mut self, frame: &mut [i32]) -> Result<bool, AudioError> {
        let end = self.position + frame.len();
        if frame.is_empty() || end > self.samples.len() {
            return Ok(false);
        }
        frame.copy_from_slice(&self.samples[self.position..end]);
        self.position = end;
        Ok(true)
    }
}

/// Frames decoded from a WAV file recorded at the detector sample rate
///
/// Multi-channel files are mixed down to mono; integer and float formats
/// are converted to the 24-bit scale. NaN or infinite float samples are
/// remembered by mono position and flag the frame that contains them.
#[derive(Debug, Clone)]
pub struct WavFrameSource {
    inner: SampleFrameSource,
    channels: u16,
    /// Sorted mono positions of non-finite samples
    non_finite: Vec<usize>,
    corrupt: Option<usize>,
}

impl WavFrameSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path).map_err(|err| AudioError::StreamOpenFailed {
            reason: format!("failed to open {}: {err}", path.display()),
        })?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(AudioError::UnsupportedFormat {
                details: format!("{} has zero channels", path.display()),
            });
        }
        if spec.sample_rate != SAMPLE_RATE {
            return Err(AudioError::SampleRateMismatch {
                expected: SAMPLE_RATE,
                actual: spec.sample_rate,
            });
        }

        let mut non_finite = Vec::new();
        let interleaved: Vec<i32> = match spec.sample_format {
            hound::SampleFormat::Float => {
                let floats = reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?;
                for (i, sample) in floats.iter().enumerate() {
                    let position = i / spec.channels as usize;
                    if !sample.is_finite() && non_finite.last() != Some(&position) {
                        non_finite.push(position);
                    }
                }
                floats
                    .into_iter()
                    .map(|x| if x.is_finite() { f32_to_sample(x) } else { 0 })
                    .collect()
            }
            hound::SampleFormat::Int => {
                let scale: fn(i32) -> i32 = match spec.bits_per_sample {
                    8 => |v| v << 16,
                    16 => |v| v << 8,
                    24 => |v| v,
                    32 => |v| v >> I2S_SAMPLE_SHIFT,
                    bits => {
                        return Err(AudioError::UnsupportedFormat {
                            details: format!(
                                "unsupported bits_per_sample={} for {}",
                                bits,
                                path.display()
                            ),
                        })
                    }
                };
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let samples = mix_to_mono(&interleaved, spec.channels);
        if !non_finite.is_empty() {
            log::warn!(
                "[WavFrameSource] {} contains {} non-finite sample(s), first at {}",
                path.display(),
                non_finite.len(),
                non_finite[0]
            );
        }
        log::info!(
            "[WavFrameSource] Loaded {} ({} ch, {} bit, {} mono samples)",
            path.display(),
            spec.channels,
            spec.bits_per_sample,
            samples.len()
        );

        Ok(Self {
            inner: SampleFrameSource::new(samples, spec.sample_rate),
            channels: spec.channels,
            non_finite,
            corrupt: None,
        })
    }

    /// Channel count of the file before the mono mix-down
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl FrameSource for WavFrameSource {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn next_frame(&mut self, frame: &mut [i32]) -> Result<bool, AudioError> {
        let start = self.inner.position;
        let filled = self.inner.next_frame(frame)?;
        self.corrupt = None;
        if filled {
            let first = self.non_finite.partition_point(|&p| p < start);
            self.corrupt = self
                .non_finite
                .get(first)
                .filter(|&&p| p < start + frame.len())
                .map(|&p| p - start);
        }
        Ok(filled)
    }

    fn corrupt_sample(&self) -> Option<usize> {
        self.corrupt
    }
}

/// Average interleaved channels into one
pub fn mix_to_mono(interleaved: &[i32], channels: u16) -> Vec<i32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels as usize)
        .map(|chunk| (chunk.iter().map(|&x| x as i64).sum::<i64>() / channels as i64) as i32)
        .collect()
}

/// Run every frame of `source` through `detector`, timing frames by sample count
///
/// Returns every non-NONE result as an event. Frames the detector rejects,
/// and frames the source reports as corrupt, are logged and skipped.
pub fn run_detector<S, F>(
    source: &mut S,
    detector: &mut SnapDetector<F>,
) -> Result<Vec<SnapEvent>, AudioError>
where
    S: FrameSource + ?Sized,
    F: BandFrontEnd,
{
    let mut clock = FrameClock::new(source.sample_rate());
    let mut frame = vec![0_i32; detector.frame_size()];
    let mut events = Vec::new();

    while source.next_frame(&mut frame)? {
        let now_ms = clock.advance(frame.len());
        let outcome = match source.corrupt_sample() {
            Some(index) => Err(detector.reject_frame(FrameError::NonFiniteSample { index })),
            None => detector.process_frame_at(&frame, source.sample_rate(), now_ms),
        };
        match outcome {
            Ok(result) => events.extend(detector.event_for(result, now_ms)),
            Err(err) => log::warn!("[run_detector] Frame at {} ms skipped: {}", now_ms, err),
        }
    }
    Ok(events)
}
