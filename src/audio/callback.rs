//! Input callback - assembles device chunks into fixed-size analysis frames
//!
//! Capture devices deliver interleaved float chunks of arbitrary length. The
//! callback mixes them to mono and fills frames borrowed from the buffer
//! pool, pushing each one to the analysis thread once it holds exactly
//! `frame_size` samples. Samples are not converted or clamped here: the
//! detector validates them first.
//!
//! # Real-Time Safety
//! - No heap allocations (frames come from the pool)
//! - No locks (rtrb queues and atomics only)
//! - Bounded execution time per input sample
//!
//! When the pool is empty (or the data queue is full) samples are dropped and
//! counted. The count is carried on the next delivered frame as
//! `dropped_before`, and the analysis clock skips over it, so detector time
//! keeps tracking real time across an overrun.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::buffer_pool::{CaptureChannels, FrameBuffer};

/// Per-stream capture state owned by the device callback
pub struct InputCallback {
    channels: CaptureChannels,
    /// Interleaved channel count of the device stream
    device_channels: usize,
    frame_size: usize,
    current: Option<FrameBuffer>,
    /// Samples dropped since the last frame was started
    pending_gap: u64,
    /// Samples discarded because no empty frame was available
    dropped_samples: Arc<AtomicU64>,
}

impl InputCallback {
    pub fn new(channels: CaptureChannels, device_channels: usize, frame_size: usize) -> Self {
        Self {
            channels,
            device_channels: device_channels.max(1),
            frame_size,
            current: None,
            pending_gap: 0,
            dropped_samples: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of samples lost to pool exhaustion
    pub fn dropped_samples_ref(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped_samples)
    }

    /// Consume one interleaved chunk from the device
    pub fn on_input(&mut self, data: &[f32]) {
        for interleaved in data.chunks(self.device_channels) {
            let mono = interleaved.iter().sum::<f32>() / interleaved.len() as f32;
            self.push_sample(mono);
        }
    }

    fn begin_frame(&mut self, mut frame: FrameBuffer) {
        frame.clear();
        frame.dropped_before = std::mem::take(&mut self.pending_gap);
        self.current = Some(frame);
    }

    fn drop_samples(&mut self, count: u64) {
        self.pending_gap += count;
        self.dropped_samples.fetch_add(count, Ordering::Relaxed);
    }

    fn push_sample(&mut self, sample: f32) {
        if self.current.is_none() {
            match self.channels.pool_consumer.pop() {
                Ok(frame) => self.begin_frame(frame),
                Err(_) => {
                    self.drop_samples(1);
                    return;
                }
            }
        }

        let Some(frame) = self.current.as_mut() else {
            return;
        };
        frame.push(sample);
        if frame.len() < self.frame_size {
            return;
        }

        if let Some(full) = self.current.take() {
            if let Err(rtrb::PushError::Full(full)) = self.channels.data_producer.push(full) {
                // Data queue full: its samples and earlier gap are lost, the frame is reused
                self.pending_gap += full.dropped_before;
                self.drop_samples(full.len() as u64);
                self.begin_frame(full);
            }
        }
    }
}
