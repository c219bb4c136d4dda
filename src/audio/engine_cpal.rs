// Live capture engine (desktop) - cpal input stream feeding the analysis thread
//
// Opens the default input device at the detector sample rate with F32
// samples, fills pool frames in the device callback and runs the detector on
// a dedicated analysis thread. Events go out on a tokio broadcast channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::buffer_pool::{BufferPool, CaptureChannels};
use super::callback::InputCallback;
use crate::analysis::{spawn_analysis_thread, DetectorStats, SnapDetector};
use crate::config::AppConfig;
use crate::error::AudioError;
use crate::report::SnapEvent;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct CaptureEngine {
    input_stream: Option<cpal::Stream>,
    analysis_handle: Option<JoinHandle<DetectorStats>>,
    running: Arc<AtomicBool>,
    dropped_samples: Arc<AtomicU64>,
    event_sender: tokio::sync::broadcast::Sender<SnapEvent>,
    config: AppConfig,
}

impl CaptureEngine {
    pub fn new(config: AppConfig) -> Self {
        let (event_sender, _) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            input_stream: None,
            analysis_handle: None,
            running: Arc::new(AtomicBool::new(false)),
            dropped_samples: Arc::new(AtomicU64::new(0)),
            event_sender,
            config,
        }
    }

    /// Receiver for every non-NONE detector result
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SnapEvent> {
        self.event_sender.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Samples lost because the analysis thread fell behind
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    fn create_input_stream(&mut self, channels: CaptureChannels) -> Result<cpal::Stream, AudioError> {
        let sample_rate = self.config.audio.sample_rate;
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default input device found".to_string(),
            })?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to query input configs: {:?}", e),
            })?
            .filter(|range| range.sample_format() == cpal::SampleFormat::F32)
            .find(|range| {
                range.min_sample_rate().0 <= sample_rate && range.max_sample_rate().0 >= sample_rate
            })
            .ok_or_else(|| {
                let actual = device
                    .default_input_config()
                    .map(|config| config.sample_rate().0)
                    .unwrap_or(0);
                AudioError::SampleRateMismatch {
                    expected: sample_rate,
                    actual,
                }
            })?;

        let stream_config: cpal::StreamConfig = supported
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .into();
        let device_channels = stream_config.channels as usize;
        log::info!(
            "[CaptureEngine] Opening input: {} Hz, {} channel(s), {} samples/frame",
            sample_rate,
            device_channels,
            self.config.audio.frame_size
        );

        let mut callback = InputCallback::new(channels, device_channels, self.config.audio.frame_size);
        self.dropped_samples = callback.dropped_samples_ref();

        let err_fn = |err| log::error!("[CaptureEngine] Input stream error: {}", err);

        device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| callback.on_input(data),
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("{:?}", e),
            })
    }

    /// Open the device, start capture and spawn the analysis thread
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.is_running() {
            return Ok(());
        }

        let audio = self.config.audio.clone();
        let (capture_channels, analysis_channels) =
            BufferPool::new(audio.buffer_pool_size, audio.frame_size).split();

        let input_stream = self.create_input_stream(capture_channels)?;
        input_stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Input start failed: {}", e),
        })?;

        let detector = SnapDetector::from_config(&self.config.detector, audio.sample_rate, audio.frame_size);
        self.running.store(true, Ordering::SeqCst);
        self.analysis_handle = Some(spawn_analysis_thread(
            analysis_channels,
            detector,
            self.event_sender.clone(),
            Arc::clone(&self.running),
        ));
        self.input_stream = Some(input_stream);
        Ok(())
    }

    /// Stop capture, drain the analysis thread and return its counters
    pub fn stop(&mut self) -> Result<Option<DetectorStats>, AudioError> {
        if let Some(stream) = self.input_stream.take() {
            drop(stream);
        }
        self.running.store(false, Ordering::SeqCst);

        match self.analysis_handle.take() {
            Some(handle) => handle
                .join()
                .map(Some)
                .map_err(|_| AudioError::StreamFailure {
                    reason: "analysis thread panicked".to_string(),
                }),
            None => Ok(None),
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            crate::error::log_audio_error(&err, "CaptureEngine::drop");
        }
    }
}
