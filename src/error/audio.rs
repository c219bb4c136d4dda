// Audio input error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1005
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// Failed to open an input stream or file
    pub const STREAM_OPEN_FAILED: i32 = 1001;

    /// Hardware or I/O error while reading samples
    pub const HARDWARE_ERROR: i32 = 1002;

    /// Stream disconnected or channel closed unexpectedly
    pub const STREAM_FAILURE: i32 = 1003;

    /// Sample format cannot be converted to the 24-bit scale
    pub const UNSUPPORTED_FORMAT: i32 = 1004;

    /// Source sample rate differs from the filter design rate
    pub const SAMPLE_RATE_MISMATCH: i32 = 1005;
}

/// Log an audio error with structured context
///
/// Logs the numeric code, the component and the human-readable message.
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the audio collaborators around the core: WAV file
/// sources and live capture streams. The detection core itself never
/// produces them.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Failed to open an input stream or file
    StreamOpenFailed { reason: String },

    /// Hardware or I/O error while reading samples
    HardwareError { details: String },

    /// Stream disconnected or channel closed unexpectedly
    StreamFailure { reason: String },

    /// Sample format cannot be converted
    UnsupportedFormat { details: String },

    /// Source sample rate differs from the filter design rate
    SampleRateMismatch { expected: u32, actual: u32 },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::SampleRateMismatch { .. } => AudioErrorCodes::SAMPLE_RATE_MISMATCH,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
            AudioError::UnsupportedFormat { details } => {
                format!("Unsupported sample format: {}", details)
            }
            AudioError::SampleRateMismatch { expected, actual } => {
                format!(
                    "Sample rate mismatch: filters are designed for {} Hz, source delivers {} Hz",
                    expected, actual
                )
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for AudioError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => io.into(),
            hound::Error::Unsupported => AudioError::UnsupportedFormat {
                details: "WAV feature not supported".to_string(),
            },
            other => AudioError::StreamFailure {
                reason: other.to_string(),
            },
        }
    }
}
