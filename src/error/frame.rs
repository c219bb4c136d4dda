// Frame validation error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Frame error code constants
///
/// Error code range: 2001-2003
pub struct FrameErrorCodes;

impl FrameErrorCodes {
    /// Frame length differs from the configured frame size
    pub const LENGTH_MISMATCH: i32 = 2001;

    /// Frame contains NaN or infinite samples
    pub const NON_FINITE_SAMPLE: i32 = 2002;

    /// Frame was captured at a different sample rate
    pub const SAMPLE_RATE_MISMATCH: i32 = 2003;
}

/// Malformed input frames
///
/// A rejected frame leaves every piece of detector state untouched, so
/// corrupted energies never propagate into later frames.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    /// Frame length differs from the configured frame size
    LengthMismatch { expected: usize, actual: usize },

    /// Frame contains a NaN or infinite sample
    NonFiniteSample { index: usize },

    /// Frame was captured at a different sample rate
    SampleRateMismatch { expected: u32, actual: u32 },
}

impl ErrorCode for FrameError {
    fn code(&self) -> i32 {
        match self {
            FrameError::LengthMismatch { .. } => FrameErrorCodes::LENGTH_MISMATCH,
            FrameError::NonFiniteSample { .. } => FrameErrorCodes::NON_FINITE_SAMPLE,
            FrameError::SampleRateMismatch { .. } => FrameErrorCodes::SAMPLE_RATE_MISMATCH,
        }
    }

    fn message(&self) -> String {
        match self {
            FrameError::LengthMismatch { expected, actual } => {
                format!("Frame must hold {} samples (got {})", expected, actual)
            }
            FrameError::NonFiniteSample { index } => {
                format!("Non-finite sample at index {}", index)
            }
            FrameError::SampleRateMismatch { expected, actual } => {
                format!("Frame sample rate must be {} Hz (got {})", expected, actual)
            }
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FrameError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FrameError {}
