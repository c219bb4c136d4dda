// Error types for the snap detector
//
// This module defines custom error types for frame validation, audio input and
// configuration, providing structured error handling with numeric error codes
// that the reporting layer can forward without string matching.

mod audio;
mod config;
mod frame;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use config::{ConfigError, ConfigErrorCodes};
pub use frame::{FrameError, FrameErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the core and its collaborators.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
