// Configuration error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3002
pub struct ConfigErrorCodes;

impl ConfigErrorCodes {
    /// Configuration text could not be parsed
    pub const PARSE_FAILED: i32 = 3001;

    /// A parameter violates an ordering or range invariant
    pub const INVALID_VALUE: i32 = 3002;
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration text could not be parsed
    Parse { reason: String },

    /// A parameter violates an ordering or range invariant
    InvalidValue { field: &'static str, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE_FAILED,
            ConfigError::InvalidValue { .. } => ConfigErrorCodes::INVALID_VALUE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Parse { reason } => format!("Failed to parse configuration: {}", reason),
            ConfigError::InvalidValue { field, reason } => {
                format!("Invalid value for {}: {}", field, reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}
