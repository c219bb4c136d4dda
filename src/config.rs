//! Configuration for the snap detector
//!
//! Detection parameters are fixed, hand-tuned constants. They are exposed
//! here as named constants and bundled into serde structs whose `Default`
//! is built from those constants, so an alternative tuning can be loaded
//! from a JSON file without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

// ============================================
// AUDIO SETTINGS
// ============================================

/// Audio sample rate in Hz
pub const SAMPLE_RATE: u32 = 16_000;
/// Samples per analysis frame (32 ms at 16 kHz)
pub const FRAME_SIZE: usize = 512;
/// Full-scale magnitude of a 24-bit sample
pub const SAMPLE_FULL_SCALE: f64 = 8_388_607.0;
/// Right shift that turns a raw 32-bit I2S word into a 24-bit sample
pub const I2S_SAMPLE_SHIFT: u32 = 8;
/// Number of frame buffers circulating between capture and analysis
pub const BUFFER_POOL_SIZE: usize = 16;

// ============================================
// SNAP SIGNATURE
// ============================================

/// Lower edge of the snap band (Hz)
pub const SNAP_FREQ_LOW_HZ: f64 = 1_500.0;
/// Upper edge of the snap band (Hz)
pub const SNAP_FREQ_HIGH_HZ: f64 = 6_000.0;
/// Corner of the reject band high-pass (Hz)
pub const REJECT_FREQ_HZ: f64 = 500.0;
/// RMS below which the crest factor is reported as zero
pub const NOISE_FLOOR_RMS: f64 = 100.0;
/// Minimum snap-band envelope for an onset
pub const SNAP_ENERGY_THRESHOLD: f64 = 1.5e6;
/// Minimum snap/reject energy ratio
pub const SNAP_RATIO_THRESHOLD: f64 = 0.5;
/// Minimum peak/RMS ratio
pub const MIN_CREST_FACTOR: f64 = 3.0;
/// Minimum frame-to-frame band energy change
pub const FLUX_THRESHOLD: f64 = 1.0e6;
/// Snap energy must exceed the recent background by this factor
pub const MIN_RISE_FACTOR: f64 = 5.0;
/// Minimum bright/(snap + bright) energy ratio
pub const MIN_BRIGHT_RATIO: f64 = 0.10;
/// Minimum frame peak on the 24-bit scale
pub const AMPLITUDE_THRESHOLD: i32 = 15_625;

// ============================================
// TRANSIENT TIMING
// ============================================

/// Start of the sustain-rejection window after an onset
pub const SUSTAIN_CHECK_TIME_MS: u64 = 40;
/// Energy/peak ratio above which a candidate counts as sustained
pub const SUSTAIN_THRESHOLD: f64 = 0.7;
/// Delay after the onset before decay is judged
pub const DECAY_TIME_MS: u64 = 70;
/// Energy must drop below this fraction of the peak to confirm a snap
pub const DECAY_FACTOR: f64 = 0.3;
/// Candidates still open after this long are discarded
pub const MAX_SNAP_DURATION_MS: u64 = 150;
/// Frames of snap-band energy used as the rise-factor baseline
pub const ENERGY_HISTORY_SIZE: usize = 4;

// ============================================
// DOUBLE SNAP
// ============================================

/// Minimum time between confirmed snaps
pub const DOUBLE_SNAP_MIN_GAP_MS: u64 = 150;
/// Maximum time between confirmed snaps
pub const DOUBLE_SNAP_MAX_GAP_MS: u64 = 800;
/// Quiet period after an activation
pub const ACTIVATION_COOLDOWN_MS: u64 = 2_000;
/// How long the reported sensor state stays ON
pub const SENSOR_PULSE_MS: u64 = 500;

// ============================================
// NUMERIC GUARDS
// ============================================

/// Ratio substituted when a denominator is effectively zero
pub const RATIO_SENTINEL: f64 = 999.0;
/// History averages below this are treated as silence
pub const HISTORY_FLOOR: f64 = 100.0;
/// Reject/total energies below this are treated as zero
pub const ENERGY_EPSILON: f64 = 1e-6;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub audio: AudioConfig,
}

/// Coefficient table generation used by the IIR front-end
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTuning {
    /// Single band-pass snap section covering 1.5-6 kHz, bright band above 6 kHz
    #[default]
    Wideband,
    /// Cascaded 1.5 kHz high-pass + 3.5 kHz low-pass snap band, transient band above 3 kHz
    Narrowband,
}

/// Strategy that turns samples into band energies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrontEndConfig {
    /// Biquad filter bank with per-sample envelope followers
    Iir { tuning: FilterTuning },
    /// FFT band powers computed once per frame
    Spectral,
}

impl Default for FrontEndConfig {
    fn default() -> Self {
        FrontEndConfig::Iir {
            tuning: FilterTuning::default(),
        }
    }
}

/// Predicates that must all hold for a frame to open a candidate transient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetCriteria {
    /// RMS below which crest factor is zero
    pub noise_floor_rms: f64,
    /// Minimum snap-band energy
    pub energy_threshold: f64,
    /// Minimum snap/reject energy ratio
    pub ratio_threshold: f64,
    /// Minimum peak/RMS ratio
    pub min_crest_factor: f64,
    /// Minimum spectral flux
    pub flux_threshold: f64,
    /// Minimum rise over the energy history average
    pub min_rise_factor: f64,
    /// Optional brightness predicate (bright / (snap + bright))
    pub min_bright_ratio: Option<f64>,
    /// Optional raw peak amplitude predicate
    pub min_peak_amplitude: Option<i32>,
}

impl Default for OnsetCriteria {
    fn default() -> Self {
        Self {
            noise_floor_rms: NOISE_FLOOR_RMS,
            energy_threshold: SNAP_ENERGY_THRESHOLD,
            ratio_threshold: SNAP_RATIO_THRESHOLD,
            min_crest_factor: MIN_CREST_FACTOR,
            flux_threshold: FLUX_THRESHOLD,
            min_rise_factor: MIN_RISE_FACTOR,
            min_bright_ratio: Some(MIN_BRIGHT_RATIO),
            min_peak_amplitude: Some(AMPLITUDE_THRESHOLD),
        }
    }
}

/// Time windows governing decay confirmation and the double-snap pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub sustain_check_ms: u64,
    pub sustain_threshold: f64,
    pub decay_time_ms: u64,
    pub decay_factor: f64,
    pub max_snap_duration_ms: u64,
    pub double_snap_min_gap_ms: u64,
    pub double_snap_max_gap_ms: u64,
    pub activation_cooldown_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sustain_check_ms: SUSTAIN_CHECK_TIME_MS,
            sustain_threshold: SUSTAIN_THRESHOLD,
            decay_time_ms: DECAY_TIME_MS,
            decay_factor: DECAY_FACTOR,
            max_snap_duration_ms: MAX_SNAP_DURATION_MS,
            double_snap_min_gap_ms: DOUBLE_SNAP_MIN_GAP_MS,
            double_snap_max_gap_ms: DOUBLE_SNAP_MAX_GAP_MS,
            activation_cooldown_ms: ACTIVATION_COOLDOWN_MS,
        }
    }
}

/// Detector tuning: front-end choice plus recognizer thresholds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub front_end: FrontEndConfig,
    pub onset: OnsetCriteria,
    pub timing: TimingConfig,
}

impl DetectorConfig {
    /// Check ordering invariants between the thresholds
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timing = &self.timing;
        if timing.double_snap_min_gap_ms > timing.double_snap_max_gap_ms {
            return Err(ConfigError::InvalidValue {
                field: "timing.double_snap_min_gap_ms",
                reason: format!(
                    "minimum gap {} ms exceeds maximum gap {} ms",
                    timing.double_snap_min_gap_ms, timing.double_snap_max_gap_ms
                ),
            });
        }
        if timing.sustain_check_ms >= timing.decay_time_ms {
            return Err(ConfigError::InvalidValue {
                field: "timing.sustain_check_ms",
                reason: "sustain window must close before the decay check".to_string(),
            });
        }
        if timing.decay_time_ms >= timing.max_snap_duration_ms {
            return Err(ConfigError::InvalidValue {
                field: "timing.decay_time_ms",
                reason: "decay check must happen before the maximum duration".to_string(),
            });
        }
        for (field, value) in [
            ("timing.decay_factor", timing.decay_factor),
            ("timing.sustain_threshold", timing.sustain_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} is outside (0, 1]", value),
                });
            }
        }

        let onset = &self.onset;
        for (field, value) in [
            ("onset.noise_floor_rms", onset.noise_floor_rms),
            ("onset.energy_threshold", onset.energy_threshold),
            ("onset.ratio_threshold", onset.ratio_threshold),
            ("onset.min_crest_factor", onset.min_crest_factor),
            ("onset.flux_threshold", onset.flux_threshold),
            ("onset.min_rise_factor", onset.min_rise_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} must be finite and non-negative", value),
                });
            }
        }

        Ok(())
    }
}

/// Audio framing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate the filter coefficients were designed for
    pub sample_rate: u32,
    /// Samples per analysis frame
    pub frame_size: usize,
    /// Frame buffers circulating in the live capture pool
    pub buffer_pool_size: usize,
}

impl AudioConfig {
    /// Check the framing against the layout the filter tables and timing
    /// windows are built for
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate != SAMPLE_RATE {
            return Err(ConfigError::InvalidValue {
                field: "audio.sample_rate",
                reason: format!(
                    "{} Hz is not supported, filter coefficients are designed for {} Hz",
                    self.sample_rate, SAMPLE_RATE
                ),
            });
        }
        if self.frame_size != FRAME_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "audio.frame_size",
                reason: format!(
                    "{} samples per frame is not supported, frames are {} samples",
                    self.frame_size, FRAME_SIZE
                ),
            });
        }
        if self.buffer_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.buffer_pool_size",
                reason: "buffer pool must hold at least one frame".to_string(),
            });
        }
        Ok(())
    }

    /// Duration of one frame in milliseconds
    pub fn frame_duration_ms(&self) -> u64 {
        (self.frame_size as u64 * 1000) / self.sample_rate.max(1) as u64
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_size: FRAME_SIZE,
            buffer_pool_size: BUFFER_POOL_SIZE,
        }
    }
}

impl AppConfig {
    /// Parse and validate a configuration from JSON text
    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_json::from_str(contents).map_err(|err| ConfigError::Parse {
                reason: err.to_string(),
            })?;
        config.detector.validate()?;
        config.audio.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// Falls back to the built-in tuning (with a warning) when the file is
    /// missing, malformed or fails validation.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Rejected configuration in {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load the configuration bundled next to the binary
    pub fn load() -> Self {
        Self::load_from_file("assets/snap_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.audio.frame_size, 512);
        assert_eq!(config.audio.frame_duration_ms(), 32);
        assert_eq!(config.detector.timing.activation_cooldown_ms, 2_000);
        assert_eq!(config.detector.onset.min_bright_ratio, Some(0.10));
        assert!(config.detector.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let parsed = AppConfig::from_json_str(
            r#"{ "detector": { "onset": { "min_rise_factor": 15.0, "min_bright_ratio": null } } }"#,
        )
        .unwrap();
        assert_eq!(parsed.detector.onset.min_rise_factor, 15.0);
        assert_eq!(parsed.detector.onset.min_bright_ratio, None);
        assert_eq!(parsed.detector.onset.energy_threshold, SNAP_ENERGY_THRESHOLD);
        assert_eq!(parsed.audio, AudioConfig::default());
    }

    #[test]
    fn test_spectral_front_end_parses() {
        let parsed =
            AppConfig::from_json_str(r#"{ "detector": { "front_end": { "kind": "spectral" } } }"#)
                .unwrap();
        assert_eq!(parsed.detector.front_end, FrontEndConfig::Spectral);

        let parsed = AppConfig::from_json_str(
            r#"{ "detector": { "front_end": { "kind": "iir", "tuning": "narrowband" } } }"#,
        )
        .unwrap();
        assert_eq!(
            parsed.detector.front_end,
            FrontEndConfig::Iir {
                tuning: FilterTuning::Narrowband
            }
        );
    }

    #[test]
    fn test_inverted_gap_window_rejected() {
        let mut config = DetectorConfig::default();
        config.timing.double_snap_min_gap_ms = 900;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "timing.double_snap_min_gap_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_decay_factor_out_of_range_rejected() {
        let mut config = DetectorConfig::default();
        config.timing.decay_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_audio_layout_rejected() {
        let err = AppConfig::from_json_str(r#"{ "audio": { "sample_rate": 44100 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "audio.sample_rate",
                ..
            }
        ));

        let err = AppConfig::from_json_str(r#"{ "audio": { "frame_size": 256 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "audio.frame_size",
                ..
            }
        ));

        let err =
            AppConfig::from_json_str(r#"{ "audio": { "buffer_pool_size": 0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "audio.buffer_pool_size",
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_rate_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("snap_config_44k_{}.json", std::process::id()));
        fs::write(&path, r#"{ "audio": { "sample_rate": 44100 } }"#).unwrap();
        let config = AppConfig::load_from_file(&path);
        assert_eq!(config.audio.sample_rate, SAMPLE_RATE);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/snap_config.json");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_bundled_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/snap_config.json");
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(AppConfig::from_json_str(&contents).unwrap(), AppConfig::default());
    }
}
