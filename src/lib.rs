// Snap Switch Core - double finger-snap detection
// Per-sample IIR band energies (or per-frame FFT band powers) feeding a
// per-frame gesture state machine that recognises two snaps in a row.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod report;
pub mod testing;

// Re-exports for convenience
pub use analysis::bands::{Band, BandEnergies, BandFrontEnd, BandSnapshot};
pub use analysis::features::{FeatureVector, FrameStats};
pub use analysis::filter_bank::FilterBank;
pub use analysis::gesture::{DoubleSnapListener, GestureRecognizer, SnapResult};
pub use analysis::spectral::SpectralFrontEnd;
pub use analysis::{DetectorStats, FrontEnd, SnapDetector};
pub use config::{AppConfig, DetectorConfig, FilterTuning, FrontEndConfig};
pub use error::{AudioError, ConfigError, ErrorCode, FrameError};
pub use report::{BinarySensor, SensorState, SnapEvent};
