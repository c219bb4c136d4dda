//! Synthetic signal harness for tests, the CLI `simulate` command and demos.
//!
//! `signals` renders deterministic waveforms on the 24-bit scale and
//! `scenarios` names the recordings together with the detector output they
//! are expected to produce.

pub mod scenarios;
pub mod signals;

pub use scenarios::Scenario;
pub use signals::{SnapShape, Timeline};
