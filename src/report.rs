// Report - detection events and the binary sensor they drive
//
// `SnapEvent` is what leaves the analysis thread (over a broadcast channel)
// and what `snap_cli analyze` prints as JSON lines. `BinarySensor` mirrors a
// home-automation binary sensor: a double snap turns it ON and it drops back
// to OFF after a fixed pulse. Publishing the state is up to the caller.

use serde::{Deserialize, Serialize};

use crate::analysis::features::FeatureVector;
use crate::analysis::gesture::SnapResult;
use crate::config::SENSOR_PULSE_MS;

/// Non-idle detector outcome with the features that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapEvent {
    pub result: SnapResult,
    pub timestamp_ms: u64,
    pub features: FeatureVector,
}

impl SnapEvent {
    pub fn new(result: SnapResult, timestamp_ms: u64, features: FeatureVector) -> Self {
        Self {
            result,
            timestamp_ms,
            features,
        }
    }

    pub fn is_double_snap(&self) -> bool {
        self.result == SnapResult::DoubleSnap
    }
}

/// Published sensor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorState {
    On,
    Off,
}

impl SensorState {
    /// State payload as published
    pub fn payload(self) -> &'static str {
        match self {
            SensorState::On => "ON",
            SensorState::Off => "OFF",
        }
    }
}

/// ON for a fixed pulse after each double snap, OFF otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySensor {
    pulse_ms: u64,
    on_since_ms: Option<u64>,
}

impl Default for BinarySensor {
    fn default() -> Self {
        Self::new(SENSOR_PULSE_MS)
    }
}

impl BinarySensor {
    pub fn new(pulse_ms: u64) -> Self {
        Self {
            pulse_ms,
            on_since_ms: None,
        }
    }

    pub fn state(&self) -> SensorState {
        if self.on_since_ms.is_some() {
            SensorState::On
        } else {
            SensorState::Off
        }
    }

    /// Turn ON (or restart the pulse); returns the state to publish
    pub fn trigger(&mut self, now_ms: u64) -> SensorState {
        self.on_since_ms = Some(now_ms);
        log::info!("[Sensor] ON at {} ms", now_ms);
        SensorState::On
    }

    /// Trigger on double snaps; other events are ignored
    pub fn handle_event(&mut self, event: &SnapEvent, now_ms: u64) -> Option<SensorState> {
        event.is_double_snap().then(|| self.trigger(now_ms))
    }

    /// Expire the pulse; returns `Some(Off)` on the ON -> OFF transition
    pub fn poll(&mut self, now_ms: u64) -> Option<SensorState> {
        match self.on_since_ms {
            Some(since) if now_ms.saturating_sub(since) >= self.pulse_ms => {
                self.on_since_ms = None;
                log::info!("[Sensor] OFF at {} ms", now_ms);
                Some(SensorState::Off)
            }
            _ => None,
        }
    }
}
