// Gesture recognizer - double-snap state machine
//
// Runs once per frame, after the front-end has consumed every sample of that
// frame. Features (and the energy history) are updated first and always, then
// the state machine decides:
//
// 1. Cooldown: within the cooldown after an activation, return None
// 2. Waiting for decay (candidate open), checked in this order:
//    - sustain window: energy still above the sustain fraction of the peak -> abort
//    - longer than the maximum transient duration -> abort
//    - past the decay delay: decayed below the decay factor -> confirmed snap,
//      otherwise abort
//    - else track the peak and keep waiting
// 3. Confirmed snap: first pending snap -> FirstSnap; second inside the gap
//    window -> DoubleSnap (listeners fire, cooldown armed); second outside
//    the window -> becomes the new first snap
// 4. Idle: expire a stale pending snap, then test the onset predicates
//
// The pending snap is a counter on top of Idle rather than a separate phase.

use serde::{Deserialize, Serialize};

use crate::analysis::bands::BandEnergies;
use crate::analysis::features::{FeatureTracker, FeatureVector, FrameStats};
use crate::config::{DetectorConfig, OnsetCriteria, TimingConfig};

/// Outcome of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapResult {
    /// Nothing of interest (also returned during cooldown and on rejection)
    None,
    /// A candidate transient is open and its decay is not yet judged
    WaitingDecay,
    /// A snap was confirmed and is waiting for its partner
    FirstSnap,
    /// Two snaps inside the gap window: the gesture
    DoubleSnap,
}

impl SnapResult {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapResult::None => "NONE",
            SnapResult::WaitingDecay => "WAITING_DECAY",
            SnapResult::FirstSnap => "FIRST_SNAP",
            SnapResult::DoubleSnap => "DOUBLE_SNAP",
        }
    }
}

impl std::fmt::Display for SnapResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notified synchronously inside the frame call that returns `DoubleSnap`
///
/// Runs on the real-time analysis path, so implementations must not block.
pub trait DoubleSnapListener {
    fn on_double_snap(&mut self);
}

impl<F> DoubleSnapListener for F
where
    F: FnMut() + Send,
{
    fn on_double_snap(&mut self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    WaitingDecay { started_ms: u64, peak_energy: f64 },
}

/// Turns per-frame band energies into snap / double-snap decisions
pub struct GestureRecognizer {
    onset: OnsetCriteria,
    timing: TimingConfig,
    tracker: FeatureTracker,
    phase: Phase,
    pending_snaps: u8,
    last_snap_ms: u64,
    last_activation_ms: Option<u64>,
    last_features: FeatureVector,
    listeners: Vec<Box<dyn DoubleSnapListener + Send>>,
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("phase", &self.phase)
            .field("pending_snaps", &self.pending_snaps)
            .field("last_snap_ms", &self.last_snap_ms)
            .field("last_activation_ms", &self.last_activation_ms)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(&DetectorConfig::default())
    }
}

impl GestureRecognizer {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            onset: config.onset.clone(),
            timing: config.timing.clone(),
            tracker: FeatureTracker::default(),
            phase: Phase::Idle,
            pending_snaps: 0,
            last_snap_ms: 0,
            last_activation_ms: None,
            last_features: FeatureVector::default(),
            listeners: Vec::new(),
        }
    }

    /// Clear all gesture state and the energy history
    ///
    /// Registered listeners stay registered.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.phase = Phase::Idle;
        self.pending_snaps = 0;
        self.last_snap_ms = 0;
        self.last_activation_ms = None;
        self.last_features = FeatureVector::default();
    }

    /// Add a listener; every registered listener fires once per double snap
    pub fn register_listener(&mut self, listener: Box<dyn DoubleSnapListener + Send>) {
        self.listeners.push(listener);
    }

    /// Process one frame
    ///
    /// # Arguments
    /// * `energies` - Band energies after the frame's last sample
    /// * `stats` - Peak amplitude and RMS of the frame
    /// * `now_ms` - Monotonic timestamp of the frame
    pub fn process_frame<E>(&mut self, energies: &E, stats: FrameStats, now_ms: u64) -> SnapResult
    where
        E: BandEnergies + ?Sized,
    {
        let features = self.tracker.update(stats, energies.snapshot(), &self.onset);
        self.last_features = features;

        if let Some(activated_ms) = self.last_activation_ms {
            if now_ms.saturating_sub(activated_ms) < self.timing.activation_cooldown_ms {
                return SnapResult::None;
            }
        }

        match self.phase {
            Phase::WaitingDecay {
                started_ms,
                peak_energy,
            } => self.judge_candidate(&features, started_ms, peak_energy, now_ms),
            Phase::Idle => self.watch_for_onset(&features, now_ms),
        }
    }

    fn judge_candidate(
        &mut self,
        features: &FeatureVector,
        started_ms: u64,
        peak_energy: f64,
        now_ms: u64,
    ) -> SnapResult {
        let energy = features.energies.snap;
        let elapsed = now_ms.saturating_sub(started_ms);
        let timing = &self.timing;

        if elapsed > timing.sustain_check_ms
            && elapsed < timing.decay_time_ms
            && peak_energy > 0.0
            && energy / peak_energy > timing.sustain_threshold
        {
            tracing::debug!(
                "[Gesture] Candidate sustained ({:.2} of peak after {} ms), rejected",
                energy / peak_energy,
                elapsed
            );
            self.phase = Phase::Idle;
            return SnapResult::None;
        }

        if elapsed > timing.max_snap_duration_ms {
            tracing::debug!("[Gesture] Candidate open for {} ms, discarded", elapsed);
            self.phase = Phase::Idle;
            return SnapResult::None;
        }

        if elapsed > timing.decay_time_ms {
            self.phase = Phase::Idle;
            if decayed(energy, peak_energy, timing.decay_factor) {
                return self.confirm_snap(now_ms);
            }
            tracing::debug!(
                "[Gesture] Candidate did not decay (energy {:.3e}, peak {:.3e}), rejected",
                energy,
                peak_energy
            );
            return SnapResult::None;
        }

        if energy > peak_energy {
            self.phase = Phase::WaitingDecay {
                started_ms,
                peak_energy: energy,
            };
        }
        SnapResult::WaitingDecay
    }

    fn confirm_snap(&mut self, now_ms: u64) -> SnapResult {
        self.pending_snaps = self.pending_snaps.saturating_add(1);
        self.tracker.clear_history();

        if self.pending_snaps < 2 {
            self.last_snap_ms = now_ms;
            tracing::info!("[Gesture] First snap at {} ms", now_ms);
            return SnapResult::FirstSnap;
        }

        let gap = now_ms.saturating_sub(self.last_snap_ms);
        if gap >= self.timing.double_snap_min_gap_ms && gap <= self.timing.double_snap_max_gap_ms {
            self.pending_snaps = 0;
            self.last_snap_ms = now_ms;
            self.last_activation_ms = Some(now_ms);
            tracing::info!("[Gesture] Double snap at {} ms (gap {} ms)", now_ms, gap);
            for listener in &mut self.listeners {
                listener.on_double_snap();
            }
            return SnapResult::DoubleSnap;
        }

        tracing::info!(
            "[Gesture] Snap gap {} ms outside window, restarting at {} ms",
            gap,
            now_ms
        );
        self.pending_snaps = 1;
        self.last_snap_ms = now_ms;
        SnapResult::FirstSnap
    }

    fn watch_for_onset(&mut self, features: &FeatureVector, now_ms: u64) -> SnapResult {
        if self.pending_snaps > 0
            && now_ms.saturating_sub(self.last_snap_ms) > self.timing.double_snap_max_gap_ms
        {
            tracing::debug!("[Gesture] Pending snap expired");
            self.pending_snaps = 0;
        }

        if !features.is_onset(&self.onset) {
            return SnapResult::None;
        }

        tracing::debug!(
            "[Gesture] Candidate opened at {} ms (energy {:.3e}, ratio {:.2}, crest {:.1}, rise {:.1})",
            now_ms,
            features.energies.snap,
            features.snap_ratio,
            features.crest_factor,
            features.rise_factor
        );
        self.phase = Phase::WaitingDecay {
            started_ms: now_ms,
            peak_energy: features.energies.snap,
        };
        SnapResult::WaitingDecay
    }

    /// Features derived for the most recent frame
    pub fn last_features(&self) -> &FeatureVector {
        &self.last_features
    }

    pub fn is_waiting_decay(&self) -> bool {
        matches!(self.phase, Phase::WaitingDecay { .. })
    }

    pub fn pending_snaps(&self) -> u8 {
        self.pending_snaps
    }

    pub fn last_activation_ms(&self) -> Option<u64> {
        self.last_activation_ms
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Decay confirmation; a zero peak never counts as decayed
fn decayed(energy: f64, peak_energy: f64, decay_factor: f64) -> bool {
    peak_energy > 0.0 && energy / peak_energy < decay_factor
}

#[cfg(test)]
#[path = "gesture_tests.rs"]
mod tests;
