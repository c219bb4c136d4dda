use super::*;
use super::SnapResult::{DoubleSnap, FirstSnap, WaitingDecay};
use crate::analysis::bands::BandSnapshot;
use crate::config::RATIO_SENTINEL;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Band energies of a frame that opens a candidate from silence
const ONSET: BandSnapshot = BandSnapshot {
    reject: 4.0e10,
    snap: 2.5e10,
    bright: 1.0e10,
};

const ONSET_STATS: FrameStats = FrameStats {
    peak_amplitude: 400_000,
    rms: 40_000.0,
};

const QUIET_STATS: FrameStats = FrameStats {
    peak_amplitude: 1_000,
    rms: 300.0,
};

/// Longest decay tail `Driver::snap` feeds after the onset frame
const SNAP_SPAN_MS: u64 = 96;

fn scaled(level: f64) -> BandSnapshot {
    BandSnapshot::new(ONSET.reject * level, ONSET.snap * level, ONSET.bright * level)
}

struct Driver {
    recognizer: GestureRecognizer,
}

impl Driver {
    fn new() -> Self {
        Self {
            recognizer: GestureRecognizer::default(),
        }
    }

    fn frame(&mut self, energies: BandSnapshot, stats: FrameStats, now_ms: u64) -> SnapResult {
        self.recognizer.process_frame(&energies, stats, now_ms)
    }

    fn silence(&mut self, now_ms: u64) -> SnapResult {
        self.frame(BandSnapshot::default(), FrameStats::default(), now_ms)
    }

    /// Onset frame at `onset_ms`, then frames every `step_ms` whose energy
    /// falls by 60% per frame, until the candidate resolves
    fn snap(&mut self, onset_ms: u64, step_ms: u64) -> Vec<SnapResult> {
        let mut results = vec![self.frame(ONSET, ONSET_STATS, onset_ms)];
        let mut elapsed = 0;
        let mut level = 1.0;
        while elapsed < SNAP_SPAN_MS {
            elapsed += step_ms;
            level *= 0.4;
            let result = self.frame(scaled(level), QUIET_STATS, onset_ms + elapsed);
            results.push(result);
            if result != SnapResult::WaitingDecay {
                break;
            }
        }
        results
    }
}

fn counting_listener(counter: &Arc<AtomicUsize>) -> Box<dyn DoubleSnapListener + Send> {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_silence_never_leaves_none() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::new();
    driver.recognizer.register_listener(counting_listener(&fired));

    for frame in 1..=2_000u64 {
        assert_eq!(driver.silence(frame * 32), SnapResult::None);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(driver.recognizer.pending_snaps(), 0);
}

#[test]
fn test_single_snap_waits_for_decay_window() {
    let mut driver = Driver::new();
    let results = driver.snap(100, 32);
    assert_eq!(results, vec![WaitingDecay, WaitingDecay, WaitingDecay, FirstSnap]);
    assert_eq!(driver.recognizer.pending_snaps(), 1);
    assert!(!driver.recognizer.is_waiting_decay());
}

#[test]
fn test_decay_not_judged_at_exactly_decay_delay() {
    let mut driver = Driver::new();
    let results = driver.snap(100, 10);
    // Frames at +10..+70 wait, +80 is the first strictly past 70 ms
    assert_eq!(results.len(), 9);
    assert!(results[..8].iter().all(|r| *r == WaitingDecay));
    assert_eq!(results[8], FirstSnap);
}

#[test]
fn test_double_snap_fires_listener_once() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::new();
    driver.recognizer.register_listener(counting_listener(&fired));

    assert_eq!(driver.snap(100, 32).last(), Some(&FirstSnap));
    assert_eq!(driver.snap(500, 32).last(), Some(&DoubleSnap));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(driver.recognizer.pending_snaps(), 0);
    assert_eq!(driver.recognizer.last_activation_ms(), Some(596));

    for frame in 0..20 {
        driver.silence(700 + frame * 32);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_every_listener_fires() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::new();
    driver.recognizer.register_listener(counting_listener(&first));
    driver.recognizer.register_listener(counting_listener(&second));
    assert_eq!(driver.recognizer.listener_count(), 2);

    driver.snap(100, 32);
    driver.snap(500, 32);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_short_gap_restarts_as_first_snap() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::new();
    driver.recognizer.register_listener(counting_listener(&fired));

    // Confirmations at 180 ms and 270 ms: 90 ms apart
    assert_eq!(driver.snap(100, 10).last(), Some(&FirstSnap));
    assert_eq!(driver.snap(190, 10).last(), Some(&FirstSnap));
    assert_eq!(driver.recognizer.pending_snaps(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    // The restarted first snap pairs with one 310 ms later
    assert_eq!(driver.snap(500, 10).last(), Some(&DoubleSnap));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_long_gap_expires_pending_snap() {
    let mut driver = Driver::new();
    assert_eq!(driver.snap(100, 32).last(), Some(&FirstSnap));

    driver.silence(1_000);
    assert_eq!(driver.recognizer.pending_snaps(), 0);

    // Confirmed 1000 ms after the first
    assert_eq!(driver.snap(1_100, 32).last(), Some(&FirstSnap));
    assert_eq!(driver.recognizer.pending_snaps(), 1);
}

#[test]
fn test_gap_window_is_inclusive() {
    // First snap is confirmed at 196 ms; a snap with onset X confirms at X + 96
    for (second_onset, expected) in [
        (249, FirstSnap),
        (250, DoubleSnap),
        (900, DoubleSnap),
        (901, FirstSnap),
    ] {
        let mut driver = Driver::new();
        assert_eq!(driver.snap(100, 32).last(), Some(&FirstSnap));
        assert_eq!(
            driver.snap(second_onset, 32).last(),
            Some(&expected),
            "gap {} ms",
            second_onset + 96 - 196
        );
    }
}

#[test]
fn test_no_cooldown_before_first_activation() {
    let mut driver = Driver::new();
    assert_eq!(driver.snap(0, 32).last(), Some(&FirstSnap));
    assert_eq!(driver.snap(300, 32).last(), Some(&DoubleSnap));
}

#[test]
fn test_cooldown_blocks_new_patterns() {
    let fired = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::new();
    driver.recognizer.register_listener(counting_listener(&fired));

    driver.snap(100, 32);
    assert_eq!(driver.snap(500, 32).last(), Some(&DoubleSnap));

    // Activation at 596 ms: quiet until 2596 ms
    for onset in [1_000, 1_400, 1_800, 2_200, 2_500] {
        let results = driver.snap(onset, 32);
        assert!(
            results.iter().all(|r| *r == SnapResult::None),
            "onset {} produced {:?}",
            onset,
            results
        );
    }

    // A pattern that started inside the cooldown never completes; after some
    // silence the next pair works again
    for now in [2_564, 2_596, 2_628, 2_660] {
        assert_eq!(driver.silence(now), SnapResult::None);
    }
    assert_eq!(driver.snap(2_700, 32).last(), Some(&FirstSnap));
    assert_eq!(driver.snap(3_100, 32).last(), Some(&DoubleSnap));
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cooldown_ends_exactly_at_boundary() {
    let mut driver = Driver::new();
    driver.snap(100, 32);
    driver.snap(500, 32);
    assert_eq!(driver.frame(ONSET, ONSET_STATS, 2_595), SnapResult::None);

    let mut driver = Driver::new();
    driver.snap(100, 32);
    driver.snap(500, 32);
    assert_eq!(driver.frame(ONSET, ONSET_STATS, 2_596), WaitingDecay);
}

#[test]
fn test_history_updates_during_cooldown() {
    let mut driver = Driver::new();
    driver.snap(100, 32);
    driver.snap(500, 32);

    for frame in 1..=4 {
        let background = BandSnapshot::new(1.0e6, 1.0e6, 0.0);
        assert_eq!(
            driver.frame(background, QUIET_STATS, 596 + frame * 32),
            SnapResult::None
        );
    }
    let louder = BandSnapshot::new(1.0e6, 1.0e7, 0.0);
    driver.frame(louder, QUIET_STATS, 800);
    assert!((driver.recognizer.last_features().rise_factor - 10.0).abs() < 1e-9);
}

#[test]
fn test_sustained_energy_is_rejected() {
    let mut driver = Driver::new();
    assert_eq!(driver.frame(ONSET, ONSET_STATS, 100), WaitingDecay);
    // 32 ms is before the sustain window opens
    assert_eq!(driver.frame(scaled(0.9), QUIET_STATS, 132), WaitingDecay);
    assert_eq!(driver.frame(scaled(0.9), QUIET_STATS, 164), SnapResult::None);
    assert!(!driver.recognizer.is_waiting_decay());
    assert_eq!(driver.recognizer.pending_snaps(), 0);
}

#[test]
fn test_slow_decay_is_rejected() {
    let mut driver = Driver::new();
    driver.frame(ONSET, ONSET_STATS, 100);
    assert_eq!(driver.frame(scaled(0.5), QUIET_STATS, 132), WaitingDecay);
    assert_eq!(driver.frame(scaled(0.5), QUIET_STATS, 164), WaitingDecay);
    assert_eq!(driver.frame(scaled(0.5), QUIET_STATS, 196), SnapResult::None);
    assert_eq!(driver.recognizer.pending_snaps(), 0);
}

#[test]
fn test_peak_tracks_maximum_while_waiting() {
    let mut driver = Driver::new();
    driver.frame(ONSET, ONSET_STATS, 100);
    assert_eq!(driver.frame(scaled(2.0), QUIET_STATS, 132), WaitingDecay);
    assert_eq!(driver.frame(scaled(0.3), QUIET_STATS, 164), WaitingDecay);
    // 0.4 of the onset energy but only 0.2 of the tracked peak
    assert_eq!(driver.frame(scaled(0.4), QUIET_STATS, 196), FirstSnap);
}

#[test]
fn test_max_duration_checked_before_decay() {
    let mut driver = Driver::new();
    driver.frame(ONSET, ONSET_STATS, 100);
    assert_eq!(driver.frame(scaled(0.01), QUIET_STATS, 300), SnapResult::None);

    let mut driver = Driver::new();
    driver.frame(ONSET, ONSET_STATS, 100);
    assert_eq!(driver.frame(scaled(0.01), QUIET_STATS, 240), FirstSnap);
}

#[test]
fn test_zero_peak_is_not_decayed() {
    assert!(!decayed(0.0, 0.0, 0.3));
    assert!(decayed(1.0, 10.0, 0.3));
    assert!(!decayed(3.0, 10.0, 0.3));
}

#[test]
fn test_onset_needs_quiet_background() {
    let mut driver = Driver::new();
    for frame in 1..=4 {
        driver.frame(scaled(0.5), QUIET_STATS, frame * 32);
    }
    // Rise over a background of half the onset energy is only 2
    assert_eq!(driver.frame(ONSET, ONSET_STATS, 160), SnapResult::None);
    assert!((driver.recognizer.last_features().rise_factor - 2.0).abs() < 1e-9);
}

#[test]
fn test_confirmation_clears_history() {
    let mut driver = Driver::new();
    driver.snap(100, 32);
    assert_eq!(driver.silence(228), SnapResult::None);
    // History was cleared at the confirmation, so only the silent frame counts
    let mut loud = driver.recognizer.tracker;
    let features = loud.update(ONSET_STATS, ONSET, &OnsetCriteria::default());
    assert_eq!(features.rise_factor, RATIO_SENTINEL);
}

#[test]
fn test_reset_matches_fresh_instance() {
    let mut used = Driver::new();
    used.snap(100, 32);
    used.frame(ONSET, ONSET_STATS, 400);
    assert!(used.recognizer.is_waiting_decay());
    used.recognizer.reset();

    assert!(!used.recognizer.is_waiting_decay());
    assert_eq!(used.recognizer.pending_snaps(), 0);
    assert_eq!(used.recognizer.last_activation_ms(), None);
    assert_eq!(used.recognizer.last_features(), &FeatureVector::default());

    let mut fresh = Driver::new();
    let mut used_results = Vec::new();
    let mut fresh_results = Vec::new();
    for onset in [1_000, 1_400, 2_000, 4_000, 4_300] {
        used_results.extend(used.snap(onset, 32));
        fresh_results.extend(fresh.snap(onset, 32));
    }
    assert_eq!(used_results, fresh_results);
    assert!(used_results.contains(&DoubleSnap));
}

#[test]
fn test_snap_result_display() {
    assert_eq!(DoubleSnap.to_string(), "DOUBLE_SNAP");
    assert_eq!(
        serde_json::to_string(&WaitingDecay).unwrap(),
        "\"WAITING_DECAY\""
    );
}
