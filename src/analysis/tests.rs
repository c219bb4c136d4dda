use super::*;
use crate::audio::buffer_pool::BufferPool;
use crate::config::{AppConfig, FilterTuning};
use crate::testing::scenarios::Scenario;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::broadcast;

fn frames_of(scenario: Scenario) -> Vec<Vec<i32>> {
    scenario
        .timeline()
        .samples()
        .chunks_exact(FRAME_SIZE)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Non-NONE results of a detector run, timed frame-end
fn run_frames(detector: &mut SnapDetector, frames: &[Vec<i32>]) -> Vec<(u64, SnapResult)> {
    let mut clock = FrameClock::new(SAMPLE_RATE);
    frames
        .iter()
        .filter_map(|frame| {
            let now_ms = clock.advance(frame.len());
            let result = detector.process_frame(frame, now_ms).unwrap();
            (result != SnapResult::None).then_some((now_ms, result))
        })
        .collect()
}

#[test]
fn test_default_detector_layout() {
    let detector = SnapDetector::default();
    assert_eq!(detector.frame_size(), 512);
    assert_eq!(detector.sample_rate(), 16_000);
    assert_eq!(detector.front_end().name(), "wideband");
    assert_eq!(detector.stats(), DetectorStats::default());
}

#[test]
fn test_front_end_from_config() {
    let spectral = FrontEnd::from_config(&FrontEndConfig::Spectral, SAMPLE_RATE, FRAME_SIZE);
    assert_eq!(spectral.name(), "spectral");
    let narrow = FrontEnd::from_config(
        &FrontEndConfig::Iir {
            tuning: FilterTuning::Narrowband,
        },
        SAMPLE_RATE,
        FRAME_SIZE,
    );
    assert_eq!(narrow.name(), "narrowband");
}

#[test]
fn test_double_snap_scenario() {
    let mut detector = SnapDetector::default();
    let results = run_frames(&mut detector, &frames_of(Scenario::DoubleSnap));
    assert_eq!(results, Scenario::DoubleSnap.expected());

    let stats = detector.stats();
    assert_eq!(stats.frames_processed, 62);
    assert_eq!(stats.first_snaps, 1);
    assert_eq!(stats.double_snaps, 1);
    assert_eq!(stats.frames_rejected, 0);
}

#[test]
fn test_wrong_length_is_rejected_without_side_effects() {
    let frames = frames_of(Scenario::DoubleSnap);
    let mut reference = SnapDetector::default();
    let mut detector = SnapDetector::default();

    // Feed the first snap's onset frame, then a truncated frame
    let mut clock = FrameClock::new(SAMPLE_RATE);
    for frame in &frames[..16] {
        let now_ms = clock.advance(FRAME_SIZE);
        reference.process_frame(frame, now_ms).unwrap();
        detector.process_frame(frame, now_ms).unwrap();
    }
    assert!(detector.recognizer().is_waiting_decay());

    let err = detector.process_frame(&frames[16][..100], 544).unwrap_err();
    assert_eq!(
        err,
        FrameError::LengthMismatch {
            expected: 512,
            actual: 100
        }
    );
    assert_eq!(detector.stats().frames_rejected, 1);

    // Both detectors continue identically
    for frame in &frames[16..] {
        let now_ms = clock.advance(FRAME_SIZE);
        assert_eq!(
            detector.process_frame(frame, now_ms).unwrap(),
            reference.process_frame(frame, now_ms).unwrap()
        );
        assert_eq!(detector.last_features(), reference.last_features());
    }
}

#[test]
fn test_non_finite_float_is_rejected_with_index() {
    let mut detector = SnapDetector::default();
    let mut frame = vec![0.0_f32; FRAME_SIZE];
    frame[37] = f32::NAN;
    assert_eq!(
        detector.process_frame_f32(&frame, 32),
        Err(FrameError::NonFiniteSample { index: 37 })
    );

    frame[37] = 0.0;
    frame[3] = f32::INFINITY;
    assert_eq!(
        detector.process_frame_f32(&frame, 32),
        Err(FrameError::NonFiniteSample { index: 3 })
    );
    assert_eq!(detector.stats().frames_processed, 0);
    assert_eq!(detector.stats().frames_rejected, 2);
}

#[test]
fn test_sample_rate_mismatch() {
    let mut detector = SnapDetector::default();
    let frame = vec![0; FRAME_SIZE];
    assert_eq!(
        detector.process_frame_at(&frame, 44_100, 32),
        Err(FrameError::SampleRateMismatch {
            expected: 16_000,
            actual: 44_100
        })
    );
    assert_eq!(detector.process_frame_at(&frame, 16_000, 32), Ok(SnapResult::None));
}

#[test]
fn test_f32_conversion() {
    assert_eq!(f32_to_sample(0.0), 0);
    assert_eq!(f32_to_sample(1.0), 8_388_607);
    assert_eq!(f32_to_sample(-1.0), -8_388_607);
    assert_eq!(f32_to_sample(0.5), 4_194_304);
    assert_eq!(f32_to_sample(3.0), 8_388_607);
}

#[test]
fn test_float_frames_match_integer_frames() {
    let frames = frames_of(Scenario::SingleSnap);
    let mut int_detector = SnapDetector::default();
    let mut float_detector = SnapDetector::default();
    let mut clock = FrameClock::new(SAMPLE_RATE);

    for frame in &frames {
        let now_ms = clock.advance(FRAME_SIZE);
        let floats: Vec<f32> = frame
            .iter()
            .map(|&x| (x as f64 / SAMPLE_FULL_SCALE) as f32)
            .collect();
        assert_eq!(
            float_detector.process_frame_f32(&floats, now_ms).unwrap(),
            int_detector.process_frame(frame, now_ms).unwrap()
        );
    }
    assert_eq!(float_detector.stats().first_snaps, 1);
}

#[test]
fn test_event_for() {
    let detector = SnapDetector::default();
    assert!(detector.event_for(SnapResult::None, 10).is_none());
    let event = detector.event_for(SnapResult::FirstSnap, 608).unwrap();
    assert_eq!(event.result, SnapResult::FirstSnap);
    assert_eq!(event.timestamp_ms, 608);
}

#[test]
fn test_reset_repeats_identical_output() {
    let frames = frames_of(Scenario::Cooldown);
    let mut detector = SnapDetector::default();
    let first = run_frames(&mut detector, &frames);
    detector.reset();
    let second = run_frames(&mut detector, &frames);
    assert_eq!(first, second);
    assert_eq!(detector.stats().double_snaps, 4);
}

#[test]
fn test_listener_registered_on_detector() {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let mut detector = SnapDetector::default();
    detector.register_listener(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    run_frames(&mut detector, &frames_of(Scenario::Cooldown));
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

fn to_float(frame: &[i32]) -> Vec<f32> {
    frame
        .iter()
        .map(|&x| (x as f64 / SAMPLE_FULL_SCALE) as f32)
        .collect()
}

/// Push `(dropped_before, samples)` frames through a live analysis thread
fn run_pipeline(frames: Vec<(u64, Vec<f32>)>) -> (DetectorStats, Vec<(u64, SnapResult)>) {
    let config = AppConfig::default();
    let (mut capture, analysis) = BufferPool::new(4, FRAME_SIZE).split();
    let (event_tx, mut event_rx) = broadcast::channel(64);
    let running = Arc::new(AtomicBool::new(true));

    let detector = SnapDetector::from_config(&config.detector, SAMPLE_RATE, FRAME_SIZE);
    let handle = spawn_analysis_thread(analysis, detector, event_tx, Arc::clone(&running));

    for (dropped_before, samples) in frames {
        let mut frame = loop {
            match capture.pool_consumer.pop() {
                Ok(frame) => break frame,
                Err(_) => thread::sleep(Duration::from_millis(1)),
            }
        };
        frame.clear();
        frame.samples.extend_from_slice(&samples);
        frame.dropped_before = dropped_before;
        assert!(capture.data_producer.push(frame).is_ok());
    }

    running.store(false, Ordering::SeqCst);
    let stats = handle.join().unwrap();

    let mut received = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        received.push((event.timestamp_ms, event.result));
    }
    (stats, received)
}

#[test]
fn test_analysis_thread_broadcasts_events() {
    let frames = frames_of(Scenario::DoubleSnap)
        .iter()
        .map(|frame| (0, to_float(frame)))
        .collect();
    let (stats, received) = run_pipeline(frames);

    assert_eq!(stats.frames_processed, 62);
    assert_eq!(stats.double_snaps, 1);
    assert_eq!(received, Scenario::DoubleSnap.expected());
}

#[test]
fn test_analysis_thread_rejects_non_finite_capture() {
    let mut frames: Vec<(u64, Vec<f32>)> = frames_of(Scenario::DoubleSnap)
        .iter()
        .map(|frame| (0, to_float(frame)))
        .collect();
    let mut corrupt = vec![0.0_f32; FRAME_SIZE];
    corrupt[10] = f32::INFINITY;
    corrupt[11] = f32::NAN;
    frames.insert(10, (0, corrupt));

    let (stats, received) = run_pipeline(frames);
    assert_eq!(stats.frames_processed, 62);
    assert_eq!(stats.frames_rejected, 1);

    // The rejected frame still took 32 ms of capture time
    let shifted: Vec<(u64, SnapResult)> = Scenario::DoubleSnap
        .expected()
        .iter()
        .map(|&(t, result)| (t + 32, result))
        .collect();
    assert_eq!(received, shifted);
}

#[test]
fn test_dropped_samples_count_as_elapsed_time() {
    // 400 ms lost between the snaps pushes their gap past the window
    let frames = frames_of(Scenario::DoubleSnap)
        .iter()
        .enumerate()
        .map(|(i, frame)| (if i == 22 { 6_400 } else { 0 }, to_float(frame)))
        .collect();
    let (stats, received) = run_pipeline(frames);

    assert_eq!(stats.double_snaps, 0);
    assert_eq!(stats.first_snaps, 2);
    assert_eq!(
        received,
        vec![
            (512, SnapResult::WaitingDecay),
            (544, SnapResult::WaitingDecay),
            (576, SnapResult::WaitingDecay),
            (608, SnapResult::FirstSnap),
            (1_328, SnapResult::WaitingDecay),
            (1_360, SnapResult::WaitingDecay),
            (1_392, SnapResult::WaitingDecay),
            (1_424, SnapResult::FirstSnap),
        ]
    );
}
