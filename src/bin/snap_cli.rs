use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use snap_switch::analysis::filter_bank::coefficients::FilterBankTable;
use snap_switch::audio::{run_detector, WavFrameSource};
use snap_switch::config::{AppConfig, FilterTuning, FrontEndConfig, SAMPLE_RATE};
use snap_switch::testing::Scenario;
use snap_switch::{BandFrontEnd, SnapDetector, SnapEvent, SnapResult};

#[derive(Parser, Debug)]
#[command(
    name = "snap_cli",
    about = "Double finger-snap detector: offline analysis, live capture and synthetic scenarios"
)]
struct Cli {
    /// Log detector internals (debug level) to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    /// JSON configuration file (defaults to assets/snap_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a 16 kHz WAV recording through the detector, one JSON event per line
    Analyze {
        wav: PathBuf,
        #[arg(long, value_enum)]
        front_end: Option<FrontEndArg>,
    },
    /// Capture from the default input device and drive the binary sensor
    Listen {
        /// Stop after this many seconds (runs until killed otherwise)
        #[arg(long)]
        seconds: Option<u64>,
        /// Sensor ON pulse length
        #[arg(long, default_value_t = snap_switch::config::SENSOR_PULSE_MS)]
        pulse_ms: u64,
    },
    /// Render a synthetic scenario, detect it and compare with the expected output
    Simulate {
        #[arg(long)]
        scenario: String,
        #[arg(long, value_enum)]
        front_end: Option<FrontEndArg>,
        /// Also write the rendered signal as a 24-bit WAV file
        #[arg(long)]
        write: Option<PathBuf>,
    },
    /// List the synthetic scenarios
    Scenarios,
    /// Print the biquad tables with pole magnitudes and stability
    Coefficients,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FrontEndArg {
    Wideband,
    Narrowband,
    Spectral,
}

impl From<FrontEndArg> for FrontEndConfig {
    fn from(arg: FrontEndArg) -> Self {
        match arg {
            FrontEndArg::Wideband => FrontEndConfig::Iir {
                tuning: FilterTuning::Wideband,
            },
            FrontEndArg::Narrowband => FrontEndConfig::Iir {
                tuning: FilterTuning::Narrowband,
            },
            FrontEndArg::Spectral => FrontEndConfig::Spectral,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            AppConfig::from_json_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Analyze { wav, front_end } => run_analyze(config, &wav, front_end),
        Commands::Listen { seconds, pulse_ms } => run_listen(config, seconds, pulse_ms),
        Commands::Simulate {
            scenario,
            front_end,
            write,
        } => run_simulate(config, &scenario, front_end, write),
        Commands::Scenarios => run_scenarios(),
        Commands::Coefficients => run_coefficients(),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn detector_for(mut config: AppConfig, front_end: Option<FrontEndArg>) -> SnapDetector {
    if let Some(front_end) = front_end {
        config.detector.front_end = front_end.into();
    }
    SnapDetector::from_config(
        &config.detector,
        config.audio.sample_rate,
        config.audio.frame_size,
    )
}

fn run_analyze(config: AppConfig, wav: &Path, front_end: Option<FrontEndArg>) -> Result<ExitCode> {
    let mut source =
        WavFrameSource::open(wav).with_context(|| format!("opening {}", wav.display()))?;
    let mut detector = detector_for(config, front_end);
    let events = run_detector(&mut source, &mut detector)
        .with_context(|| format!("analyzing {}", wav.display()))?;

    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    eprintln!("{}", serde_json::to_string(&detector.stats())?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct SensorReport {
    state: snap_switch::SensorState,
    timestamp_ms: u64,
}

#[cfg(not(target_os = "android"))]
fn run_listen(config: AppConfig, seconds: Option<u64>, pulse_ms: u64) -> Result<ExitCode> {
    use snap_switch::audio::CaptureEngine;
    use snap_switch::clock::{Clock, MonotonicClock};
    use snap_switch::BinarySensor;
    use tokio::sync::broadcast::error::TryRecvError;

    let mut engine = CaptureEngine::new(config);
    let mut events = engine.subscribe();
    engine.start().context("starting capture")?;

    let clock = MonotonicClock::new();
    let mut sensor = BinarySensor::new(pulse_ms);
    let deadline_ms = seconds.map(|s| s * 1000);
    let emit = |state: snap_switch::SensorState, timestamp_ms: u64| -> Result<()> {
        println!(
            "{}",
            serde_json::to_string(&SensorReport {
                state,
                timestamp_ms
            })?
        );
        Ok(())
    };
    emit(sensor.state(), clock.now_ms())?;

    loop {
        match events.try_recv() {
            Ok(event) => {
                tracing::debug!("[Listen] {} at {} ms", event.result, event.timestamp_ms);
                if let Some(state) = sensor.handle_event(&event, clock.now_ms()) {
                    emit(state, clock.now_ms())?;
                }
            }
            Err(TryRecvError::Empty) => std::thread::sleep(std::time::Duration::from_millis(10)),
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!("[Listen] Missed {} events", missed)
            }
            Err(TryRecvError::Closed) => break,
        }

        let now_ms = clock.now_ms();
        if let Some(state) = sensor.poll(now_ms) {
            emit(state, now_ms)?;
        }
        if deadline_ms.is_some_and(|deadline| now_ms >= deadline) {
            break;
        }
    }

    if let Some(stats) = engine.stop().context("stopping capture")? {
        eprintln!("{}", serde_json::to_string(&stats)?);
    }
    if engine.dropped_samples() > 0 {
        eprintln!("dropped {} samples", engine.dropped_samples());
    }
    Ok(ExitCode::from(0))
}

#[cfg(target_os = "android")]
fn run_listen(_config: AppConfig, _seconds: Option<u64>, _pulse_ms: u64) -> Result<ExitCode> {
    anyhow::bail!("live capture is not available on this platform")
}

#[derive(Serialize)]
struct SimulationReport<'a> {
    scenario: &'a str,
    front_end: &'a str,
    events: &'a [SnapEvent],
    matches_expected: Option<bool>,
}

fn run_simulate(
    config: AppConfig,
    name: &str,
    front_end: Option<FrontEndArg>,
    write: Option<PathBuf>,
) -> Result<ExitCode> {
    let scenario: Scenario = name.parse().map_err(anyhow::Error::msg)?;
    let samples = scenario.timeline().samples();

    if let Some(path) = write {
        write_wav(&path, &samples)?;
        eprintln!("wrote {}", path.display());
    }

    let mut detector = detector_for(config, front_end);
    let mut source = snap_switch::audio::SampleFrameSource::new(samples, SAMPLE_RATE);
    let events = run_detector(&mut source, &mut detector)?;

    // Expected sequences describe the default frame layout and tuning only
    let comparable = detector.frame_size() == snap_switch::config::FRAME_SIZE
        && detector.front_end().name() == "wideband";
    let matches_expected = comparable.then(|| {
        let actual: Vec<(u64, SnapResult)> =
            events.iter().map(|e| (e.timestamp_ms, e.result)).collect();
        actual == scenario.expected()
    });

    let report = SimulationReport {
        scenario: scenario.name(),
        front_end: detector.front_end().name(),
        events: &events,
        matches_expected,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    match matches_expected {
        Some(false) => Ok(ExitCode::from(2)),
        _ => Ok(ExitCode::from(0)),
    }
}

fn write_wav(path: &Path, samples: &[i32]) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn run_scenarios() -> Result<ExitCode> {
    for scenario in Scenario::ALL {
        println!(
            "{:<18} {} (expect {} double snap{})",
            scenario.name(),
            scenario.description(),
            scenario.expected_double_snaps(),
            if scenario.expected_double_snaps() == 1 { "" } else { "s" }
        );
    }
    Ok(ExitCode::from(0))
}

fn run_coefficients() -> Result<ExitCode> {
    for tuning in [FilterTuning::Wideband, FilterTuning::Narrowband] {
        print_table(tuning.table());
    }
    Ok(ExitCode::from(0))
}

fn print_table(table: &FilterBankTable) {
    println!("{} @ {} Hz", table.name, SAMPLE_RATE);
    for (band, section) in table.sections() {
        let [p0, p1] = section.pole_magnitudes();
        println!(
            "  {:<7} b=[{:+.9}, {:+.9}, {:+.9}] a=[1, {:+.9}, {:+.9}] |p|=[{:.4}, {:.4}] {}",
            band,
            section.b0,
            section.b1,
            section.b2,
            section.a1,
            section.a2,
            p0,
            p1,
            if section.is_stable() { "stable" } else { "UNSTABLE" }
        );
    }
}
