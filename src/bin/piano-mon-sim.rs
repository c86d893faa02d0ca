//! Simulator CLI - runs the monitor loop against synthetic hardware
//!
//! Replays a sit-down/play/leave scenario (or a WAV file) through the exact
//! pipeline the device runs, printing each published telemetry message to
//! stdout as one JSON line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use piano_monitor::display::DisplayModel;
use piano_monitor::error::{log_sensor_error, DisplayError, MonitorError, SensorError, TransportError};
use piano_monitor::io::simulated::{SineAudioSource, WavAudioSource};
use piano_monitor::io::{AudioSource, DistanceSensor, StatusDisplay, TelemetryTransport};
use piano_monitor::{Monitor, MonitorConfig, SpectralAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "piano-mon-sim", about = "Piano monitor simulator")]
struct Cli {
    /// Path to a JSON config file (defaults used when absent)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Total simulated session length in seconds
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,
    /// Tone frequency the simulated player holds, in Hz
    #[arg(long, default_value_t = 440.0)]
    frequency: f32,
    /// Tone amplitude in ADC counts
    #[arg(long, default_value_t = 400.0)]
    amplitude: f32,
    /// Feed a mono WAV file as the microphone instead of the scenario tone
    #[arg(long)]
    wav: Option<PathBuf>,
}

/// Person walks up a fifth of the way in, leaves a fifth before the end
struct ScenarioDistanceSensor {
    start: Instant,
    sit_from: Duration,
    sit_until: Duration,
}

impl DistanceSensor for ScenarioDistanceSensor {
    fn read_distance_mm(&mut self) -> Result<u16, SensorError> {
        let elapsed = self.start.elapsed();
        if elapsed >= self.sit_from && elapsed < self.sit_until {
            Ok(100)
        } else {
            Ok(800)
        }
    }
}

/// Tone plays for the middle stretch of the seated window
struct ScenarioAudioSource {
    tone: SineAudioSource,
    start: Instant,
    play_from: Duration,
    play_until: Duration,
    dc_offset: u16,
}

impl AudioSource for ScenarioAudioSource {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        let elapsed = self.start.elapsed();
        if elapsed >= self.play_from && elapsed < self.play_until {
            self.tone.read_raw_sample()
        } else {
            Ok(self.dc_offset)
        }
    }
}

enum SimAudio {
    Scenario(ScenarioAudioSource),
    Wav(WavAudioSource),
}

impl AudioSource for SimAudio {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        match self {
            SimAudio::Scenario(source) => source.read_raw_sample(),
            SimAudio::Wav(source) => source.read_raw_sample(),
        }
    }
}

/// Logs every frame instead of driving a panel
struct LoggingDisplay;

impl StatusDisplay for LoggingDisplay {
    fn draw_frame(&mut self, model: &DisplayModel) -> Result<(), DisplayError> {
        tracing::info!("[Display] {:?}", model);
        Ok(())
    }
}

/// Prints each published payload as one JSON line
struct StdoutTransport;

impl TelemetryTransport for StdoutTransport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        let body = String::from_utf8_lossy(payload);
        println!("{} {}", topic, body);
        Ok(())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("piano-mon-sim error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => MonitorConfig::load_from_file(path),
        None => MonitorConfig::default(),
    };

    let start = Instant::now();
    let duration = Duration::from_secs(cli.duration_secs);
    let loop_interval = Duration::from_millis(config.loop_interval_ms);

    let distance_sensor = ScenarioDistanceSensor {
        start,
        sit_from: duration / 5,
        sit_until: duration - duration / 5,
    };

    let audio = match &cli.wav {
        Some(path) => SimAudio::Wav(WavAudioSource::from_path(path, config.audio.dc_offset)?),
        None => SimAudio::Scenario(ScenarioAudioSource {
            tone: SineAudioSource::new(
                cli.frequency,
                config.spectral.nominal_sample_rate_hz,
                cli.amplitude,
                config.audio.dc_offset,
            )
            .with_noise(10.0),
            start,
            play_from: duration / 4,
            play_until: duration - duration / 4,
            dc_offset: config.audio.dc_offset,
        }),
    };

    let analyzer = SpectralAnalyzer::new(config.spectral.clone(), config.audio.dc_offset);
    let mut monitor = Monitor::new(
        config,
        distance_sensor,
        audio,
        analyzer,
        LoggingDisplay,
        StdoutTransport,
    );

    tracing::info!(
        "Simulating {} s session (tone {} Hz)",
        cli.duration_secs,
        cli.frequency
    );

    while start.elapsed() < duration {
        let report = match monitor.tick(Instant::now()) {
            Ok(report) => report,
            Err(MonitorError::Sensor(err)) => {
                log_sensor_error(&err, "simulator loop");
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(
            "tick: {:?} distance {} mm volume {}",
            report.state,
            report.distance_mm,
            report.volume
        );
        std::thread::sleep(loop_interval);
    }

    tracing::info!("Session complete, final state {:?}", monitor.state());
    Ok(())
}
