//! Configuration for the monitor's thresholds and intervals
//!
//! Every magic number the device shipped with (distance bounds, amplitude
//! thresholds, tolerance percentages, timing intervals) lives here in one
//! named structure built once at startup. Values can be loaded from a JSON
//! file for tuning without recompilation; defaults match the deployed unit.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub presence: PresenceConfig,
    pub audio: AudioConfig,
    pub spectral: SpectralConfig,
    pub note: NoteConfig,
    pub display: DisplayConfig,
    pub telemetry: TelemetryConfig,
    /// Reset the pitch estimate after this long with no detected frequency
    pub silence_timeout_ms: u64,
    /// Main loop pacing in milliseconds
    pub loop_interval_ms: u64,
}

/// Proximity filtering and presence classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Weight given to the previous smoothed value (0.9 on the device)
    pub smoothing: f32,
    /// Closest distance still considered a seated person, in millimeters
    pub min_distance_mm: u16,
    /// Farthest distance still counted as presence, in millimeters
    pub presence_max_mm: u16,
    /// Farthest distance at which playing is still attributed to the person.
    /// Tuned independently of `presence_max_mm`.
    pub playing_max_mm: u16,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.9,
            min_distance_mm: 30,
            presence_max_mm: 250,
            playing_max_mm: 250,
        }
    }
}

/// Microphone calibration and amplitude filtering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// DC offset subtracted from every raw ADC reading
    pub dc_offset: u16,
    /// Moving-average window length (circular buffer capacity)
    pub window_size: usize,
    /// Smoothed amplitude above which the instrument counts as playing
    pub playing_threshold: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            // Mid-rail of the 10-bit ADC the mic module sits on
            dc_offset: 512,
            window_size: 10,
            playing_threshold: 350,
        }
    }
}

/// Spectral analyzer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Analysis block length in samples (power of two)
    pub block_len: usize,
    /// Nominal capture rate in Hz; only used to pace sampling, never for
    /// frequency math (the measured rate is used instead)
    pub nominal_sample_rate_hz: f32,
    /// Lowest bin included in the peak search; DC and the first couple of
    /// bins carry rail noise
    pub min_bin: usize,
    /// Peak magnitude below which no frequency is reported
    pub noise_threshold: f32,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            block_len: 128,
            nominal_sample_rate_hz: 5000.0,
            min_bin: 3,
            noise_threshold: 500.0,
        }
    }
}

/// Note matching parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Maximum relative difference to the nearest reference pitch, as a
    /// fraction (0.10 = 10%)
    pub match_tolerance: f32,
    /// Fixed environmental noise frequency to reject (mains hum)
    pub hum_frequency_hz: f32,
    /// Half-width of the hum rejection band in Hz
    pub hum_band_hz: f32,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            match_tolerance: 0.10,
            hum_frequency_hz: 60.0,
            hum_band_hz: 3.0,
        }
    }
}

/// Display throttling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Global redraw floor: never redraw more often than this
    pub min_redraw_interval_ms: u64,
    /// Periodic refresh cadence while a person is present but not playing
    pub presence_refresh_ms: u64,
    /// Fallback cadence while playing and nothing displayed has changed
    pub playing_refresh_ms: u64,
    /// Displayed frequency must move by more than this to force a redraw
    pub frequency_tolerance_hz: f32,
    /// Blank the screen this long after presence was last seen
    pub blank_timeout_ms: u64,
    /// Full scale of the volume bar in display pixels
    pub volume_bar_width: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            min_redraw_interval_ms: 250,
            presence_refresh_ms: 500,
            playing_refresh_ms: 750,
            frequency_tolerance_hz: 2.0,
            blank_timeout_ms: 10_000,
            volume_bar_width: 128,
        }
    }
}

/// Telemetry publishing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Minimum interval between published messages
    pub publish_interval_ms: u64,
    /// Topic the transport publishes to
    pub topic: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 2000,
            topic: "conndev/piano".to_string(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            presence: PresenceConfig::default(),
            audio: AudioConfig::default(),
            spectral: SpectralConfig::default(),
            note: NoteConfig::default(),
            display: DisplayConfig::default(),
            telemetry: TelemetryConfig::default(),
            silence_timeout_ms: 5000,
            loop_interval_ms: 100,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to the built-in defaults (with a warning) if the file is
    /// missing or malformed, so a bad tuning file never bricks the monitor.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
