//! Simulated collaborators for tests and the demo binary
//!
//! These stand in for the ToF sensor, microphone ADC, OLED, and MQTT client
//! while keeping the exact trait contracts of the real hardware, so the
//! monitor loop under test is the same code that runs on a device.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::path::Path;

use rand::Rng;

use crate::analysis::PitchSource;
use crate::display::DisplayModel;
use crate::error::{DisplayError, SensorError, TransportError};
use crate::io::{AudioSource, DistanceSensor, StatusDisplay, TelemetryTransport};

/// Distance sensor replaying a scripted sequence of readings
///
/// Holds the last reading once the script is exhausted, mimicking a person
/// who stays put.
pub struct ScriptedDistanceSensor {
    readings: VecDeque<u16>,
    last: u16,
}

impl ScriptedDistanceSensor {
    pub fn new(readings: impl IntoIterator<Item = u16>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            // Out-of-range until the script says otherwise
            last: 8190,
        }
    }

    /// Sensor that always reports the same distance
    pub fn fixed(distance_mm: u16) -> Self {
        Self::new([distance_mm])
    }
}

impl DistanceSensor for ScriptedDistanceSensor {
    fn read_distance_mm(&mut self) -> Result<u16, SensorError> {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }
}

/// Synthetic microphone producing a sine tone plus optional noise
///
/// Samples are generated against the analyzer's nominal rate, offset to the
/// ADC mid-rail like the real mic module.
pub struct SineAudioSource {
    frequency_hz: f32,
    sample_rate_hz: f32,
    amplitude: f32,
    noise_amplitude: f32,
    dc_offset: u16,
    index: u64,
}

impl SineAudioSource {
    pub fn new(frequency_hz: f32, sample_rate_hz: f32, amplitude: f32, dc_offset: u16) -> Self {
        Self {
            frequency_hz,
            sample_rate_hz,
            amplitude,
            noise_amplitude: 0.0,
            dc_offset,
            index: 0,
        }
    }

    /// Add uniform noise of the given peak amplitude on top of the tone
    pub fn with_noise(mut self, noise_amplitude: f32) -> Self {
        self.noise_amplitude = noise_amplitude;
        self
    }

    /// Change the tone without resetting phase bookkeeping
    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz;
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }
}

impl AudioSource for SineAudioSource {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        let t = self.index as f32 / self.sample_rate_hz;
        self.index += 1;

        let mut value = self.dc_offset as f32 + self.amplitude * (TAU * self.frequency_hz * t).sin();
        if self.noise_amplitude > 0.0 {
            let noise: f32 = rand::thread_rng().gen_range(-1.0..1.0);
            value += noise * self.noise_amplitude;
        }

        Ok(value.clamp(0.0, 1023.0) as u16)
    }
}

/// Microphone replaying a scripted sequence, holding the last value after
///
/// `set_level` re-scripts the held value mid-run, e.g. to simulate the
/// player stopping.
pub struct ScriptedAudioSource {
    samples: VecDeque<u16>,
    last: u16,
}

impl ScriptedAudioSource {
    pub fn new(samples: impl IntoIterator<Item = u16>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            last: 0,
        }
    }

    pub fn fixed(level: u16) -> Self {
        Self::new([level])
    }

    pub fn set_level(&mut self, level: u16) {
        self.samples.clear();
        self.last = level;
    }
}

impl AudioSource for ScriptedAudioSource {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        if let Some(next) = self.samples.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }
}

/// Microphone that always reads the same raw value (silence at a DC level)
pub struct ConstantAudioSource {
    value: u16,
}

impl ConstantAudioSource {
    pub fn new(value: u16) -> Self {
        Self { value }
    }
}

impl AudioSource for ConstantAudioSource {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        Ok(self.value)
    }
}

/// Microphone fed from a mono WAV file, looping at end of file
///
/// Lets recorded room audio drive the full pipeline from the simulator.
pub struct WavAudioSource {
    samples: Vec<u16>,
    index: usize,
}

impl WavAudioSource {
    pub fn from_path<P: AsRef<Path>>(path: P, dc_offset: u16) -> Result<Self, SensorError> {
        let mut reader = hound::WavReader::open(&path).map_err(|err| SensorError::ReadFailed {
            details: format!("{:?}: {}", path.as_ref(), err),
        })?;

        // Scale 16-bit samples down to the 10-bit ADC range around the
        // configured mid-rail.
        let samples: Result<Vec<u16>, _> = reader
            .samples::<i16>()
            .map(|sample| {
                sample.map(|s| {
                    let scaled = dc_offset as f32 + (s as f32 / i16::MAX as f32) * 511.0;
                    scaled.clamp(0.0, 1023.0) as u16
                })
            })
            .collect();

        let samples = samples.map_err(|err| SensorError::ReadFailed {
            details: err.to_string(),
        })?;

        if samples.is_empty() {
            return Err(SensorError::ReadFailed {
                details: "WAV file contains no samples".to_string(),
            });
        }

        Ok(Self { samples, index: 0 })
    }
}

impl AudioSource for WavAudioSource {
    fn read_raw_sample(&mut self) -> Result<u16, SensorError> {
        let sample = self.samples[self.index];
        self.index = (self.index + 1) % self.samples.len();
        Ok(sample)
    }
}

/// Pitch source replaying scripted analysis results
///
/// Replaces the real spectral analyzer in tests: no timed capture, fully
/// deterministic frequencies. Once the script runs out it keeps returning
/// the fallback value.
pub struct ScriptedPitchSource {
    script: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedPitchSource {
    pub fn new(frequencies: impl IntoIterator<Item = f32>) -> Self {
        Self {
            script: frequencies.into_iter().collect(),
            fallback: 0.0,
        }
    }

    /// Always reports the same frequency
    pub fn constant(frequency_hz: f32) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: frequency_hz,
        }
    }

    /// Never detects anything
    pub fn silent() -> Self {
        Self::constant(0.0)
    }
}

impl<A: AudioSource> PitchSource<A> for ScriptedPitchSource {
    fn detect(&mut self, _audio: &mut A) -> Result<f32, SensorError> {
        Ok(self.script.pop_front().unwrap_or(self.fallback))
    }
}

/// Display double recording every frame it is asked to draw
#[derive(Default)]
pub struct RecordingDisplay {
    pub frames: Vec<DisplayModel>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&DisplayModel> {
        self.frames.last()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn draw_frame(&mut self, model: &DisplayModel) -> Result<(), DisplayError> {
        self.frames.push(model.clone());
        Ok(())
    }
}

/// Transport double recording published payloads, with a connectivity switch
pub struct RecordingTransport {
    pub messages: Vec<(String, Vec<u8>)>,
    pub connected: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            connected: true,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTransport for RecordingTransport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        self.messages.push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_sensor_holds_last_reading() {
        let mut sensor = ScriptedDistanceSensor::new([500, 300, 100]);
        assert_eq!(sensor.read_distance_mm().unwrap(), 500);
        assert_eq!(sensor.read_distance_mm().unwrap(), 300);
        assert_eq!(sensor.read_distance_mm().unwrap(), 100);
        assert_eq!(sensor.read_distance_mm().unwrap(), 100);
    }

    #[test]
    fn test_sine_source_stays_in_adc_range() {
        let mut source = SineAudioSource::new(440.0, 5000.0, 400.0, 512).with_noise(50.0);
        for _ in 0..1000 {
            let sample = source.read_raw_sample().unwrap();
            assert!(sample <= 1023);
        }
    }

    #[test]
    fn test_sine_source_oscillates_around_dc() {
        let mut source = SineAudioSource::new(440.0, 5000.0, 300.0, 512);
        let samples: Vec<u16> = (0..256)
            .map(|_| source.read_raw_sample().unwrap())
            .collect();
        let above = samples.iter().filter(|&&s| s > 512).count();
        let below = samples.iter().filter(|&&s| s < 512).count();
        assert!(above > 50);
        assert!(below > 50);
    }

    #[test]
    fn test_disconnected_transport_rejects_publish() {
        let mut transport = RecordingTransport::new();
        transport.set_connected(false);
        let result = transport.publish("conndev/piano", b"{}");
        assert_eq!(result, Err(TransportError::Disconnected));
        assert!(transport.messages.is_empty());
    }
}
