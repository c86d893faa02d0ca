// Monitor core - presence/playing state machine and the per-iteration loop
//
// One iteration reads distance and raw audio, runs both filters, classifies
// the device state, conditionally runs the spectral analyzer (only while
// Playing - it is the most expensive operation in the loop), applies the
// silence timeout, then drives the display throttler and the telemetry
// publisher. Single logical thread, no hidden state in the classification.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analysis::{map_to_note, PitchEstimate, PitchSource};
use crate::config::MonitorConfig;
use crate::display::{DisplayModel, DisplayThrottler};
use crate::error::MonitorError;
use crate::filter::{AmplitudeFilter, ProximityFilter};
use crate::io::{AudioSource, DistanceSensor, StatusDisplay, TelemetryTransport};
use crate::telemetry::{TelemetryMessage, TelemetryPublisher};

/// Presence/playing classification
///
/// Exactly one state is active at any instant; the value is a pure function
/// of the current filtered samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    NoPresence,
    PresenceOnly,
    Playing,
}

/// Classify one pair of filtered samples
///
/// `person_detected` requires the smoothed distance inside the presence
/// bounds; `is_playing` additionally requires the (independently tuned)
/// playing distance bound and the amplitude threshold.
pub fn classify(distance_mm: u16, volume: u16, config: &MonitorConfig) -> DeviceState {
    let person_detected = distance_mm >= config.presence.min_distance_mm
        && distance_mm <= config.presence.presence_max_mm;
    let is_playing = person_detected
        && distance_mm <= config.presence.playing_max_mm
        && volume > config.audio.playing_threshold;

    if is_playing {
        DeviceState::Playing
    } else if person_detected {
        DeviceState::PresenceOnly
    } else {
        DeviceState::NoPresence
    }
}

/// What one tick observed and did
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub state: DeviceState,
    pub distance_mm: u16,
    pub volume: u16,
    pub pitch: PitchEstimate,
    /// Whether a frame was drawn this iteration
    pub redrew: bool,
    /// Whether a telemetry message went out this iteration
    pub published: bool,
}

/// The monitor session: filters, state, throttler, publisher, collaborators
///
/// Owns all mutable loop state explicitly; the driver calls `tick` once per
/// iteration with the current monotonic time.
pub struct Monitor<D, A, P, S, T>
where
    D: DistanceSensor,
    A: AudioSource,
    P: PitchSource<A>,
    S: StatusDisplay,
    T: TelemetryTransport,
{
    config: MonitorConfig,
    proximity: ProximityFilter,
    amplitude: AmplitudeFilter,
    pitch_source: P,
    throttler: DisplayThrottler,
    publisher: TelemetryPublisher,
    state: DeviceState,
    pitch: PitchEstimate,
    last_pitch_at: Option<Instant>,
    distance_sensor: D,
    audio: A,
    display: S,
    transport: T,
}

impl<D, A, P, S, T> Monitor<D, A, P, S, T>
where
    D: DistanceSensor,
    A: AudioSource,
    P: PitchSource<A>,
    S: StatusDisplay,
    T: TelemetryTransport,
{
    pub fn new(
        config: MonitorConfig,
        distance_sensor: D,
        audio: A,
        pitch_source: P,
        display: S,
        transport: T,
    ) -> Self {
        let proximity = ProximityFilter::new(config.presence.smoothing);
        let amplitude = AmplitudeFilter::new(config.audio.window_size, config.audio.dc_offset);
        let throttler = DisplayThrottler::new(config.display.clone());
        let publisher = TelemetryPublisher::new(config.telemetry.clone());

        Self {
            config,
            proximity,
            amplitude,
            pitch_source,
            throttler,
            publisher,
            state: DeviceState::NoPresence,
            pitch: PitchEstimate::none(),
            last_pitch_at: None,
            distance_sensor,
            audio,
            display,
            transport,
        }
    }

    /// Run one loop iteration
    pub fn tick(&mut self, now: Instant) -> Result<TickReport, MonitorError> {
        let raw_distance = self.distance_sensor.read_distance_mm()?;
        let distance_mm = self.proximity.smooth(raw_distance);

        let raw_audio = self.audio.read_raw_sample()?;
        let volume = self.amplitude.update(raw_audio);

        let previous_state = self.state;
        let state = classify(distance_mm, volume, &self.config);
        self.state = state;
        if state != previous_state {
            tracing::info!(
                "[Monitor] {:?} -> {:?} (distance {} mm, volume {})",
                previous_state,
                state,
                distance_mm,
                volume
            );
        }

        if state == DeviceState::Playing {
            let frequency_hz = self
                .pitch_source
                .detect(&mut self.audio)
                .map_err(MonitorError::from)?;
            if frequency_hz > 0.0 {
                self.pitch = PitchEstimate {
                    frequency_hz,
                    note: map_to_note(frequency_hz, &self.config.note),
                };
                self.last_pitch_at = Some(now);
            }
        }

        self.expire_stale_pitch(now);

        let model = DisplayModel::for_state(state, volume, &self.pitch, &self.config.display);
        let redrew = match self.throttler.plan(state, model, now) {
            Some(frame) => {
                self.display.draw_frame(&frame)?;
                true
            }
            None => false,
        };

        let message = TelemetryMessage::build(state, distance_mm, volume, &self.pitch);
        let published = self
            .publisher
            .maybe_publish(&message, &mut self.transport, now);

        Ok(TickReport {
            state,
            distance_mm,
            volume,
            pitch: self.pitch,
            redrew,
            published,
        })
    }

    /// Drop the pitch estimate once no frequency has been seen for the
    /// silence timeout, so stale note data never lingers on the display or
    /// in telemetry.
    fn expire_stale_pitch(&mut self, now: Instant) {
        if !self.pitch.has_frequency() {
            return;
        }
        let timeout = Duration::from_millis(self.config.silence_timeout_ms);
        let stale = self
            .last_pitch_at
            .map(|at| now.duration_since(at) >= timeout)
            .unwrap_or(true);
        if stale {
            tracing::debug!(
                "[Monitor] Silence timeout, clearing pitch estimate ({:.1} Hz)",
                self.pitch.frequency_hz
            );
            self.pitch = PitchEstimate::none();
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn pitch(&self) -> PitchEstimate {
        self.pitch
    }

    pub fn display(&self) -> &S {
        &self.display
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }
}
