//! Telemetry message assembly and rate-limited publishing
//!
//! One JSON object per publish on a single fixed topic. Optional fields are
//! explicit nulls when not applicable so the dashboard never sees stale
//! values. Delivery is fire-and-forget: a failed publish is logged and
//! dropped, and the monitor keeps running.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analysis::{NoteName, PitchEstimate};
use crate::config::TelemetryConfig;
use crate::io::TelemetryTransport;
use crate::monitor::DeviceState;

/// One outbound status report
///
/// `frequency`/`note`/`octave` are null unless the monitor is in the
/// Playing state with a current pitch estimate; `octave` is present iff
/// `note` is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Smoothed distance in millimeters
    pub distance: u16,
    /// Smoothed volume in calibrated units
    pub volume: u16,
    /// Detected frequency in integer Hz
    pub frequency: Option<u32>,
    pub note: Option<NoteName>,
    pub octave: Option<u8>,
    pub presence: bool,
    pub playing: bool,
}

impl TelemetryMessage {
    /// Build a fresh message from the current iteration's state
    pub fn build(
        state: DeviceState,
        distance_mm: u16,
        volume: u16,
        pitch: &PitchEstimate,
    ) -> Self {
        let playing = state == DeviceState::Playing;
        let presence = state != DeviceState::NoPresence;

        let (frequency, note, octave) = if playing && pitch.has_frequency() {
            (
                Some(pitch.frequency_hz.round() as u32),
                pitch.note.map(|n| n.name),
                pitch.note.map(|n| n.octave),
            )
        } else {
            (None, None, None)
        };

        Self {
            distance: distance_mm,
            volume,
            frequency,
            note,
            octave,
            presence,
            playing,
        }
    }
}

/// Rate-limited, fire-and-forget publisher
///
/// Publishes at most once per configured interval, independent of the
/// display cadence. No batching, no retry, no acknowledgement tracking.
pub struct TelemetryPublisher {
    config: TelemetryConfig,
    last_attempt_at: Option<Instant>,
}

impl TelemetryPublisher {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            last_attempt_at: None,
        }
    }

    /// Publish if the interval has elapsed. Returns whether a message went out.
    ///
    /// Transport failures are logged and swallowed; the next attempt waits a
    /// full interval rather than hammering a dead connection.
    pub fn maybe_publish<T: TelemetryTransport>(
        &mut self,
        message: &TelemetryMessage,
        transport: &mut T,
        now: Instant,
    ) -> bool {
        if let Some(last) = self.last_attempt_at {
            let interval = Duration::from_millis(self.config.publish_interval_ms);
            if now.duration_since(last) < interval {
                return false;
            }
        }
        self.last_attempt_at = Some(now);

        let payload = match serde_json::to_vec(message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("[Telemetry] Failed to encode message: {}", err);
                return false;
            }
        };

        match transport.publish(&self.config.topic, &payload) {
            Ok(()) => {
                tracing::debug!(
                    "[Telemetry] Published {} bytes to {}",
                    payload.len(),
                    self.config.topic
                );
                true
            }
            Err(err) => {
                tracing::warn!("[Telemetry] Dropping message: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{map_to_note, Note};
    use crate::config::NoteConfig;
    use crate::io::simulated::RecordingTransport;

    fn pitch(frequency_hz: f32) -> PitchEstimate {
        PitchEstimate {
            frequency_hz,
            note: map_to_note(frequency_hz, &NoteConfig::default()),
        }
    }

    #[test]
    fn test_message_fields_while_playing() {
        let message = TelemetryMessage::build(DeviceState::Playing, 100, 400, &pitch(440.0));
        assert_eq!(message.distance, 100);
        assert_eq!(message.volume, 400);
        assert_eq!(message.frequency, Some(440));
        assert_eq!(message.note, Some(NoteName::A));
        assert_eq!(message.octave, Some(4));
        assert!(message.presence);
        assert!(message.playing);
    }

    #[test]
    fn test_message_nulls_audio_fields_when_not_playing() {
        // Even a lingering pitch estimate must not leak into a
        // presence-only message
        let message =
            TelemetryMessage::build(DeviceState::PresenceOnly, 100, 50, &pitch(440.0));
        assert_eq!(message.frequency, None);
        assert_eq!(message.note, None);
        assert_eq!(message.octave, None);
        assert!(message.presence);
        assert!(!message.playing);
    }

    #[test]
    fn test_octave_present_iff_note_present() {
        // A frequency above the noise floor that matched no reference
        let unmatched = PitchEstimate {
            frequency_hz: 60.0,
            note: None,
        };
        let message = TelemetryMessage::build(DeviceState::Playing, 100, 400, &unmatched);
        assert_eq!(message.frequency, Some(60));
        assert_eq!(message.note, None);
        assert_eq!(message.octave, None);
    }

    #[test]
    fn test_json_encoding_uses_explicit_nulls() {
        let message = TelemetryMessage::build(
            DeviceState::NoPresence,
            800,
            0,
            &PitchEstimate::none(),
        );
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"frequency\":null"));
        assert!(json.contains("\"note\":null"));
        assert!(json.contains("\"octave\":null"));
        assert!(json.contains("\"presence\":false"));
        assert!(json.contains("\"playing\":false"));
    }

    #[test]
    fn test_json_encoding_of_sharp_note() {
        let estimate = PitchEstimate {
            frequency_hz: 466.16,
            note: Some(Note {
                name: NoteName::ASharp,
                octave: 4,
            }),
        };
        let message = TelemetryMessage::build(DeviceState::Playing, 100, 400, &estimate);
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"note\":\"A#\""));
        assert!(json.contains("\"octave\":4"));
    }

    #[test]
    fn test_publisher_rate_limits() {
        let mut publisher = TelemetryPublisher::new(TelemetryConfig::default());
        let mut transport = RecordingTransport::new();
        let message =
            TelemetryMessage::build(DeviceState::NoPresence, 800, 0, &PitchEstimate::none());
        let base = Instant::now();

        assert!(publisher.maybe_publish(&message, &mut transport, base));
        // Inside the 2 s interval: gated
        assert!(!publisher.maybe_publish(
            &message,
            &mut transport,
            base + Duration::from_millis(500)
        ));
        assert!(!publisher.maybe_publish(
            &message,
            &mut transport,
            base + Duration::from_millis(1900)
        ));
        // After the interval
        assert!(publisher.maybe_publish(
            &message,
            &mut transport,
            base + Duration::from_millis(2100)
        ));
        assert_eq!(transport.messages.len(), 2);
        assert_eq!(transport.messages[0].0, "conndev/piano");
    }

    #[test]
    fn test_publisher_drops_on_disconnect_and_recovers() {
        let mut publisher = TelemetryPublisher::new(TelemetryConfig::default());
        let mut transport = RecordingTransport::new();
        let message =
            TelemetryMessage::build(DeviceState::NoPresence, 800, 0, &PitchEstimate::none());
        let base = Instant::now();

        transport.set_connected(false);
        assert!(!publisher.maybe_publish(&message, &mut transport, base));
        assert!(transport.messages.is_empty());

        // Reconnect: next interval publishes again, nothing was queued
        transport.set_connected(true);
        assert!(publisher.maybe_publish(
            &message,
            &mut transport,
            base + Duration::from_millis(2100)
        ));
        assert_eq!(transport.messages.len(), 1);
    }
}
