//! Display model and redraw throttling
//!
//! Full-screen redraws are expensive on the slow display bus, so the
//! throttler decides each iteration whether the frame actually needs to be
//! redrawn: a global minimum interval, per-state refresh policies, and a
//! forced redraw on every state transition. The no-presence screen goes
//! static after one draw and blanks once after an extended timeout to save
//! power.

use std::time::{Duration, Instant};

use crate::analysis::{Note, PitchEstimate};
use crate::config::DisplayConfig;
use crate::monitor::DeviceState;

/// Everything needed to render one screen
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayModel {
    /// Screen off (power saving)
    Blank,
    /// Nobody at the instrument
    Idle,
    /// Person seated, not playing; live volume indicator
    Presence { volume_bar: u8 },
    /// Actively playing
    Playing {
        volume_bar: u8,
        frequency_hz: f32,
        note: Option<Note>,
    },
}

impl DisplayModel {
    /// Build the frame for the current state
    pub fn for_state(
        state: DeviceState,
        volume: u16,
        pitch: &PitchEstimate,
        config: &DisplayConfig,
    ) -> Self {
        match state {
            DeviceState::NoPresence => DisplayModel::Idle,
            DeviceState::PresenceOnly => DisplayModel::Presence {
                volume_bar: scale_volume_bar(volume, config.volume_bar_width),
            },
            DeviceState::Playing => DisplayModel::Playing {
                volume_bar: scale_volume_bar(volume, config.volume_bar_width),
                frequency_hz: pitch.frequency_hz,
                note: pitch.note,
            },
        }
    }
}

/// Scale a calibrated volume to a bar length in pixels
///
/// Full scale corresponds to half the ADC range, the largest magnitude the
/// calibration can produce.
fn scale_volume_bar(volume: u16, bar_width: u8) -> u8 {
    let scaled = (volume as u32 * bar_width as u32) / 512;
    scaled.min(bar_width as u32) as u8
}

/// Per-iteration redraw decision
pub struct DisplayThrottler {
    config: DisplayConfig,
    last_state: Option<DeviceState>,
    last_redraw_at: Option<Instant>,
    last_drawn: Option<DisplayModel>,
    last_presence_at: Option<Instant>,
    blanked: bool,
}

impl DisplayThrottler {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            last_state: None,
            last_redraw_at: None,
            last_drawn: None,
            last_presence_at: None,
            blanked: false,
        }
    }

    /// Decide whether to redraw, returning the frame to draw if so
    ///
    /// A state transition always redraws immediately, bypassing the global
    /// floor. Otherwise: NoPresence stays static (with a one-shot blank
    /// after the timeout), PresenceOnly refreshes on a cadence for the
    /// volume bar, and Playing redraws on content change or on its slower
    /// fallback cadence.
    pub fn plan(
        &mut self,
        state: DeviceState,
        model: DisplayModel,
        now: Instant,
    ) -> Option<DisplayModel> {
        let transitioned = self.last_state != Some(state);
        self.last_state = Some(state);

        // Startup counts as the reference point for the blank timeout
        let presence_reference = *self.last_presence_at.get_or_insert(now);
        if state != DeviceState::NoPresence {
            self.last_presence_at = Some(now);
            self.blanked = false;
        }

        if transitioned {
            return Some(self.commit(model, now));
        }

        if state == DeviceState::NoPresence {
            let timeout = Duration::from_millis(self.config.blank_timeout_ms);
            if !self.blanked && now.duration_since(presence_reference) >= timeout {
                self.blanked = true;
                tracing::info!("[Display] Blanking screen after no-presence timeout");
                return Some(self.commit(DisplayModel::Blank, now));
            }
            return None;
        }

        if let Some(last) = self.last_redraw_at {
            let floor = Duration::from_millis(self.config.min_redraw_interval_ms);
            if now.duration_since(last) < floor {
                return None;
            }
        }

        let elapsed = self
            .last_redraw_at
            .map(|last| now.duration_since(last))
            .unwrap_or(Duration::MAX);

        let due = match state {
            DeviceState::PresenceOnly => {
                elapsed >= Duration::from_millis(self.config.presence_refresh_ms)
            }
            DeviceState::Playing => {
                self.playing_content_changed(&model)
                    || elapsed >= Duration::from_millis(self.config.playing_refresh_ms)
            }
            DeviceState::NoPresence => unreachable!("handled above"),
        };

        if due {
            Some(self.commit(model, now))
        } else {
            None
        }
    }

    fn commit(&mut self, model: DisplayModel, now: Instant) -> DisplayModel {
        self.last_redraw_at = Some(now);
        self.last_drawn = Some(model.clone());
        model
    }

    /// Has the displayed note or frequency moved enough to matter?
    ///
    /// Volume bar changes alone wait for the fallback cadence; redrawing on
    /// every near-threshold frequency wobble would flicker.
    fn playing_content_changed(&self, model: &DisplayModel) -> bool {
        match (&self.last_drawn, model) {
            (
                Some(DisplayModel::Playing {
                    frequency_hz: last_frequency,
                    note: last_note,
                    ..
                }),
                DisplayModel::Playing {
                    frequency_hz,
                    note,
                    ..
                },
            ) => {
                last_note != note
                    || (frequency_hz - last_frequency).abs() > self.config.frequency_tolerance_hz
            }
            _ => true,
        }
    }
}
