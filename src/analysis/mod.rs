// Analysis module - spectral pitch estimation and note mapping
//
// The analyzer is only invoked while the monitor is in the Playing state,
// since timed block capture is by far the most expensive operation in the
// loop. The pipeline is: timed capture -> Hann window -> FFT -> peak bin ->
// frequency -> nearest-note match.

use crate::error::SensorError;
use crate::io::AudioSource;

pub mod notes;
pub mod spectral;

pub use notes::{map_to_note, Note, NoteName};
pub use spectral::SpectralAnalyzer;

/// Result of one spectral analysis pass
///
/// `frequency_hz` of 0.0 means nothing was detected above the noise floor.
/// `note` is present only when the frequency matched a reference pitch
/// within tolerance; it is never a stale value carried past the silence
/// timeout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    pub frequency_hz: f32,
    pub note: Option<Note>,
}

impl PitchEstimate {
    /// The explicit "nothing detected" sentinel
    pub fn none() -> Self {
        Self {
            frequency_hz: 0.0,
            note: None,
        }
    }

    pub fn has_frequency(&self) -> bool {
        self.frequency_hz > 0.0
    }
}

impl Default for PitchEstimate {
    fn default() -> Self {
        Self::none()
    }
}

/// Source of dominant-frequency estimates
///
/// The monitor depends on this seam rather than on `SpectralAnalyzer`
/// directly so tests can script pitch results without real-time capture.
pub trait PitchSource<A: AudioSource> {
    /// Run one analysis pass. Returns 0.0 when nothing was detected.
    fn detect(&mut self, audio: &mut A) -> Result<f32, SensorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_sentinel_has_no_frequency() {
        let estimate = PitchEstimate::none();
        assert!(!estimate.has_frequency());
        assert!(estimate.note.is_none());
        assert_eq!(estimate, PitchEstimate::default());
    }
}
