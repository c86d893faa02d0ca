//! Note mapping - frequency to nearest standard musical pitch
//!
//! The reference table covers the 88 keys of a standard keyboard, A0
//! (27.5 Hz) through C8, computed from the equal-temperament ratio rather
//! than hard-coded so the matching loop can never fall out of sync with the
//! table length. Matching minimizes the *relative* difference to each
//! reference: musical pitches are exponentially spaced, so a percentage
//! threshold stays uniform across the whole range where an absolute one
//! would not.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::NoteConfig;

/// Number of keys on the instrument
const KEY_COUNT: usize = 88;

/// Fundamental of the lowest key (A0)
const LOWEST_FUNDAMENTAL_HZ: f32 = 27.5;

/// Reference fundamentals for every key, lowest first
pub static REFERENCE_PITCHES: Lazy<Vec<f32>> = Lazy::new(|| {
    (0..KEY_COUNT)
        .map(|i| LOWEST_FUNDAMENTAL_HZ * 2.0_f32.powf(i as f32 / 12.0))
        .collect()
});

/// Chromatic note names, A-origin to match the device's key indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteName {
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
}

impl NoteName {
    const CHROMATIC: [NoteName; 12] = [
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
    ];

    /// Name at `index` semitones above A within an octave
    pub fn from_index(index: usize) -> Self {
        Self::CHROMATIC[index % 12]
    }

    pub fn label(&self) -> &'static str {
        match self {
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A matched musical pitch
///
/// Octave numbering is zero-based from A0, incrementing at each A rather
/// than at C as scientific pitch notation does. A4 is 440 Hz in both
/// schemes; notes from C upward sit one octave lower than their scientific
/// name (C8 reports as octave 7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub name: NoteName,
    pub octave: u8,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// Map a detected frequency to the nearest reference pitch, or None
///
/// Policy:
/// - reject non-positive or non-finite input and anything inside the
///   configured band around the fixed environmental hum frequency;
/// - octave-fold: halve while above the highest reference fundamental, so a
///   peak detector locked onto a 2x/4x harmonic still names the right note;
/// - reject frequencies still below the lowest fundamental after folding;
/// - pick the reference with minimum relative difference and accept only
///   under the configured tolerance.
pub fn map_to_note(frequency_hz: f32, config: &NoteConfig) -> Option<Note> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return None;
    }
    if (frequency_hz - config.hum_frequency_hz).abs() <= config.hum_band_hz {
        tracing::debug!(
            "[Notes] Rejecting {:.1} Hz inside hum band around {:.1} Hz",
            frequency_hz,
            config.hum_frequency_hz
        );
        return None;
    }

    let references = &*REFERENCE_PITCHES;
    let highest = references[KEY_COUNT - 1];

    let mut folded = frequency_hz;
    while folded > highest {
        folded /= 2.0;
    }

    if folded < references[0] * (1.0 - config.match_tolerance) {
        return None;
    }

    let mut best_index = 0;
    let mut best_difference = f32::INFINITY;
    for (index, &reference) in references.iter().enumerate() {
        let difference = (folded - reference).abs() / reference;
        if difference < best_difference {
            best_difference = difference;
            best_index = index;
        }
    }

    if best_difference > config.match_tolerance {
        return None;
    }

    Some(Note {
        name: NoteName::from_index(best_index % 12),
        octave: (best_index / 12) as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NoteConfig {
        NoteConfig::default()
    }

    #[test]
    fn test_reference_table_boundaries() {
        assert_eq!(REFERENCE_PITCHES.len(), 88);
        assert!((REFERENCE_PITCHES[0] - 27.5).abs() < 0.001);
        // C8
        assert!((REFERENCE_PITCHES[87] - 4186.01).abs() < 0.1);
        // A4 sits 48 semitones above A0
        assert!((REFERENCE_PITCHES[48] - 440.0).abs() < 0.01);
    }

    #[test]
    fn test_exact_reference_maps_with_zero_difference() {
        let note = map_to_note(440.0, &config()).unwrap();
        assert_eq!(note.name, NoteName::A);
        assert_eq!(note.octave, 4);
    }

    #[test]
    fn test_octave_numbering_is_a_origin() {
        // Middle C (scientific C4, 261.63 Hz) is key index 39, so the
        // device's A-origin numbering reports octave 3, not 4.
        let note = map_to_note(261.63, &config()).unwrap();
        assert_eq!(note.name, NoteName::C);
        assert_eq!(note.octave, 3);

        // C8 likewise reports octave 7 (index 87 / 12)
        let note = map_to_note(4186.01, &config()).unwrap();
        assert_eq!(note.name, NoteName::C);
        assert_eq!(note.octave, 7);
    }

    #[test]
    fn test_octave_folding_preserves_note_name() {
        let base = map_to_note(440.0, &config()).unwrap();
        // Harmonics at 2x, 4x, 8x, 16x the fundamental. The octave may
        // legitimately differ when the multiple is itself a valid key
        // (1760 Hz is A6), but the note name must not.
        for k in 1..=4 {
            let harmonic = 440.0 * 2.0_f32.powi(k);
            let note = map_to_note(harmonic, &config()).unwrap();
            assert_eq!(note.name, base.name, "harmonic {} Hz", harmonic);
        }
    }

    #[test]
    fn test_folding_brings_out_of_range_harmonics_home() {
        // 7040 Hz is above C8; one fold lands on A7 (3520 Hz)
        let note = map_to_note(7040.0, &config()).unwrap();
        assert_eq!(note.name, NoteName::A);
        assert_eq!(note.octave, 7);
    }

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        assert_eq!(map_to_note(0.0, &config()), None);
        assert_eq!(map_to_note(-100.0, &config()), None);
        assert_eq!(map_to_note(f32::NAN, &config()), None);
        assert_eq!(map_to_note(f32::INFINITY, &config()), None);
    }

    #[test]
    fn test_rejects_hum_band() {
        let cfg = config();
        assert_eq!(map_to_note(60.0, &cfg), None);
        assert_eq!(map_to_note(62.5, &cfg), None);
        // Just outside the band matches B1 (61.74 Hz) territory again
        assert!(map_to_note(64.0, &cfg).is_some());
    }

    #[test]
    fn test_rejects_well_below_range() {
        // 15% under A0: outside the relative tolerance of every reference
        assert_eq!(map_to_note(27.5 * 0.85, &config()), None);
        assert_eq!(map_to_note(10.0, &config()), None);
    }

    #[test]
    fn test_relative_tolerance_is_uniform_across_range() {
        // Adjacent semitones are ~5.9% apart, so any in-range frequency is
        // within ~3% of some reference; the tolerance gate only bites at the
        // low boundary. Verify a worst-case midpoint still matches.
        let midpoint = (440.0 + 466.16) / 2.0;
        assert!(map_to_note(midpoint, &config()).is_some());

        let low_midpoint = (27.5 + 29.14) / 2.0;
        assert!(map_to_note(low_midpoint, &config()).is_some());
    }

    #[test]
    fn test_note_display() {
        let note = Note {
            name: NoteName::ASharp,
            octave: 4,
        };
        assert_eq!(note.to_string(), "A#4");
    }

    #[test]
    fn test_note_name_serializes_with_sharp_labels() {
        let json = serde_json::to_string(&NoteName::CSharp).unwrap();
        assert_eq!(json, "\"C#\"");
        let json = serde_json::to_string(&NoteName::B).unwrap();
        assert_eq!(json, "\"B\"");
    }
}
