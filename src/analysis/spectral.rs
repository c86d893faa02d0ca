//! Spectral analyzer - timed capture and dominant-frequency extraction
//!
//! Capture paces each ADC read against a monotonic deadline and measures the
//! wall time across the whole block. The *measured* rate, not the nominal
//! one, feeds the bin-to-frequency conversion: per-sample overhead (ADC
//! conversion latency, loop overhead) would otherwise bias every estimate by
//! a constant multiplicative factor, which matters given the narrow relative
//! tolerance used downstream for note matching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::SpectralConfig;
use crate::error::SensorError;
use crate::io::AudioSource;

use super::PitchSource;

/// One captured analysis block with its measured sample rate
#[derive(Debug, Clone)]
pub struct CapturedBlock {
    /// DC-removed samples, `block_len` of them
    pub samples: Vec<f32>,
    /// Achieved rate in Hz, measured over the block's wall time
    pub sample_rate_hz: f32,
}

/// FFT-based dominant frequency estimator
pub struct SpectralAnalyzer {
    config: SpectralConfig,
    dc_offset: u16,
    /// Hann window, pre-computed to reduce spectral leakage
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig, dc_offset: u16) -> Self {
        let block_len = config.block_len;
        let window = (0..block_len)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (block_len as f32 - 1.0)).cos())
            })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(block_len);

        Self {
            config,
            dc_offset,
            window,
            fft,
        }
    }

    /// Capture one block of calibrated audio at the nominal rate
    ///
    /// Blocking for the duration of the block (tens of milliseconds); this
    /// is the one deliberate latency spike per active-playing iteration and
    /// it runs to completion once started.
    pub fn capture<A: AudioSource>(&self, audio: &mut A) -> Result<CapturedBlock, SensorError> {
        let block_len = self.config.block_len;
        let interval = Duration::from_secs_f32(1.0 / self.config.nominal_sample_rate_hz);

        let mut samples = Vec::with_capacity(block_len);
        let start = Instant::now();
        let mut deadline = start;

        for _ in 0..block_len {
            let raw = audio.read_raw_sample()?;
            samples.push(raw as f32 - self.dc_offset as f32);

            deadline += interval;
            while Instant::now() < deadline {
                std::hint::spin_loop();
            }
        }

        let elapsed = start.elapsed().as_secs_f32();
        if elapsed <= 0.0 {
            return Err(SensorError::CaptureIncomplete {
                wanted: block_len,
                got: samples.len(),
            });
        }

        Ok(CapturedBlock {
            samples,
            sample_rate_hz: block_len as f32 / elapsed,
        })
    }

    /// Extract the dominant frequency from a captured block
    ///
    /// Searches bins `[min_bin, block_len / 2)`, skipping DC and the lowest
    /// bins which carry rail noise. Returns 0.0 when the peak magnitude is
    /// below the noise threshold.
    pub fn dominant_frequency(&self, samples: &[f32], sample_rate_hz: f32) -> f32 {
        let block_len = self.config.block_len;

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .take(block_len)
            .zip(self.window.iter())
            .map(|(&sample, &w)| Complex::new(sample * w, 0.0))
            .collect();
        buffer.resize(block_len, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let mut peak_bin = 0;
        let mut peak_magnitude = 0.0f32;
        for (bin, value) in buffer
            .iter()
            .enumerate()
            .take(block_len / 2)
            .skip(self.config.min_bin)
        {
            let magnitude = value.norm();
            if magnitude > peak_magnitude {
                peak_magnitude = magnitude;
                peak_bin = bin;
            }
        }

        if peak_magnitude <= self.config.noise_threshold {
            tracing::debug!(
                "[Spectral] Peak magnitude {:.1} below noise threshold {:.1}",
                peak_magnitude,
                self.config.noise_threshold
            );
            return 0.0;
        }

        let frequency = peak_bin as f32 * sample_rate_hz / block_len as f32;
        tracing::debug!(
            "[Spectral] Peak bin {} magnitude {:.1} -> {:.1} Hz (measured rate {:.1} Hz)",
            peak_bin,
            peak_magnitude,
            frequency,
            sample_rate_hz
        );
        frequency
    }
}

impl<A: AudioSource> PitchSource<A> for SpectralAnalyzer {
    fn detect(&mut self, audio: &mut A) -> Result<f32, SensorError> {
        let block = self.capture(audio)?;
        Ok(self.dominant_frequency(&block.samples, block.sample_rate_hz))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::simulated::ConstantAudioSource;

    fn analyzer() -> SpectralAnalyzer {
        SpectralAnalyzer::new(SpectralConfig::default(), 512)
    }

    /// Sine block aligned to an exact FFT bin
    fn sine_block(bin: usize, amplitude: f32, block_len: usize) -> Vec<f32> {
        (0..block_len)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / block_len as f32).sin()
            })
            .collect()
    }

    #[test]
    fn test_dominant_frequency_of_bin_aligned_tone() {
        let analyzer = analyzer();
        let block_len = 128;
        let rate = 5000.0;

        // Bin 10 at 5 kHz / 128 samples = 390.625 Hz
        let samples = sine_block(10, 300.0, block_len);
        let frequency = analyzer.dominant_frequency(&samples, rate);
        assert!((frequency - 390.625).abs() < 0.01, "got {}", frequency);
    }

    #[test]
    fn test_frequency_scales_with_measured_rate() {
        // The same block read at a slower achieved rate must report a
        // proportionally lower frequency.
        let analyzer = analyzer();
        let samples = sine_block(10, 300.0, 128);

        let nominal = analyzer.dominant_frequency(&samples, 5000.0);
        let slower = analyzer.dominant_frequency(&samples, 4500.0);
        assert!((slower / nominal - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_silence_reports_zero() {
        let analyzer = analyzer();
        let samples = vec![0.0; 128];
        assert_eq!(analyzer.dominant_frequency(&samples, 5000.0), 0.0);
    }

    #[test]
    fn test_quiet_tone_below_noise_floor_reports_zero() {
        let analyzer = analyzer();
        // Amplitude 1.0 peaks around 32 after windowing, well under the
        // default threshold of 500
        let samples = sine_block(10, 1.0, 128);
        assert_eq!(analyzer.dominant_frequency(&samples, 5000.0), 0.0);
    }

    #[test]
    fn test_low_bins_are_excluded_from_peak_search() {
        let analyzer = analyzer();
        // Strong content in bin 1 (below min_bin), weaker tone in bin 20
        let mut samples = sine_block(1, 500.0, 128);
        for (sample, extra) in samples.iter_mut().zip(sine_block(20, 200.0, 128)) {
            *sample += extra;
        }
        let frequency = analyzer.dominant_frequency(&samples, 5000.0);
        let expected = 20.0 * 5000.0 / 128.0;
        assert!((frequency - expected).abs() < 0.01, "got {}", frequency);
    }

    #[test]
    fn test_capture_fills_block_and_measures_rate() {
        let analyzer = analyzer();
        let mut source = ConstantAudioSource::new(512);

        let block = analyzer.capture(&mut source).unwrap();
        assert_eq!(block.samples.len(), 128);
        // DC-removed silence
        assert!(block.samples.iter().all(|&s| s == 0.0));
        // Pacing cannot beat the nominal rate; allow generous slack below it
        assert!(block.sample_rate_hz > 0.0);
        assert!(block.sample_rate_hz <= 5000.0 * 1.05, "got {}", block.sample_rate_hz);
    }
}
