// Input conditioning filters
//
// Two small filters run on every loop iteration: an exponential smoother on
// the ranging sensor and a fixed-window moving average on the calibrated
// microphone magnitude. Both are O(1) per update.

/// Single-pole exponential filter over raw distance readings
///
/// `output = smoothing * previous + (1 - smoothing) * raw`. No bounds
/// checking: a sporadic out-of-range reading is damped, not rejected.
/// Converges geometrically at rate `smoothing` under constant input.
#[derive(Debug)]
pub struct ProximityFilter {
    smoothing: f32,
    previous: f32,
    primed: bool,
}

impl ProximityFilter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing,
            previous: 0.0,
            primed: false,
        }
    }

    /// Smooth one raw reading and return the filtered distance in mm
    pub fn smooth(&mut self, raw: u16) -> u16 {
        if !self.primed {
            // First reading seeds the filter so startup does not ramp from 0
            self.previous = raw as f32;
            self.primed = true;
            return raw;
        }

        self.previous = self.smoothing * self.previous + (1.0 - self.smoothing) * raw as f32;
        self.previous.round() as u16
    }

    /// Last smoothed value without updating the filter
    pub fn value(&self) -> u16 {
        self.previous.round() as u16
    }
}

/// Moving-average filter over calibrated microphone magnitude
///
/// Calibration subtracts the ADC mid-rail offset and takes the absolute
/// value. The window is a fixed-capacity circular buffer with a running sum
/// kept consistent on every update: the evicted element is subtracted, the
/// new one added, never a full recomputation.
#[derive(Debug)]
pub struct AmplitudeFilter {
    dc_offset: u16,
    window: Vec<u16>,
    index: usize,
    sum: u32,
}

impl AmplitudeFilter {
    pub fn new(window_size: usize, dc_offset: u16) -> Self {
        assert!(window_size > 0, "window size must be non-zero");
        Self {
            dc_offset,
            window: vec![0; window_size],
            index: 0,
            sum: 0,
        }
    }

    /// Insert one raw ADC sample and return the windowed average magnitude
    pub fn update(&mut self, raw: u16) -> u16 {
        let calibrated = self.calibrate(raw);

        self.sum -= self.window[self.index] as u32;
        self.window[self.index] = calibrated;
        self.sum += calibrated as u32;
        self.index = (self.index + 1) % self.window.len();

        (self.sum / self.window.len() as u32) as u16
    }

    /// Current windowed average without inserting a sample
    pub fn value(&self) -> u16 {
        (self.sum / self.window.len() as u32) as u16
    }

    fn calibrate(&self, raw: u16) -> u16 {
        (raw as i32 - self.dc_offset as i32).unsigned_abs() as u16
    }
}
