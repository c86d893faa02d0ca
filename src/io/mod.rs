// Hardware collaborator interfaces
//
// The core never talks to a bus directly. The ranging sensor, microphone
// ADC, status display, and outbound transport are specified here as traits,
// with simulated implementations in `simulated` for tests and the demo
// binary. Real drivers implement the same synchronous, bounded-latency
// contracts the device firmware relied on.

use crate::display::DisplayModel;
use crate::error::{DisplayError, SensorError, TransportError};

pub mod simulated;

/// Time-of-flight ranging sensor, already configured for continuous mode
pub trait DistanceSensor {
    /// Read one distance in millimeters. Blocking, bounded latency.
    fn read_distance_mm(&mut self) -> Result<u16, SensorError>;
}

/// Microphone ADC
pub trait AudioSource {
    /// Read one raw ADC sample.
    fn read_raw_sample(&mut self) -> Result<u16, SensorError>;
}

/// Status display accepting full-frame redraws only
pub trait StatusDisplay {
    fn draw_frame(&mut self, model: &DisplayModel) -> Result<(), DisplayError>;
}

/// Outbound telemetry transport (MQTT on the device)
///
/// Delivery is fire-and-forget: no acknowledgement is consumed and a failed
/// publish is dropped by the caller.
pub trait TelemetryTransport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;
}
