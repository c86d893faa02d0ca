// Error types for the piano monitor
//
// This module defines custom error types for sensor, transport, and display
// operations, providing structured error handling with stable numeric codes.

use log::error;
use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages from
/// custom error types, keeping error reporting consistent across the sensor,
/// transport, and display boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Log a sensor error with structured context
pub fn log_sensor_error(err: &SensorError, context: &str) {
    error!(
        "Sensor error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Sensor-related errors
///
/// These cover the ranging sensor and the microphone ADC. Initialization
/// failure is fatal to the caller; read failures during the loop are
/// propagated so the driver can decide whether to halt.
///
/// Error code range: 1001-1003
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Sensor failed to produce a reading
    ReadFailed { details: String },

    /// Sensor never initialized or stopped responding
    NotResponding { sensor: &'static str },

    /// Audio capture could not fill a full analysis block
    CaptureIncomplete { wanted: usize, got: usize },
}

impl ErrorCode for SensorError {
    fn code(&self) -> i32 {
        match self {
            SensorError::ReadFailed { .. } => 1001,
            SensorError::NotResponding { .. } => 1002,
            SensorError::CaptureIncomplete { .. } => 1003,
        }
    }

    fn message(&self) -> String {
        match self {
            SensorError::ReadFailed { details } => {
                format!("Sensor read failed: {}", details)
            }
            SensorError::NotResponding { sensor } => {
                format!("Sensor not responding: {}", sensor)
            }
            SensorError::CaptureIncomplete { wanted, got } => {
                format!("Audio capture incomplete: wanted {}, got {}", wanted, got)
            }
        }
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensorError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for SensorError {}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::ReadFailed {
            details: err.to_string(),
        }
    }
}

/// Transport-related errors
///
/// Publish failures are recoverable by design: the monitor loop keeps
/// running and simply drops telemetry until the transport returns.
///
/// Error code range: 2001-2002
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Transport is not connected
    Disconnected,

    /// Publish was attempted and failed
    PublishFailed { reason: String },
}

impl ErrorCode for TransportError {
    fn code(&self) -> i32 {
        match self {
            TransportError::Disconnected => 2001,
            TransportError::PublishFailed { .. } => 2002,
        }
    }

    fn message(&self) -> String {
        match self {
            TransportError::Disconnected => "Transport disconnected".to_string(),
            TransportError::PublishFailed { reason } => {
                format!("Publish failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransportError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::PublishFailed {
            reason: err.to_string(),
        }
    }
}

/// Display-related errors
///
/// Error code range: 3001
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayError {
    /// Full-frame redraw failed on the display bus
    DrawFailed { reason: String },
}

impl ErrorCode for DisplayError {
    fn code(&self) -> i32 {
        match self {
            DisplayError::DrawFailed { .. } => 3001,
        }
    }

    fn message(&self) -> String {
        match self {
            DisplayError::DrawFailed { reason } => format!("Draw failed: {}", reason),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DisplayError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DisplayError {}

/// Composite error for one monitor loop iteration
///
/// Transport failures never appear here: they are logged and dropped inside
/// the publisher, matching the device's fire-and-forget telemetry.
#[derive(Debug)]
pub enum MonitorError {
    Sensor(SensorError),
    Display(DisplayError),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Sensor(err) => write!(f, "{}", err),
            MonitorError::Display(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Sensor(err) => Some(err),
            MonitorError::Display(err) => Some(err),
        }
    }
}

impl From<SensorError> for MonitorError {
    fn from(err: SensorError) -> Self {
        MonitorError::Sensor(err)
    }
}

impl From<DisplayError> for MonitorError {
    fn from(err: DisplayError) -> Self {
        MonitorError::Display(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_error_codes() {
        assert_eq!(
            SensorError::ReadFailed {
                details: "test".to_string()
            }
            .code(),
            1001
        );
        assert_eq!(
            SensorError::NotResponding { sensor: "tof" }.code(),
            1002
        );
        assert_eq!(
            SensorError::CaptureIncomplete {
                wanted: 128,
                got: 64
            }
            .code(),
            1003
        );
    }

    #[test]
    fn test_transport_error_codes() {
        assert_eq!(TransportError::Disconnected.code(), 2001);
        assert_eq!(
            TransportError::PublishFailed {
                reason: "test".to_string()
            }
            .code(),
            2002
        );
    }

    #[test]
    fn test_display_error_codes() {
        assert_eq!(
            DisplayError::DrawFailed {
                reason: "test".to_string()
            }
            .code(),
            3001
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SensorError::CaptureIncomplete {
            wanted: 128,
            got: 30,
        };
        assert!(err.message().contains("wanted 128"));
        assert!(err.message().contains("got 30"));

        let err = TransportError::Disconnected;
        assert!(err.message().contains("disconnected"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "bus timeout");
        let sensor_err: SensorError = io_err.into();

        match sensor_err {
            SensorError::ReadFailed { details } => {
                assert!(details.contains("bus timeout"));
            }
            _ => panic!("Expected ReadFailed variant"),
        }
    }

    #[test]
    fn test_error_propagation() {
        fn may_fail() -> Result<(), SensorError> {
            Err(SensorError::NotResponding { sensor: "mic" })
        }

        fn caller() -> Result<(), MonitorError> {
            may_fail()?;
            Ok(())
        }

        assert!(matches!(caller(), Err(MonitorError::Sensor(_))));
    }
}
