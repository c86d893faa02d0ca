// Piano Monitor Core - occupancy-aware instrument monitor
//
// Senses whether a person is seated at the piano, whether it is being
// played, estimates the dominant pitch, reports state over telemetry, and
// drives a small status display. Hardware collaborators live behind the
// traits in `io`; everything else is the portable signal-fusion core.

// Module declarations
pub mod analysis;
pub mod config;
pub mod display;
pub mod error;
pub mod filter;
pub mod io;
pub mod monitor;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{map_to_note, Note, NoteName, PitchEstimate, SpectralAnalyzer};
pub use config::MonitorConfig;
pub use display::{DisplayModel, DisplayThrottler};
pub use error::{MonitorError, SensorError};
pub use monitor::{classify, DeviceState, Monitor, TickReport};
pub use telemetry::{TelemetryMessage, TelemetryPublisher};
