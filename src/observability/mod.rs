//! Observability subsystem: correlation ids, structured logging, and log
//! shipping.

pub mod correlation;
pub mod logging;
pub mod shipper;

pub use correlation::CorrelationId;
pub use logging::{CaptureSink, Level, LogSink, Logger, Logging, StdoutSink};
pub use shipper::LogShipper;
