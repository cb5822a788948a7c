//! Process-wide tracing setup shared by every herdbook entry point.

pub mod logging;

pub use logging::{LogFormat, ParseLogFormatError};

/// Initialize tracing with JSON output.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    logging::init_with(LogFormat::Json);
}

/// Initialize tracing with the given output format.
pub fn init_with(format: LogFormat) {
    logging::init_with(format);
}
